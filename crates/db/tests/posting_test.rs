//! Posting coordinator tests against a live database.
//!
//! Cover the end-to-end postings of business events:
//! - invoices, receipts and credit notes move the journal and the client chain
//! - replays of the same event write nothing
//! - backdated rows keep the running balance in insertion order
//! - closed periods and unbalanced entries are rejected atomically

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unwrap_used)]

mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ConnectionTrait, DbBackend, Statement, TransactionTrait};
use tally_core::ledger::{JournalEntryInput, JournalLineInput, LedgerError, SourceType};
use tally_core::posting::{
    CreditNoteIssued, CustomerPaymentConfirmed, ExpenseLine, ExpensePosted, ExpenseSettlement,
    legs,
};
use tally_core::subledger::SubledgerKind;
use tally_shared::types::{AccountId, ClientId, JournalEntryId, PaymentId};
use uuid::Uuid;

use common::{date, invoice, item, setup};

fn receipt(client_id: ClientId, cash: AccountId, amount: Decimal) -> CustomerPaymentConfirmed {
    CustomerPaymentConfirmed {
        payment_id: PaymentId::new(),
        client_id,
        cash_account: cash,
        amount,
        date: date(2026, 3, 20),
        reference: "RCPT-1".to_string(),
    }
}

#[tokio::test]
async fn test_invoice_posts_receivable_revenue_and_tax() {
    let Some(fx) = setup().await else { return };
    let client = fx.ledger.subjects.create_client("Acme Corp").await.unwrap();
    let accounts = fx.ledger.posting.planner().accounts().clone();

    let event = invoice(client, date(2026, 3, 10), dec!(1160.00));
    let outcome = fx.ledger.posting.post_invoice(&event).await.unwrap();

    assert!(!outcome.replayed);
    assert_eq!(outcome.entries.len(), 1);
    assert_eq!(
        outcome.balance(SubledgerKind::Client, client.into_inner()),
        Some(dec!(1160.00))
    );

    let entry_id = outcome.entry_id(legs::SALE).unwrap();
    let stored = fx
        .ledger
        .journal
        .get_entry(JournalEntryId::from_uuid(entry_id))
        .await
        .unwrap();
    assert_eq!(stored.entry.total_debit, dec!(1160.00));
    assert_eq!(stored.entry.total_credit, dec!(1160.00));
    assert_eq!(stored.entry.reference_type.as_deref(), Some("invoice"));
    assert_eq!(stored.lines.len(), 3);

    let as_of = date(2026, 3, 31);
    let reports = &fx.ledger.reports;
    assert_eq!(
        reports.account_balance(accounts.receivable, as_of).await.unwrap(),
        dec!(1160.00)
    );
    assert_eq!(
        reports
            .account_balance(accounts.sales_revenue.unwrap(), as_of)
            .await
            .unwrap(),
        dec!(1000.00)
    );
    assert_eq!(
        reports
            .account_balance(accounts.sales_tax_payable.unwrap(), as_of)
            .await
            .unwrap(),
        dec!(160.00)
    );

    // Before the invoice date nothing is visible.
    assert_eq!(
        reports
            .account_balance(accounts.receivable, date(2026, 3, 9))
            .await
            .unwrap(),
        Decimal::ZERO
    );
}

#[tokio::test]
async fn test_receipt_reduces_client_balance() {
    let Some(fx) = setup().await else { return };
    let client = fx.ledger.subjects.create_client("Acme Corp").await.unwrap();

    fx.ledger
        .posting
        .post_invoice(&invoice(client, date(2026, 3, 10), dec!(1160.00)))
        .await
        .unwrap();
    let outcome = fx
        .ledger
        .posting
        .post_customer_payment(&receipt(client, fx.cash, dec!(500.00)))
        .await
        .unwrap();

    assert_eq!(
        outcome.balance(SubledgerKind::Client, client.into_inner()),
        Some(dec!(660.00))
    );
    assert_eq!(
        fx.ledger.client_ledger.balance(client).await.unwrap(),
        dec!(660.00)
    );
    assert_eq!(
        fx.ledger.account_ledger.balance(fx.cash).await.unwrap(),
        dec!(500.00)
    );
    assert_eq!(
        fx.ledger
            .reports
            .account_balance(fx.cash, date(2026, 3, 31))
            .await
            .unwrap(),
        dec!(500.00)
    );

    let history = fx
        .ledger
        .client_ledger
        .history(client, None, None)
        .await
        .unwrap();
    let balances: Vec<Decimal> = history.iter().map(|r| r.running_balance).collect();
    assert_eq!(balances, vec![dec!(1160.00), dec!(660.00)]);
}

#[tokio::test]
async fn test_credit_note_on_fresh_client_goes_negative() {
    let Some(fx) = setup().await else { return };
    let client = fx.ledger.subjects.create_client("Globex").await.unwrap();

    let event = CreditNoteIssued {
        credit_note_id: Uuid::now_v7(),
        client_id: client,
        date: date(2026, 3, 15),
        reference: "CN-1".to_string(),
        items: vec![item("Returned goods", Decimal::ONE, dec!(232.00))],
        tax_rate: None,
        restock: false,
    };
    let outcome = fx.ledger.posting.post_credit_note(&event).await.unwrap();

    assert_eq!(
        outcome.balance(SubledgerKind::Client, client.into_inner()),
        Some(dec!(-232.00))
    );

    let entry_id = outcome.entry_id(legs::SALE).unwrap();
    let stored = fx
        .ledger
        .journal
        .get_entry(JournalEntryId::from_uuid(entry_id))
        .await
        .unwrap();
    let accounts = fx.ledger.posting.planner().accounts();
    let revenue_line = stored
        .lines
        .iter()
        .find(|l| Some(AccountId::from_uuid(l.account_id)) == accounts.sales_revenue)
        .unwrap();
    assert_eq!(revenue_line.debit_amount, dec!(200.00));
    let tax_line = stored
        .lines
        .iter()
        .find(|l| Some(AccountId::from_uuid(l.account_id)) == accounts.sales_tax_payable)
        .unwrap();
    assert_eq!(tax_line.debit_amount, dec!(32.00));
}

#[tokio::test]
async fn test_replayed_invoice_writes_nothing() {
    let Some(fx) = setup().await else { return };
    let client = fx.ledger.subjects.create_client("Initech").await.unwrap();
    let event = invoice(client, date(2026, 3, 10), dec!(1160.00));

    let first = fx.ledger.posting.post_invoice(&event).await.unwrap();
    let second = fx.ledger.posting.post_invoice(&event).await.unwrap();

    assert!(second.replayed);
    assert_eq!(first.entries, second.entries);
    assert_eq!(
        second.balance(SubledgerKind::Client, client.into_inner()),
        Some(dec!(1160.00))
    );

    let entries = fx
        .ledger
        .journal
        .entries_for_reference(SourceType::Invoice.as_str(), event.invoice_id)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    let history = fx
        .ledger
        .client_ledger
        .history(client, None, None)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_backdated_rows_keep_insertion_order_chain() {
    let Some(fx) = setup().await else { return };
    let client = fx.ledger.subjects.create_client("Umbrella").await.unwrap();
    let posting = &fx.ledger.posting;

    posting
        .post_invoice(&invoice(client, date(2026, 3, 10), dec!(1160.00)))
        .await
        .unwrap();
    let mut early = receipt(client, fx.cash, dec!(500.00));
    early.date = date(2026, 3, 1);
    let outcome = posting.post_customer_payment(&early).await.unwrap();
    assert_eq!(
        outcome.balance(SubledgerKind::Client, client.into_inner()),
        Some(dec!(660.00))
    );

    let mut earlier = receipt(client, fx.cash, dec!(100.00));
    earlier.date = date(2026, 2, 15);
    posting.post_customer_payment(&earlier).await.unwrap();
    let outcome = posting
        .post_invoice(&invoice(client, date(2026, 3, 5), dec!(116.00)))
        .await
        .unwrap();
    assert_eq!(
        outcome.balance(SubledgerKind::Client, client.into_inner()),
        Some(dec!(676.00))
    );

    let mut history = fx
        .ledger
        .client_ledger
        .history(client, None, None)
        .await
        .unwrap();
    // histories read by date; the running balance follows insertion order
    let dates: Vec<chrono::NaiveDate> = history.iter().map(|r| r.entry_date).collect();
    assert_eq!(
        dates,
        vec![date(2026, 2, 15), date(2026, 3, 1), date(2026, 3, 5), date(2026, 3, 10)]
    );
    history.sort_by_key(|r| r.id);
    let balances: Vec<Decimal> = history.iter().map(|r| r.running_balance).collect();
    assert_eq!(
        balances,
        vec![dec!(1160.00), dec!(660.00), dec!(560.00), dec!(676.00)]
    );
    for pair in history.windows(2) {
        assert_eq!(
            pair[1].running_balance,
            pair[0].running_balance + pair[1].debit - pair[1].credit
        );
    }
    assert_eq!(
        fx.ledger.client_ledger.balance(client).await.unwrap(),
        dec!(676.00)
    );

    let report = fx.ledger.client_ledger.verify(client).await.unwrap();
    assert!(report.is_consistent());
    assert_eq!(report.rows_checked, 4);

    let cash = fx.ledger.account_ledger.verify(fx.cash).await.unwrap();
    assert!(cash.is_consistent());
    assert_eq!(cash.expected_balance, dec!(600.00));
}

#[tokio::test]
async fn test_payment_through_non_cash_account_is_rejected() {
    let Some(fx) = setup().await else { return };
    let client = fx.ledger.subjects.create_client("Wonka").await.unwrap();
    fx.ledger
        .posting
        .post_invoice(&invoice(client, date(2026, 3, 10), dec!(1160.00)))
        .await
        .unwrap();

    let event = receipt(client, fx.office_expense, dec!(500.00));
    let err = fx
        .ledger
        .posting
        .post_customer_payment(&event)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AccountTypeMismatch { .. }));

    let entries = fx
        .ledger
        .journal
        .entries_for_reference(SourceType::CustomerPayment.as_str(), event.payment_id.into_inner())
        .await
        .unwrap();
    assert!(entries.is_empty());
    assert_eq!(
        fx.ledger.client_ledger.balance(client).await.unwrap(),
        dec!(1160.00)
    );
    assert!(
        fx.ledger
            .account_ledger
            .history(fx.office_expense, None, None)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_unique_violations_split_by_constraint() {
    let Some(fx) = setup().await else { return };
    let txn = fx.db.begin().await.unwrap();

    let key = format!("test:{}:sale", Uuid::now_v7());
    let insert_entry = |id: Uuid| {
        Statement::from_sql_and_values(
            DbBackend::Postgres,
            "INSERT INTO journal_entries \
             (id, entry_date, reference, description, idempotency_key, total_debit, total_credit) \
             VALUES ($1, '2026-03-10', 'DUP', 'duplicate', $2, 1, 1)",
            [id.into(), key.clone().into()],
        )
    };
    txn.execute(insert_entry(Uuid::now_v7())).await.unwrap();
    let err = txn
        .execute(insert_entry(Uuid::now_v7()))
        .await
        .map_err(tally_db::map_db_err)
        .unwrap_err();
    assert!(matches!(err, LedgerError::ConcurrencyConflict(_)));
    assert!(err.is_retryable());
    txn.rollback().await.unwrap();

    let duplicate_code = fx
        .db
        .execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "INSERT INTO chart_of_accounts (id, account_code, account_name, account_type) \
             VALUES ($1, $2, 'Duplicate', 'cash')",
            [Uuid::now_v7().into(), format!("{}-1100", fx.prefix).into()],
        ))
        .await
        .map_err(tally_db::map_db_err)
        .unwrap_err();
    assert!(matches!(duplicate_code, LedgerError::Validation(_)));
    assert!(!duplicate_code.is_retryable());
}

#[tokio::test]
async fn test_history_range_and_bounds() {
    let Some(fx) = setup().await else { return };
    let client = fx.ledger.subjects.create_client("Hooli").await.unwrap();
    fx.ledger
        .posting
        .post_invoice(&invoice(client, date(2026, 3, 10), dec!(1160.00)))
        .await
        .unwrap();
    fx.ledger
        .posting
        .post_customer_payment(&receipt(client, fx.cash, dec!(500.00)))
        .await
        .unwrap();

    let march_tenth = fx
        .ledger
        .reports
        .subledger_history(
            SubledgerKind::Client,
            client.into_inner(),
            Some(date(2026, 3, 1)),
            Some(date(2026, 3, 15)),
        )
        .await
        .unwrap();
    assert_eq!(march_tenth.len(), 1);
    assert_eq!(march_tenth[0].running_balance, dec!(1160.00));

    let result = fx
        .ledger
        .reports
        .subledger_history(
            SubledgerKind::Client,
            client.into_inner(),
            Some(date(2026, 3, 15)),
            Some(date(2026, 3, 1)),
        )
        .await;
    assert!(matches!(result, Err(LedgerError::Validation(_))));
}

#[tokio::test]
async fn test_unbalanced_manual_entry_is_rejected() {
    let Some(fx) = setup().await else { return };

    let input = JournalEntryInput {
        entry_date: date(2026, 3, 12),
        reference: "MAN-1".to_string(),
        description: "Office supplies".to_string(),
        source: None,
        idempotency_key: None,
        lines: vec![
            JournalLineInput::debit(fx.office_expense, dec!(100.00)),
            JournalLineInput::credit(fx.cash, dec!(90.00)),
        ],
    };
    let result = fx.ledger.journal.post_entry(input).await;
    assert!(matches!(result, Err(LedgerError::ImbalancedEntry { .. })));
    assert_eq!(
        fx.ledger
            .reports
            .account_balance(fx.office_expense, date(2026, 3, 31))
            .await
            .unwrap(),
        Decimal::ZERO
    );
}

#[tokio::test]
async fn test_inactive_account_rejects_postings() {
    let Some(fx) = setup().await else { return };
    fx.ledger
        .accounts
        .set_active(fx.office_expense, false)
        .await
        .unwrap();

    let input = JournalEntryInput {
        entry_date: date(2026, 3, 12),
        reference: "MAN-2".to_string(),
        description: "Office supplies".to_string(),
        source: None,
        idempotency_key: None,
        lines: vec![
            JournalLineInput::debit(fx.office_expense, dec!(100.00)),
            JournalLineInput::credit(fx.cash, dec!(100.00)),
        ],
    };
    let result = fx.ledger.journal.post_entry(input).await;
    assert!(matches!(result, Err(LedgerError::AccountInactive(_))));
}

#[tokio::test]
async fn test_expense_paid_in_cash_credits_cash_chain() {
    let Some(fx) = setup().await else { return };

    let event = ExpensePosted {
        expense_id: Uuid::now_v7(),
        date: date(2026, 3, 18),
        reference: "EXP-1".to_string(),
        description: "Printer paper".to_string(),
        lines: vec![ExpenseLine {
            expense_account: fx.office_expense,
            description: "Paper".to_string(),
            gross: dec!(116.00),
            tax_rate: None,
        }],
        settlement: ExpenseSettlement::Paid {
            account_id: fx.bank,
        },
    };
    let outcome = fx.ledger.posting.post_expense(&event).await.unwrap();

    assert_eq!(
        outcome.balance(SubledgerKind::Account, fx.bank.into_inner()),
        Some(dec!(-116.00))
    );
    assert_eq!(
        fx.ledger
            .reports
            .account_balance(fx.office_expense, date(2026, 3, 31))
            .await
            .unwrap(),
        dec!(100.00)
    );
}

#[tokio::test]
async fn test_closed_period_rejects_posting() {
    let Some(fx) = setup().await else { return };
    let periods = &fx.ledger.periods;

    let closed = match periods.closed_through().await.unwrap() {
        Some(closed) => closed,
        None => match periods.close_period(date(1990, 1, 31), None).await {
            Ok(closing) => closing.closed_through,
            // Another test closed it first.
            Err(_) => periods.closed_through().await.unwrap().unwrap(),
        },
    };

    let client = fx.ledger.subjects.create_client("Late Corp").await.unwrap();
    let event = invoice(client, closed, dec!(116.00));
    let result = fx.ledger.posting.post_invoice(&event).await;
    assert!(matches!(result, Err(LedgerError::PeriodClosed { .. })));

    let entries = fx
        .ledger
        .journal
        .entries_for_reference(SourceType::Invoice.as_str(), event.invoice_id)
        .await
        .unwrap();
    assert!(entries.is_empty());
    assert_eq!(
        fx.ledger.client_ledger.balance(client).await.unwrap(),
        Decimal::ZERO
    );

    let reopen = periods.close_period(closed, None).await;
    assert!(matches!(reopen, Err(LedgerError::Validation(_))));
}

#[tokio::test]
async fn test_rebuild_repairs_corrupted_chain() {
    let Some(fx) = setup().await else { return };
    let client = fx.ledger.subjects.create_client("Soylent").await.unwrap();
    fx.ledger
        .posting
        .post_invoice(&invoice(client, date(2026, 3, 10), dec!(1160.00)))
        .await
        .unwrap();
    fx.ledger
        .posting
        .post_customer_payment(&receipt(client, fx.cash, dec!(500.00)))
        .await
        .unwrap();

    let history = fx
        .ledger
        .client_ledger
        .history(client, None, None)
        .await
        .unwrap();
    let first = history[0].id;
    fx.db
        .execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE client_ledger SET running_balance = running_balance + 1 WHERE id = $1",
            [first.into()],
        ))
        .await
        .unwrap();

    let report = fx
        .ledger
        .reports
        .verify_chain(SubledgerKind::Client, client.into_inner())
        .await
        .unwrap();
    assert!(!report.is_consistent());
    assert_eq!(report.first_break.map(|b| b.id), Some(first));

    let recalculation = fx.ledger.client_ledger.rebuild(client).await.unwrap();
    assert_eq!(recalculation.final_balance, dec!(660.00));
    assert!(!recalculation.updates.is_empty());
    assert!(fx.ledger.client_ledger.verify(client).await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_trial_balance_and_open_balances() {
    let Some(fx) = setup().await else { return };
    let client = fx.ledger.subjects.create_client("Vandelay").await.unwrap();
    fx.ledger
        .posting
        .post_invoice(&invoice(client, date(2026, 3, 10), dec!(1160.00)))
        .await
        .unwrap();
    fx.ledger
        .posting
        .post_customer_payment(&receipt(client, fx.cash, dec!(500.00)))
        .await
        .unwrap();

    let as_of = date(2026, 4, 30);
    let trial = fx.ledger.reports.trial_balance(as_of).await.unwrap();
    assert!(trial.is_balanced);
    assert_eq!(trial.total_debit, trial.total_credit);

    let aging = fx
        .ledger
        .reports
        .open_balances(SubledgerKind::Client, as_of)
        .await
        .unwrap();
    let ours = aging
        .iter()
        .find(|a| a.subject_id == client.into_inner())
        .unwrap();
    assert_eq!(ours.balance, dec!(660.00));
    assert_eq!(ours.buckets.total(), dec!(660.00));
}
