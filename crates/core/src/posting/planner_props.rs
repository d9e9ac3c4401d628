//! Property-based tests for the posting planner.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, ClientId, TaxRate};
use uuid::Uuid;

use super::accounts::PostingAccounts;
use super::events::{
    CreditNoteIssued, ExpenseLine, ExpensePosted, ExpenseSettlement, InvoiceConfirmed, SaleItem,
};
use super::planner::PostingPlanner;
use crate::ledger::validate_entry;

const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

fn planner() -> PostingPlanner {
    PostingPlanner::new(
        PostingAccounts {
            sales_revenue: Some(AccountId::new()),
            sales_tax_payable: Some(AccountId::new()),
            cost_of_goods_sold: Some(AccountId::new()),
            inventory: Some(AccountId::new()),
            tax_control: Some(AccountId::new()),
            accrued_expenses: Some(AccountId::new()),
            ..PostingAccounts::new(AccountId::new(), AccountId::new())
        },
        TaxRate::new(Decimal::new(16, 2)).unwrap(),
    )
}

fn rate_strategy() -> impl Strategy<Value = TaxRate> {
    (0i64..=30).prop_map(|pct| TaxRate::new(Decimal::new(pct, 2)).unwrap())
}

fn item_strategy() -> impl Strategy<Value = SaleItem> {
    (1i64..50, 1i64..1_000_000, 0i64..500_000).prop_map(|(qty, price, cost)| SaleItem {
        description: "item".to_string(),
        quantity: Decimal::from(qty),
        unit_price: Decimal::new(price, 2),
        unit_cost: Decimal::new(cost, 2),
    })
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property: every planned invoice entry balances exactly**
    ///
    /// *For any* set of items and rate, each journal entry of the plan has
    /// equal debit and credit totals, and the client movement equals the
    /// receivable debit.
    #[test]
    fn prop_invoice_entries_balance(
        items in prop::collection::vec(item_strategy(), 1..8),
        rate in rate_strategy(),
    ) {
        let p = planner();
        let plan = p.invoice(&InvoiceConfirmed {
            invoice_id: Uuid::now_v7(),
            client_id: ClientId::new(),
            date: date(),
            reference: "INV".to_string(),
            items,
            tax_rate: Some(rate),
        }).unwrap();

        for planned in &plan.entries {
            let totals = validate_entry(&planned.entry, TOLERANCE).unwrap();
            prop_assert_eq!(totals.debit, totals.credit);
        }

        let receivable = p.accounts().receivable;
        let ar_debit: Decimal = plan.entries[0]
            .entry
            .lines
            .iter()
            .filter(|l| l.account_id == receivable)
            .map(|l| l.debit)
            .sum();
        prop_assert_eq!(plan.movements[0].signed_amount(), ar_debit);
    }

    /// **Property: a credit note exactly reverses the invoice it mirrors**
    #[test]
    fn prop_credit_note_reverses_invoice(
        items in prop::collection::vec(item_strategy(), 1..8),
        rate in rate_strategy(),
    ) {
        let p = planner();
        let client = ClientId::new();
        let invoice = p.invoice(&InvoiceConfirmed {
            invoice_id: Uuid::now_v7(),
            client_id: client,
            date: date(),
            reference: "INV".to_string(),
            items: items.clone(),
            tax_rate: Some(rate),
        }).unwrap();
        let credit = p.credit_note(&CreditNoteIssued {
            credit_note_id: Uuid::now_v7(),
            client_id: client,
            date: date(),
            reference: "CN".to_string(),
            items,
            tax_rate: Some(rate),
            restock: false,
        }).unwrap();

        prop_assert_eq!(
            invoice.movements[0].signed_amount() + credit.movements[0].signed_amount(),
            Decimal::ZERO
        );
        let sale = &credit.entries[0].entry;
        prop_assert!(validate_entry(sale, TOLERANCE).is_ok());
    }

    /// **Property: expense vouchers balance for any mix of lines**
    #[test]
    fn prop_expense_balances(
        lines in prop::collection::vec((0usize..3, 1i64..10_000_000, rate_strategy()), 1..10),
        deferred in any::<bool>(),
    ) {
        let accounts = [AccountId::new(), AccountId::new(), AccountId::new()];
        let plan = planner().expense(&ExpensePosted {
            expense_id: Uuid::now_v7(),
            date: date(),
            reference: "EX".to_string(),
            description: "expenses".to_string(),
            lines: lines
                .into_iter()
                .map(|(idx, cents, rate)| ExpenseLine {
                    expense_account: accounts[idx],
                    description: "line".to_string(),
                    gross: Decimal::new(cents, 2),
                    tax_rate: Some(rate),
                })
                .collect(),
            settlement: if deferred {
                ExpenseSettlement::Deferred
            } else {
                ExpenseSettlement::Paid { account_id: AccountId::new() }
            },
        }).unwrap();

        let totals = validate_entry(&plan.entries[0].entry, TOLERANCE).unwrap();
        prop_assert_eq!(totals.debit, totals.credit);
        prop_assert_eq!(plan.movements.is_empty(), deferred);
    }
}
