//! Turns business events into balanced journal entries and subledger rows.
//!
//! The planner is pure: it computes amounts and chooses accounts, and the
//! database layer executes the resulting [`PostingPlan`] in one transaction.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, TaxRate, TaxSplit, round_money};

use super::accounts::{AccountRole, PostingAccounts};
use super::events::{
    CreditNoteIssued, CustomerPaymentConfirmed, DepreciationPosted, ExpensePosted,
    ExpenseSettlement, InvoiceConfirmed, PurchaseReceived, SaleItem, SupplierPaymentConfirmed,
};
use super::plan::{MovementStatus, PlannedEntry, PostingPlan, SubledgerMovement};
use crate::ledger::{JournalEntryInput, JournalLineInput, LedgerError, SourceRef, SourceType};
use crate::subledger::Subject;

/// Journal leg names.
pub mod legs {
    /// Receivable/revenue/tax entry of an invoice or credit note.
    pub const SALE: &str = "sale";
    /// Cost of goods sold against inventory.
    pub const COST: &str = "cost";
    /// Cash movement of a payment.
    pub const PAYMENT: &str = "payment";
    /// Expense voucher.
    pub const EXPENSE: &str = "expense";
    /// Depreciation charge.
    pub const DEPRECIATION: &str = "depreciation";
    /// Goods received.
    pub const RECEIPT: &str = "receipt";
}

/// Computes posting plans for every supported business event.
#[derive(Debug, Clone)]
pub struct PostingPlanner {
    accounts: PostingAccounts,
    default_tax_rate: TaxRate,
}

/// Per-document sums of a set of sale lines.
#[derive(Debug, Default)]
struct SaleTotals {
    split: TaxSplit,
    /// `(description, cost)` for lines with a nonzero cost.
    costs: Vec<(String, Decimal)>,
}

impl SaleTotals {
    fn total_cost(&self) -> Decimal {
        self.costs.iter().map(|(_, c)| *c).sum()
    }
}

impl PostingPlanner {
    /// Creates a planner.
    #[must_use]
    pub const fn new(accounts: PostingAccounts, default_tax_rate: TaxRate) -> Self {
        Self {
            accounts,
            default_tax_rate,
        }
    }

    /// Returns the resolved posting accounts.
    #[must_use]
    pub const fn accounts(&self) -> &PostingAccounts {
        &self.accounts
    }

    /// Invoice: receivable against revenue and output tax, plus cost of sales.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty or negative lines and
    /// `MissingAccount` when a needed role is not configured.
    pub fn invoice(&self, event: &InvoiceConfirmed) -> Result<PostingPlan, LedgerError> {
        let rate = event.tax_rate.unwrap_or(self.default_tax_rate);
        let totals = sale_totals(&event.items, rate)?;
        let source = SourceRef::new(SourceType::Invoice, event.invoice_id);
        let description = format!("Invoice {}", event.reference);

        let mut sale_lines = vec![JournalLineInput::debit(
            self.accounts.receivable,
            totals.split.gross,
        )];
        push_credit(
            &mut sale_lines,
            self.accounts.require(AccountRole::SalesRevenue)?,
            totals.split.net,
        );
        if totals.split.tax > Decimal::ZERO {
            push_credit(
                &mut sale_lines,
                self.accounts.require(AccountRole::SalesTaxPayable)?,
                totals.split.tax,
            );
        }

        let mut entries = vec![planned(
            legs::SALE,
            source,
            event.date,
            &event.reference,
            &description,
            sale_lines,
        )];

        if totals.total_cost() > Decimal::ZERO {
            let cogs = self.accounts.require(AccountRole::CostOfGoodsSold)?;
            let inventory = self.accounts.require(AccountRole::Inventory)?;
            let mut cost_lines = Vec::with_capacity(totals.costs.len() * 2);
            for (item, cost) in &totals.costs {
                cost_lines.push(JournalLineInput::debit(cogs, *cost).with_description(item));
                cost_lines.push(JournalLineInput::credit(inventory, *cost).with_description(item));
            }
            entries.push(planned(
                legs::COST,
                source,
                event.date,
                &event.reference,
                &format!("Cost of sales {}", event.reference),
                cost_lines,
            ));
        }

        Ok(PostingPlan {
            source,
            entries,
            movements: vec![movement(
                event.client_id,
                legs::SALE,
                description,
                totals.split.gross,
                Decimal::ZERO,
                None,
            )],
        })
    }

    /// Credit note: the invoice sale leg reversed, with optional restocking.
    ///
    /// # Errors
    ///
    /// Same as [`PostingPlanner::invoice`].
    pub fn credit_note(&self, event: &CreditNoteIssued) -> Result<PostingPlan, LedgerError> {
        let rate = event.tax_rate.unwrap_or(self.default_tax_rate);
        let totals = sale_totals(&event.items, rate)?;
        let source = SourceRef::new(SourceType::CreditNote, event.credit_note_id);
        let description = format!("Credit note {}", event.reference);

        let mut sale_lines = Vec::with_capacity(3);
        push_debit(
            &mut sale_lines,
            self.accounts.require(AccountRole::SalesRevenue)?,
            totals.split.net,
        );
        if totals.split.tax > Decimal::ZERO {
            push_debit(
                &mut sale_lines,
                self.accounts.require(AccountRole::SalesTaxPayable)?,
                totals.split.tax,
            );
        }
        sale_lines.push(JournalLineInput::credit(
            self.accounts.receivable,
            totals.split.gross,
        ));

        let mut entries = vec![planned(
            legs::SALE,
            source,
            event.date,
            &event.reference,
            &description,
            sale_lines,
        )];

        if event.restock && totals.total_cost() > Decimal::ZERO {
            let cogs = self.accounts.require(AccountRole::CostOfGoodsSold)?;
            let inventory = self.accounts.require(AccountRole::Inventory)?;
            let mut cost_lines = Vec::with_capacity(totals.costs.len() * 2);
            for (item, cost) in &totals.costs {
                cost_lines.push(JournalLineInput::debit(inventory, *cost).with_description(item));
                cost_lines.push(JournalLineInput::credit(cogs, *cost).with_description(item));
            }
            entries.push(planned(
                legs::COST,
                source,
                event.date,
                &event.reference,
                &format!("Restock {}", event.reference),
                cost_lines,
            ));
        }

        Ok(PostingPlan {
            source,
            entries,
            movements: vec![movement(
                event.client_id,
                legs::SALE,
                description,
                Decimal::ZERO,
                totals.split.gross,
                None,
            )],
        })
    }

    /// Customer receipt: cash in, receivable down.
    ///
    /// # Errors
    ///
    /// Returns `ZeroAmount`/`NegativeAmount` for a non-positive amount.
    pub fn customer_payment(
        &self,
        event: &CustomerPaymentConfirmed,
    ) -> Result<PostingPlan, LedgerError> {
        positive(event.amount)?;
        let source = SourceRef::new(SourceType::CustomerPayment, event.payment_id.into_inner());
        let description = format!("Payment received {}", event.reference);

        Ok(PostingPlan {
            source,
            entries: vec![planned(
                legs::PAYMENT,
                source,
                event.date,
                &event.reference,
                &description,
                vec![
                    JournalLineInput::debit(event.cash_account, event.amount),
                    JournalLineInput::credit(self.accounts.receivable, event.amount),
                ],
            )],
            movements: vec![
                movement(
                    event.cash_account,
                    legs::PAYMENT,
                    description.clone(),
                    event.amount,
                    Decimal::ZERO,
                    Some(MovementStatus::Confirmed),
                ),
                movement(
                    event.client_id,
                    legs::PAYMENT,
                    description,
                    Decimal::ZERO,
                    event.amount,
                    Some(MovementStatus::Confirmed),
                ),
            ],
        })
    }

    /// Supplier payment: payable down, cash out.
    ///
    /// # Errors
    ///
    /// Returns `ZeroAmount`/`NegativeAmount` for a non-positive amount.
    pub fn supplier_payment(
        &self,
        event: &SupplierPaymentConfirmed,
    ) -> Result<PostingPlan, LedgerError> {
        positive(event.amount)?;
        let source = SourceRef::new(SourceType::SupplierPayment, event.payment_id.into_inner());
        let description = format!("Payment to supplier {}", event.reference);

        Ok(PostingPlan {
            source,
            entries: vec![planned(
                legs::PAYMENT,
                source,
                event.date,
                &event.reference,
                &description,
                vec![
                    JournalLineInput::debit(self.accounts.payable, event.amount),
                    JournalLineInput::credit(event.cash_account, event.amount),
                ],
            )],
            movements: vec![
                movement(
                    event.cash_account,
                    legs::PAYMENT,
                    description.clone(),
                    Decimal::ZERO,
                    event.amount,
                    Some(MovementStatus::Confirmed),
                ),
                movement(
                    event.supplier_id,
                    legs::PAYMENT,
                    description,
                    event.amount,
                    Decimal::ZERO,
                    Some(MovementStatus::Confirmed),
                ),
            ],
        })
    }

    /// Expense voucher: net per expense account plus recoverable tax, against
    /// cash or accrued expenses.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty or non-positive lines and
    /// `MissingAccount` for tax control or accrued expenses when needed.
    pub fn expense(&self, event: &ExpensePosted) -> Result<PostingPlan, LedgerError> {
        if event.lines.is_empty() {
            return Err(LedgerError::Validation("expense has no lines".to_string()));
        }

        // (account, net) in first-seen order
        let mut by_account: Vec<(AccountId, Decimal)> = Vec::new();
        let mut total = TaxSplit::default();
        for line in &event.lines {
            positive(line.gross)?;
            let split = line
                .tax_rate
                .unwrap_or(self.default_tax_rate)
                .split_gross(round_money(line.gross));
            match by_account
                .iter_mut()
                .find(|(account, _)| *account == line.expense_account)
            {
                Some((_, net)) => *net += split.net,
                None => by_account.push((line.expense_account, split.net)),
            }
            total = total + split;
        }

        let source = SourceRef::new(SourceType::Expense, event.expense_id);
        let mut lines = Vec::with_capacity(by_account.len() + 2);
        for (account, net) in by_account {
            push_debit(&mut lines, account, net);
        }
        if total.tax > Decimal::ZERO {
            push_debit(
                &mut lines,
                self.accounts.require(AccountRole::TaxControl)?,
                total.tax,
            );
        }

        let mut movements = Vec::new();
        match event.settlement {
            ExpenseSettlement::Paid { account_id } => {
                lines.push(JournalLineInput::credit(account_id, total.gross));
                movements.push(movement(
                    account_id,
                    legs::EXPENSE,
                    event.description.clone(),
                    Decimal::ZERO,
                    total.gross,
                    None,
                ));
            }
            ExpenseSettlement::Deferred => {
                lines.push(JournalLineInput::credit(
                    self.accounts.require(AccountRole::AccruedExpenses)?,
                    total.gross,
                ));
            }
        }

        Ok(PostingPlan {
            source,
            entries: vec![planned(
                legs::EXPENSE,
                source,
                event.date,
                &event.reference,
                &event.description,
                lines,
            )],
            movements,
        })
    }

    /// Depreciation charge.
    ///
    /// # Errors
    ///
    /// Returns `MissingAccount` when either depreciation account is missing.
    pub fn depreciation(&self, event: &DepreciationPosted) -> Result<PostingPlan, LedgerError> {
        positive(event.amount)?;
        let amount = round_money(event.amount);
        let source = SourceRef::new(SourceType::Depreciation, event.run_id);

        Ok(PostingPlan {
            source,
            entries: vec![planned(
                legs::DEPRECIATION,
                source,
                event.date,
                &event.reference,
                &format!("Depreciation {}", event.reference),
                vec![
                    JournalLineInput::debit(
                        self.accounts.require(AccountRole::DepreciationExpense)?,
                        amount,
                    ),
                    JournalLineInput::credit(
                        self.accounts.require(AccountRole::AccumulatedDepreciation)?,
                        amount,
                    ),
                ],
            )],
            movements: Vec::new(),
        })
    }

    /// Purchase on credit: inventory and input tax against the payable.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty or negative lines and
    /// `MissingAccount` for inventory or tax control when needed.
    pub fn purchase_receipt(&self, event: &PurchaseReceived) -> Result<PostingPlan, LedgerError> {
        if event.lines.is_empty() {
            return Err(LedgerError::Validation(
                "purchase receipt has no lines".to_string(),
            ));
        }
        let rate = event.tax_rate.unwrap_or(self.default_tax_rate);
        let mut total = TaxSplit::default();
        for line in &event.lines {
            positive(line.quantity)?;
            non_negative(line.unit_cost)?;
            total = total + rate.split_gross(extended(line.quantity, line.unit_cost)?);
        }
        positive(total.gross)?;

        let source = SourceRef::new(SourceType::PurchaseReceipt, event.receipt_id);
        let description = format!("Purchase {}", event.reference);
        let mut lines = Vec::with_capacity(3);
        push_debit(
            &mut lines,
            self.accounts.require(AccountRole::Inventory)?,
            total.net,
        );
        if total.tax > Decimal::ZERO {
            push_debit(
                &mut lines,
                self.accounts.require(AccountRole::TaxControl)?,
                total.tax,
            );
        }
        lines.push(JournalLineInput::credit(self.accounts.payable, total.gross));

        Ok(PostingPlan {
            source,
            entries: vec![planned(
                legs::RECEIPT,
                source,
                event.date,
                &event.reference,
                &description,
                lines,
            )],
            movements: vec![movement(
                event.supplier_id,
                legs::RECEIPT,
                description,
                Decimal::ZERO,
                total.gross,
                None,
            )],
        })
    }
}

fn sale_totals(items: &[SaleItem], rate: TaxRate) -> Result<SaleTotals, LedgerError> {
    if items.is_empty() {
        return Err(LedgerError::Validation("document has no items".to_string()));
    }
    let mut totals = SaleTotals::default();
    for item in items {
        positive(item.quantity)?;
        non_negative(item.unit_price)?;
        non_negative(item.unit_cost)?;

        let gross = extended(item.quantity, item.unit_price)?;
        totals.split = totals.split + rate.split_gross(gross);

        let cost = extended(item.quantity, item.unit_cost)?;
        if cost > Decimal::ZERO {
            totals.costs.push((item.description.clone(), cost));
        }
    }
    positive(totals.split.gross)?;
    Ok(totals)
}

/// Largest magnitude accepted for any amount, quantity or price: the integer
/// range of a `NUMERIC(19, 4)` column.
const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// `quantity * unit`, rounded to money.
fn extended(quantity: Decimal, unit: Decimal) -> Result<Decimal, LedgerError> {
    let amount = quantity
        .checked_mul(unit)
        .ok_or_else(|| LedgerError::Validation(format!("{quantity} x {unit} overflows")))?;
    let amount = round_money(amount);
    non_negative(amount)?;
    Ok(amount)
}

fn positive(amount: Decimal) -> Result<(), LedgerError> {
    non_negative(amount)?;
    if amount.is_zero() {
        return Err(LedgerError::ZeroAmount);
    }
    Ok(())
}

fn non_negative(amount: Decimal) -> Result<(), LedgerError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(LedgerError::NegativeAmount);
    }
    if amount >= MAX_AMOUNT {
        return Err(LedgerError::Validation(format!(
            "amount {amount} exceeds {MAX_AMOUNT}"
        )));
    }
    Ok(())
}

fn push_debit(lines: &mut Vec<JournalLineInput>, account: AccountId, amount: Decimal) {
    if amount > Decimal::ZERO {
        lines.push(JournalLineInput::debit(account, amount));
    }
}

fn push_credit(lines: &mut Vec<JournalLineInput>, account: AccountId, amount: Decimal) {
    if amount > Decimal::ZERO {
        lines.push(JournalLineInput::credit(account, amount));
    }
}

fn planned(
    leg: &'static str,
    source: SourceRef,
    date: NaiveDate,
    reference: &str,
    description: &str,
    lines: Vec<JournalLineInput>,
) -> PlannedEntry {
    PlannedEntry {
        leg,
        entry: JournalEntryInput {
            entry_date: date,
            reference: reference.to_string(),
            description: description.to_string(),
            source: Some(source),
            idempotency_key: Some(source.idempotency_key(leg)),
            lines,
        },
    }
}

fn movement<S: Subject>(
    subject: S,
    leg: &'static str,
    description: String,
    debit: Decimal,
    credit: Decimal,
    status: Option<MovementStatus>,
) -> SubledgerMovement {
    SubledgerMovement {
        kind: S::KIND,
        subject_id: subject.uuid(),
        leg,
        description,
        debit,
        credit,
        status,
    }
}
