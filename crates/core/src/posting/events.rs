//! Business events that produce ledger postings.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, ClientId, PaymentId, SupplierId, TaxRate};
use uuid::Uuid;

/// One sold (or returned) line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    /// Line description.
    pub description: String,
    /// Quantity sold.
    pub quantity: Decimal,
    /// Tax-inclusive unit price.
    pub unit_price: Decimal,
    /// Unit cost, for the cost-of-goods leg. Zero when unknown.
    pub unit_cost: Decimal,
}

/// A sales invoice has been confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceConfirmed {
    /// Invoice id.
    pub invoice_id: Uuid,
    /// Billed client.
    pub client_id: ClientId,
    /// Invoice date.
    pub date: NaiveDate,
    /// Invoice number.
    pub reference: String,
    /// Lines.
    pub items: Vec<SaleItem>,
    /// Rate override; the configured default applies when `None`.
    pub tax_rate: Option<TaxRate>,
}

/// A credit note has been issued against a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditNoteIssued {
    /// Credit note id.
    pub credit_note_id: Uuid,
    /// Credited client.
    pub client_id: ClientId,
    /// Credit note date.
    pub date: NaiveDate,
    /// Credit note number.
    pub reference: String,
    /// Returned lines.
    pub items: Vec<SaleItem>,
    /// Rate override; the configured default applies when `None`.
    pub tax_rate: Option<TaxRate>,
    /// Put returned goods back into inventory at cost.
    pub restock: bool,
}

/// A customer receipt has been confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerPaymentConfirmed {
    /// Payment id.
    pub payment_id: PaymentId,
    /// Paying client.
    pub client_id: ClientId,
    /// Cash or bank account receiving the money.
    pub cash_account: AccountId,
    /// Amount received.
    pub amount: Decimal,
    /// Payment date.
    pub date: NaiveDate,
    /// Receipt reference.
    pub reference: String,
}

/// A payment to a supplier has been confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierPaymentConfirmed {
    /// Payment id.
    pub payment_id: PaymentId,
    /// Paid supplier.
    pub supplier_id: SupplierId,
    /// Cash or bank account paying out.
    pub cash_account: AccountId,
    /// Amount paid.
    pub amount: Decimal,
    /// Payment date.
    pub date: NaiveDate,
    /// Payment reference.
    pub reference: String,
}

/// One line of an expense voucher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseLine {
    /// Expense account charged.
    pub expense_account: AccountId,
    /// Line description.
    pub description: String,
    /// Tax-inclusive amount.
    pub gross: Decimal,
    /// Rate override; the configured default applies when `None`.
    pub tax_rate: Option<TaxRate>,
}

/// How an expense is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExpenseSettlement {
    /// Paid immediately from a cash account.
    Paid {
        /// Cash or bank account.
        account_id: AccountId,
    },
    /// Accrued, to be paid later.
    Deferred,
}

/// An expense voucher has been posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpensePosted {
    /// Expense id.
    pub expense_id: Uuid,
    /// Expense date.
    pub date: NaiveDate,
    /// Voucher reference.
    pub reference: String,
    /// Narrative.
    pub description: String,
    /// Lines.
    pub lines: Vec<ExpenseLine>,
    /// Settlement.
    pub settlement: ExpenseSettlement,
}

/// A depreciation charge has been computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepreciationPosted {
    /// Depreciation run id.
    pub run_id: Uuid,
    /// Charge date.
    pub date: NaiveDate,
    /// Reference (asset tag, run number).
    pub reference: String,
    /// Charge amount.
    pub amount: Decimal,
}

/// One received purchase line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    /// Line description.
    pub description: String,
    /// Quantity received.
    pub quantity: Decimal,
    /// Tax-inclusive unit cost.
    pub unit_cost: Decimal,
}

/// Goods have been received from a supplier on credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceived {
    /// Receipt id.
    pub receipt_id: Uuid,
    /// Supplier.
    pub supplier_id: SupplierId,
    /// Receipt date.
    pub date: NaiveDate,
    /// Supplier invoice number.
    pub reference: String,
    /// Lines.
    pub lines: Vec<PurchaseLine>,
    /// Rate override; the configured default applies when `None`.
    pub tax_rate: Option<TaxRate>,
}
