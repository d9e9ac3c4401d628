//! Posting coordination for business events.
//!
//! Each event is planned here as a set of balanced journal entries plus the
//! subledger rows that mirror them. Execution against storage lives in the
//! database crate.

pub mod accounts;
pub mod events;
pub mod plan;
pub mod planner;

#[cfg(test)]
mod planner_props;

pub use accounts::{AccountRole, PostingAccounts};
pub use events::{
    CreditNoteIssued, CustomerPaymentConfirmed, DepreciationPosted, ExpenseLine, ExpensePosted,
    ExpenseSettlement, InvoiceConfirmed, PurchaseLine, PurchaseReceived, SaleItem,
    SupplierPaymentConfirmed,
};
pub use plan::{MovementStatus, PlannedEntry, PostingPlan, SubledgerMovement};
pub use planner::{PostingPlanner, legs};
