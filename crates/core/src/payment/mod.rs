//! Two-phase payment workflow.
//!
//! Payments are recorded `in_pay` with no ledger effect. Confirmation posts
//! them; cancellation discards them. Both are terminal.

pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use service::PaymentWorkflow;
pub use types::{PaymentAction, PaymentDirection, PaymentEvent, PaymentStatus, PendingPayment};
