//! Payment workflow types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, ClientId, PaymentId, SupplierId};
use uuid::Uuid;

use crate::posting::{CustomerPaymentConfirmed, SupplierPaymentConfirmed};

/// Payment lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Recorded, no ledger effect yet.
    InPay,
    /// Posted to the ledger.
    Confirmed,
    /// Discarded without ledger effect.
    Cancelled,
}

impl PaymentStatus {
    /// Returns the string representation stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InPay => "in_pay",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses the database representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_pay" => Some(Self::InPay),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// No transitions leave a terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Cancelled)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the business a payment settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentDirection {
    /// Money received from a client.
    Receipt,
    /// Money paid to a supplier.
    Disbursement,
}

impl PaymentDirection {
    /// Returns the string representation stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Receipt => "receipt",
            Self::Disbursement => "disbursement",
        }
    }

    /// Parses the database representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "receipt" => Some(Self::Receipt),
            "disbursement" => Some(Self::Disbursement),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded payment awaiting (or past) confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPayment {
    /// Payment id.
    pub id: PaymentId,
    /// Receipt or disbursement.
    pub direction: PaymentDirection,
    /// Client id for receipts, supplier id for disbursements.
    pub subject_id: Uuid,
    /// Cash or bank account.
    pub cash_account: AccountId,
    /// Amount.
    pub amount: Decimal,
    /// Accounting date of the payment.
    pub payment_date: NaiveDate,
    /// Receipt or transfer reference.
    pub reference: String,
    /// Current state.
    pub status: PaymentStatus,
}

/// Posting event for a confirmed payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    /// Client receipt.
    Customer(CustomerPaymentConfirmed),
    /// Supplier disbursement.
    Supplier(SupplierPaymentConfirmed),
}

impl PendingPayment {
    /// Builds the posting event recognized on confirmation.
    #[must_use]
    pub fn posting_event(&self) -> PaymentEvent {
        match self.direction {
            PaymentDirection::Receipt => PaymentEvent::Customer(CustomerPaymentConfirmed {
                payment_id: self.id,
                client_id: ClientId::from_uuid(self.subject_id),
                cash_account: self.cash_account,
                amount: self.amount,
                date: self.payment_date,
                reference: self.reference.clone(),
            }),
            PaymentDirection::Disbursement => PaymentEvent::Supplier(SupplierPaymentConfirmed {
                payment_id: self.id,
                supplier_id: SupplierId::from_uuid(self.subject_id),
                cash_account: self.cash_account,
                amount: self.amount,
                date: self.payment_date,
                reference: self.reference.clone(),
            }),
        }
    }
}

/// A validated state change, applied by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentAction {
    /// Move to `confirmed` and post.
    Confirm {
        /// Always `Confirmed`.
        new_status: PaymentStatus,
        /// Timestamp of the transition.
        confirmed_at: DateTime<Utc>,
    },
    /// Move to `cancelled`.
    Cancel {
        /// Always `Cancelled`.
        new_status: PaymentStatus,
        /// Optional reason.
        reason: Option<String>,
        /// Timestamp of the transition.
        cancelled_at: DateTime<Utc>,
    },
}

impl PaymentAction {
    /// Target status.
    #[must_use]
    pub const fn new_status(&self) -> PaymentStatus {
        match self {
            Self::Confirm { new_status, .. } | Self::Cancel { new_status, .. } => *new_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_strings() {
        for s in [
            PaymentStatus::InPay,
            PaymentStatus::Confirmed,
            PaymentStatus::Cancelled,
        ] {
            assert_eq!(PaymentStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(PaymentStatus::parse("pending"), None);
        assert_eq!(PaymentStatus::InPay.to_string(), "in_pay");
    }

    #[test]
    fn test_terminal_states() {
        assert!(!PaymentStatus::InPay.is_terminal());
        assert!(PaymentStatus::Confirmed.is_terminal());
        assert!(PaymentStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_posting_event_direction() {
        let payment = PendingPayment {
            id: PaymentId::new(),
            direction: PaymentDirection::Disbursement,
            subject_id: Uuid::now_v7(),
            cash_account: AccountId::new(),
            amount: dec!(75.00),
            payment_date: NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
            reference: "TR-9".to_string(),
            status: PaymentStatus::InPay,
        };
        match payment.posting_event() {
            PaymentEvent::Supplier(event) => {
                assert_eq!(event.supplier_id.into_inner(), payment.subject_id);
                assert_eq!(event.amount, dec!(75.00));
            }
            PaymentEvent::Customer(_) => panic!("expected supplier event"),
        }
    }
}
