//! Payment state transitions.

use chrono::Utc;
use rust_decimal::Decimal;

use crate::ledger::LedgerError;
use crate::payment::types::{PaymentAction, PaymentEvent, PaymentStatus, PendingPayment};
use crate::posting::{PostingPlan, PostingPlanner};

/// Stateless service for payment lifecycle transitions.
pub struct PaymentWorkflow;

impl PaymentWorkflow {
    /// Validates a new payment before it is recorded `in_pay`.
    ///
    /// # Errors
    ///
    /// Returns `ZeroAmount` or `NegativeAmount`.
    pub fn record(amount: Decimal) -> Result<PaymentStatus, LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }
        if amount.is_sign_negative() {
            return Err(LedgerError::NegativeAmount);
        }
        Ok(PaymentStatus::InPay)
    }

    /// Confirm a recorded payment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the payment is `in_pay`.
    pub fn confirm(current_status: PaymentStatus) -> Result<PaymentAction, LedgerError> {
        match current_status {
            PaymentStatus::InPay => Ok(PaymentAction::Confirm {
                new_status: PaymentStatus::Confirmed,
                confirmed_at: Utc::now(),
            }),
            _ => Err(invalid(current_status, PaymentStatus::Confirmed)),
        }
    }

    /// Cancel a recorded payment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the payment is `in_pay`.
    pub fn cancel(
        current_status: PaymentStatus,
        reason: Option<String>,
    ) -> Result<PaymentAction, LedgerError> {
        match current_status {
            PaymentStatus::InPay => Ok(PaymentAction::Cancel {
                new_status: PaymentStatus::Cancelled,
                reason: reason.filter(|r| !r.trim().is_empty()),
                cancelled_at: Utc::now(),
            }),
            _ => Err(invalid(current_status, PaymentStatus::Cancelled)),
        }
    }

    /// Checks the transition and plans the ledger effects of confirming
    /// `payment`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` or any planning error.
    pub fn plan_confirmation(
        planner: &PostingPlanner,
        payment: &PendingPayment,
    ) -> Result<(PaymentAction, PostingPlan), LedgerError> {
        let action = Self::confirm(payment.status)?;
        let plan = match payment.posting_event() {
            PaymentEvent::Customer(event) => planner.customer_payment(&event)?,
            PaymentEvent::Supplier(event) => planner.supplier_payment(&event)?,
        };
        Ok((action, plan))
    }
}

fn invalid(from: PaymentStatus, to: PaymentStatus) -> LedgerError {
    LedgerError::InvalidTransition {
        from: from.to_string(),
        to: to.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::types::PaymentDirection;
    use crate::posting::PostingAccounts;
    use crate::subledger::SubledgerKind;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tally_shared::types::{AccountId, PaymentId, TaxRate};
    use uuid::Uuid;

    fn payment(status: PaymentStatus) -> PendingPayment {
        PendingPayment {
            id: PaymentId::new(),
            direction: PaymentDirection::Receipt,
            subject_id: Uuid::now_v7(),
            cash_account: AccountId::new(),
            amount: dec!(500.00),
            payment_date: NaiveDate::from_ymd_opt(2025, 2, 20).unwrap(),
            reference: "RC-500".to_string(),
            status,
        }
    }

    fn planner() -> PostingPlanner {
        PostingPlanner::new(
            PostingAccounts::new(AccountId::new(), AccountId::new()),
            TaxRate::ZERO,
        )
    }

    #[test]
    fn test_record_validates_amount() {
        assert_eq!(PaymentWorkflow::record(dec!(1)).unwrap(), PaymentStatus::InPay);
        assert!(matches!(PaymentWorkflow::record(dec!(0)), Err(LedgerError::ZeroAmount)));
        assert!(matches!(
            PaymentWorkflow::record(dec!(-5)),
            Err(LedgerError::NegativeAmount)
        ));
    }

    #[test]
    fn test_confirm_from_in_pay() {
        let action = PaymentWorkflow::confirm(PaymentStatus::InPay).unwrap();
        assert_eq!(action.new_status(), PaymentStatus::Confirmed);
    }

    #[test]
    fn test_confirm_twice_fails() {
        let err = PaymentWorkflow::confirm(PaymentStatus::Confirmed).unwrap_err();
        assert_eq!(err.to_string(), "Invalid transition from confirmed to confirmed");
    }

    #[test]
    fn test_cancel_blank_reason_dropped() {
        match PaymentWorkflow::cancel(PaymentStatus::InPay, Some("  ".to_string())).unwrap() {
            PaymentAction::Cancel { reason, .. } => assert_eq!(reason, None),
            PaymentAction::Confirm { .. } => panic!("expected cancel"),
        }
    }

    #[test]
    fn test_cancelled_cannot_confirm() {
        assert!(matches!(
            PaymentWorkflow::confirm(PaymentStatus::Cancelled),
            Err(LedgerError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_plan_confirmation_for_receipt() {
        let p = payment(PaymentStatus::InPay);
        let (action, plan) = PaymentWorkflow::plan_confirmation(&planner(), &p).unwrap();
        assert_eq!(action.new_status(), PaymentStatus::Confirmed);
        assert_eq!(plan.entries.len(), 1);
        let client = plan
            .movements
            .iter()
            .find(|m| m.kind == SubledgerKind::Client)
            .unwrap();
        assert_eq!(client.subject_id, p.subject_id);
        assert_eq!(client.signed_amount(), dec!(-500.00));
    }

    #[test]
    fn test_plan_confirmation_rejects_terminal() {
        let p = payment(PaymentStatus::Confirmed);
        assert!(PaymentWorkflow::plan_confirmation(&planner(), &p).is_err());
    }
}
