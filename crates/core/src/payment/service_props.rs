//! Property-based tests for payment transitions.

use proptest::prelude::*;

use super::service::PaymentWorkflow;
use super::types::PaymentStatus;

fn status_strategy() -> impl Strategy<Value = PaymentStatus> {
    prop_oneof![
        Just(PaymentStatus::InPay),
        Just(PaymentStatus::Confirmed),
        Just(PaymentStatus::Cancelled),
    ]
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Confirm,
    Cancel,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![Just(Step::Confirm), Just(Step::Cancel)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property: only `in_pay` payments can move**
    #[test]
    fn prop_only_in_pay_transitions(status in status_strategy()) {
        let confirm_ok = PaymentWorkflow::confirm(status).is_ok();
        let cancel_ok = PaymentWorkflow::cancel(status, None).is_ok();
        prop_assert_eq!(confirm_ok, status == PaymentStatus::InPay);
        prop_assert_eq!(cancel_ok, status == PaymentStatus::InPay);
    }

    /// **Property: any sequence of requests applies at most one transition**
    ///
    /// *For any* sequence of confirm/cancel requests starting from `in_pay`,
    /// exactly the first succeeds and the payment ends in the state it chose.
    #[test]
    fn prop_first_transition_wins(steps in prop::collection::vec(step_strategy(), 1..10)) {
        let mut status = PaymentStatus::InPay;
        let mut applied = 0;
        for step in &steps {
            let result = match step {
                Step::Confirm => PaymentWorkflow::confirm(status),
                Step::Cancel => PaymentWorkflow::cancel(status, None),
            };
            if let Ok(action) = result {
                status = action.new_status();
                applied += 1;
            }
        }
        prop_assert_eq!(applied, 1);
        let expected = match steps[0] {
            Step::Confirm => PaymentStatus::Confirmed,
            Step::Cancel => PaymentStatus::Cancelled,
        };
        prop_assert_eq!(status, expected);
    }
}
