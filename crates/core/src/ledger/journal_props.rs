//! Property-based tests for journal entry validation.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::AccountId;

use super::error::LedgerError;
use super::journal::{JournalEntryInput, JournalLineInput, validate_entry};

const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Strategy to generate a valid positive amount (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Splits `total` into `parts` positive cent amounts.
fn split(total: Decimal, parts: usize) -> Vec<Decimal> {
    let cents = (total * Decimal::ONE_HUNDRED).trunc();
    let n = Decimal::from(parts);
    let each = (cents / n).trunc();
    let mut out: Vec<Decimal> = (0..parts).map(|_| each / Decimal::ONE_HUNDRED).collect();
    let rest = (cents - each * n) / Decimal::ONE_HUNDRED;
    if let Some(first) = out.first_mut() {
        *first += rest;
    }
    out
}

fn entry(lines: Vec<JournalLineInput>) -> JournalEntryInput {
    JournalEntryInput {
        entry_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
        reference: "JE".to_string(),
        description: "prop".to_string(),
        source: None,
        idempotency_key: None,
        lines,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property: balanced entries validate and report their totals**
    ///
    /// *For any* total split into N debit lines and M credit lines, the entry
    /// validates and debit total == credit total == the original amount.
    #[test]
    fn prop_balanced_entries_validate(
        total in (200i64..100_000_000i64).prop_map(|c| Decimal::new(c, 2)),
        debit_parts in 1usize..5,
        credit_parts in 1usize..5,
    ) {
        let mut lines: Vec<JournalLineInput> = split(total, debit_parts)
            .into_iter()
            .map(|a| JournalLineInput::debit(AccountId::new(), a))
            .collect();
        lines.extend(
            split(total, credit_parts)
                .into_iter()
                .map(|a| JournalLineInput::credit(AccountId::new(), a)),
        );

        let totals = validate_entry(&entry(lines), TOLERANCE).unwrap();
        prop_assert_eq!(totals.debit, total);
        prop_assert_eq!(totals.credit, total);
    }

    /// **Property: imbalance beyond one cent is rejected**
    #[test]
    fn prop_imbalance_rejected(
        debit in positive_amount(),
        skew_cents in 2i64..10_000,
    ) {
        let credit = debit + Decimal::new(skew_cents, 2);
        let result = validate_entry(
            &entry(vec![
                JournalLineInput::debit(AccountId::new(), debit),
                JournalLineInput::credit(AccountId::new(), credit),
            ]),
            TOLERANCE,
        );
        let is_imbalanced = matches!(result, Err(LedgerError::ImbalancedEntry { .. }));
        prop_assert!(is_imbalanced);
    }

    /// **Property: a zero line is rejected wherever it appears**
    #[test]
    fn prop_zero_line_rejected(
        amount in positive_amount(),
        position in 0usize..3,
    ) {
        let a = AccountId::new();
        let mut lines = vec![
            JournalLineInput::debit(a, amount),
            JournalLineInput::credit(a, amount),
        ];
        lines.insert(position, JournalLineInput::debit(a, Decimal::ZERO));

        let result = validate_entry(&entry(lines), TOLERANCE);
        let rejected_line = match result {
            Err(LedgerError::InvalidLine { line, .. }) => Some(line),
            _ => None,
        };
        prop_assert_eq!(rejected_line, Some(position + 1));
    }
}
