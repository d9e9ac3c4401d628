//! Property-based tests for running-balance chains.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::chain::{ChainRow, check_tail, dated_order, next_balance, recompute_tail, verify_chain};
use super::kind::SubledgerKind;

fn kind_strategy() -> impl Strategy<Value = SubledgerKind> {
    prop_oneof![
        Just(SubledgerKind::Account),
        Just(SubledgerKind::Client),
        Just(SubledgerKind::Supplier),
    ]
}

/// (day offset, debit, credit) with exactly one side set.
fn movement_strategy() -> impl Strategy<Value = (i64, Decimal, Decimal)> {
    (0i64..90, 1i64..1_000_000, any::<bool>()).prop_map(|(day, cents, is_debit)| {
        let amount = Decimal::new(cents, 2);
        if is_debit {
            (day, amount, Decimal::ZERO)
        } else {
            (day, Decimal::ZERO, amount)
        }
    })
}

fn date(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Duration::days(offset)
}

/// Appends rows the way the store does: the new row starts from the latest
/// row by `(entry_date, id)`, then every row inserted after that anchor is
/// re-derived in id order.
fn append_all(kind: SubledgerKind, movements: &[(i64, Decimal, Decimal)]) -> Vec<ChainRow> {
    let mut rows: Vec<ChainRow> = Vec::new();
    for (idx, (day, debit, credit)) in movements.iter().enumerate() {
        let id = i64::try_from(idx).unwrap() + 1;
        let anchor = rows.iter().max_by(|a, b| dated_order(a, b)).cloned();
        let head_before = rows.last().map_or(Decimal::ZERO, |r| r.running_balance);
        let (anchor_id, anchor_balance) =
            anchor.map_or((0, Decimal::ZERO), |r| (r.id, r.running_balance));

        rows.push(ChainRow {
            id,
            entry_date: date(*day),
            debit: *debit,
            credit: *credit,
            running_balance: next_balance(kind, anchor_balance, *debit, *credit),
        });

        let tail: Vec<ChainRow> = rows.iter().filter(|r| r.id > anchor_id).cloned().collect();
        let recalc = recompute_tail(kind, anchor_balance, &tail);
        for update in &recalc.updates {
            if let Some(r) = rows.iter_mut().find(|r| r.id == update.id) {
                r.running_balance = update.new_balance;
            }
        }
        check_tail(kind, head_before, kind.movement(*debit, *credit), recalc.final_balance)
            .unwrap();
    }
    rows
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property: every adjacent pair satisfies the recurrence**
    ///
    /// *For any* sequence of appends, in or out of date order, replaying the
    /// chain from zero in id order reproduces every stored running balance.
    #[test]
    fn prop_chain_recurrence_holds(
        kind in kind_strategy(),
        movements in prop::collection::vec(movement_strategy(), 1..30),
    ) {
        let rows = append_all(kind, &movements);
        let report = verify_chain(kind, &rows, None);
        prop_assert!(report.first_break.is_none(), "break: {:?}", report.first_break);
    }

    /// **Property: the chain tail equals the sum of signed movements**
    #[test]
    fn prop_tail_equals_sum(
        kind in kind_strategy(),
        movements in prop::collection::vec(movement_strategy(), 1..30),
    ) {
        let rows = append_all(kind, &movements);
        let tail = rows.last().map(|r| r.running_balance).unwrap();
        let sum: Decimal = movements
            .iter()
            .map(|(_, debit, credit)| kind.movement(*debit, *credit))
            .sum();
        prop_assert_eq!(tail, sum);
    }

    /// **Property: in-order appends never rewrite history**
    #[test]
    fn prop_in_order_appends_need_no_recalculation(
        kind in kind_strategy(),
        mut movements in prop::collection::vec(movement_strategy(), 1..30),
    ) {
        movements.sort_by_key(|(day, _, _)| *day);
        let mut balance = Decimal::ZERO;
        let mut rows = Vec::new();
        for (idx, (day, debit, credit)) in movements.iter().enumerate() {
            balance = next_balance(kind, balance, *debit, *credit);
            rows.push(ChainRow {
                id: i64::try_from(idx).unwrap() + 1,
                entry_date: date(*day),
                debit: *debit,
                credit: *credit,
                running_balance: balance,
            });
        }
        prop_assert_eq!(rows, append_all(kind, &movements));
    }
}
