//! Running-balance chain arithmetic.
//!
//! A chain is replayed in insertion-id order. Dates do not reorder the
//! recurrence: a row dated in the past is still appended last, and only rows
//! with a larger id than the recalculation anchor are re-derived.
//! `dated_order` is the reading order for histories and aging.

use std::cmp::Ordering;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::kind::SubledgerKind;
use crate::ledger::LedgerError;

/// The fields of a subledger row that take part in balance arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRow {
    /// Insertion id.
    pub id: i64,
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Stored running balance.
    pub running_balance: Decimal,
}

/// Orders rows by `(entry_date, id)` for display and aging.
#[must_use]
pub fn dated_order(a: &ChainRow, b: &ChainRow) -> Ordering {
    a.entry_date
        .cmp(&b.entry_date)
        .then_with(|| a.id.cmp(&b.id))
}

/// Balance after applying one row to `previous`.
#[must_use]
pub fn next_balance(
    kind: SubledgerKind,
    previous: Decimal,
    debit: Decimal,
    credit: Decimal,
) -> Decimal {
    previous + kind.movement(debit, credit)
}

/// A stored running balance that must be rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceUpdate {
    /// Row id.
    pub id: i64,
    /// Value currently stored.
    pub old_balance: Decimal,
    /// Re-derived value.
    pub new_balance: Decimal,
}

/// Result of re-deriving a chain suffix.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Recalculation {
    /// Rows whose stored balance changed, in id order.
    pub updates: Vec<BalanceUpdate>,
    /// Number of rows walked.
    pub rows_walked: usize,
    /// Balance of the last row walked (or the start balance if none).
    pub final_balance: Decimal,
}

/// Re-derives the running balances of `tail`, starting from `start_balance`.
///
/// `tail` must already be in id order and must not include the row that
/// produced `start_balance`. Only rows whose stored value differs are
/// returned as updates.
#[must_use]
pub fn recompute_tail(
    kind: SubledgerKind,
    start_balance: Decimal,
    tail: &[ChainRow],
) -> Recalculation {
    let mut balance = start_balance;
    let mut updates = Vec::new();
    for row in tail {
        balance = next_balance(kind, balance, row.debit, row.credit);
        if balance != row.running_balance {
            updates.push(BalanceUpdate {
                id: row.id,
                old_balance: row.running_balance,
                new_balance: balance,
            });
        }
    }
    Recalculation {
        updates,
        rows_walked: tail.len(),
        final_balance: balance,
    }
}

/// Checks that the chain tail after an append equals the old head plus the
/// appended movement.
///
/// # Errors
///
/// Returns `Consistency` when they differ.
pub fn check_tail(
    kind: SubledgerKind,
    previous_head: Decimal,
    movement: Decimal,
    actual_tail: Decimal,
) -> Result<(), LedgerError> {
    let expected = previous_head + movement;
    if expected == actual_tail {
        Ok(())
    } else {
        Err(LedgerError::Consistency(format!(
            "{kind} chain ends at {actual_tail}, expected {expected}"
        )))
    }
}

/// First row whose stored balance disagrees with its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBreak {
    /// Row id.
    pub id: i64,
    /// Balance implied by the predecessor and the row's movement.
    pub expected: Decimal,
    /// Balance stored on the row.
    pub actual: Decimal,
}

/// Outcome of replaying a whole chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    /// Kind of the chain.
    pub kind: SubledgerKind,
    /// Rows replayed.
    pub rows_checked: usize,
    /// First broken link, if any.
    pub first_break: Option<ChainBreak>,
    /// Number of rows whose stored balance is wrong.
    pub broken_rows: usize,
    /// Sum of all movements.
    pub expected_balance: Decimal,
    /// Denormalized head balance, when one exists.
    pub head_balance: Option<Decimal>,
}

impl ChainReport {
    /// True if every link holds and the head agrees with the replay.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.first_break.is_none()
            && self
                .head_balance
                .is_none_or(|head| head == self.expected_balance)
    }
}

/// Replays a chain from zero and compares every stored balance.
///
/// `rows` are sorted by insertion id first.
#[must_use]
pub fn verify_chain(
    kind: SubledgerKind,
    rows: &[ChainRow],
    head_balance: Option<Decimal>,
) -> ChainReport {
    let mut ordered: Vec<&ChainRow> = rows.iter().collect();
    ordered.sort_by_key(|r| r.id);

    let mut balance = Decimal::ZERO;
    let mut first_break = None;
    let mut broken_rows = 0;
    for row in ordered {
        balance = next_balance(kind, balance, row.debit, row.credit);
        if balance != row.running_balance {
            broken_rows += 1;
            first_break.get_or_insert(ChainBreak {
                id: row.id,
                expected: balance,
                actual: row.running_balance,
            });
        }
    }

    ChainReport {
        kind,
        rows_checked: rows.len(),
        first_break,
        broken_rows,
        expected_balance: balance,
        head_balance,
    }
}
