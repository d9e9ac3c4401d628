//! Posting plans: the pure output of the planner, executed by the store.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::ledger::{JournalEntryInput, SourceRef};
use crate::subledger::SubledgerKind;

/// Lifecycle tag stored on subledger rows that come from payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementStatus {
    /// Recorded but not yet recognized.
    Pending,
    /// Recognized in the ledger.
    Confirmed,
}

impl MovementStatus {
    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
        }
    }
}

/// One balanced journal entry of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedEntry {
    /// Leg name, unique within the plan ("sale", "cost", ...).
    pub leg: &'static str,
    /// The entry to post.
    pub entry: JournalEntryInput,
}

/// One subledger row to append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubledgerMovement {
    /// Chain kind.
    pub kind: SubledgerKind,
    /// Subject id within the chain.
    pub subject_id: Uuid,
    /// Leg whose journal entry the row cross-references.
    pub leg: &'static str,
    /// Row narrative.
    pub description: String,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Status for payment rows.
    pub status: Option<MovementStatus>,
}

impl SubledgerMovement {
    /// Signed change this row applies to its chain.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        self.kind.movement(self.debit, self.credit)
    }
}

/// Everything one business event writes, computed before touching storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostingPlan {
    /// Originating document.
    pub source: SourceRef,
    /// Journal entries, in posting order.
    pub entries: Vec<PlannedEntry>,
    /// Subledger rows, in append order.
    pub movements: Vec<SubledgerMovement>,
}

impl PostingPlan {
    /// Returns the entry for `leg`.
    #[must_use]
    pub fn entry(&self, leg: &str) -> Option<&JournalEntryInput> {
        self.entries.iter().find(|e| e.leg == leg).map(|e| &e.entry)
    }

    /// Distinct `(kind, subject)` pairs touched, sorted for lock ordering.
    #[must_use]
    pub fn lock_targets(&self) -> Vec<(SubledgerKind, Uuid)> {
        let mut targets: Vec<(SubledgerKind, Uuid)> = self
            .movements
            .iter()
            .map(|m| (m.kind, m.subject_id))
            .collect();
        targets.sort();
        targets.dedup();
        targets
    }
}
