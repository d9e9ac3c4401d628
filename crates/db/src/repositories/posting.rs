//! Posting repository: executes posting plans atomically.
//!
//! A [`PostingPlan`] computed by the planner is written in one transaction:
//! - lock the head of every touched chain, in `(kind, subject)` order
//! - replay the stored outcome if the plan's legs were already posted
//! - insert one journal entry per leg
//! - append the subledger rows, re-deriving out-of-order chains
//!
//! Any failure rolls back all of it.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use serde::Serialize;
use tally_core::ledger::{LedgerError, SourceRef};
use tally_core::posting::{
    CreditNoteIssued, CustomerPaymentConfirmed, DepreciationPosted, ExpensePosted,
    InvoiceConfirmed, PostingPlan, PostingPlanner, PurchaseReceived, SupplierPaymentConfirmed,
};
use tally_core::subledger::SubledgerKind;
use tally_shared::config::LedgerConfig;
use tracing::{info, instrument};
use uuid::Uuid;

use super::journal::{find_by_keys, insert_entry};
use super::subledger::{NewSubledgerRow, append_locked, head_balance, lock_heads};
use crate::lock::WriteTransaction;

/// One journal entry written for a plan leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostedEntry {
    /// Leg name.
    pub leg: String,
    /// Journal entry id.
    pub entry_id: Uuid,
    /// Sequential entry number.
    pub entry_number: String,
}

/// Balance of one chain after the posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubledgerBalance {
    /// Chain kind.
    pub kind: SubledgerKind,
    /// Subject id.
    pub subject_id: Uuid,
    /// Denormalized head balance.
    pub balance: Decimal,
}

/// What a posting wrote, or found already written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostingOutcome {
    /// Originating document.
    pub source: SourceRef,
    /// Journal entries in leg order.
    pub entries: Vec<PostedEntry>,
    /// Balances of every touched chain.
    pub balances: Vec<SubledgerBalance>,
    /// True if the event had already been posted and nothing was written.
    pub replayed: bool,
}

impl PostingOutcome {
    /// Journal entry id for `leg`.
    #[must_use]
    pub fn entry_id(&self, leg: &str) -> Option<Uuid> {
        self.entries.iter().find(|e| e.leg == leg).map(|e| e.entry_id)
    }

    /// Head balance of `(kind, subject_id)` after the posting.
    #[must_use]
    pub fn balance(&self, kind: SubledgerKind, subject_id: Uuid) -> Option<Decimal> {
        self.balances
            .iter()
            .find(|b| b.kind == kind && b.subject_id == subject_id)
            .map(|b| b.balance)
    }
}

/// Outcome for a plan whose legs are all stored already.
async fn replay<C: ConnectionTrait>(
    conn: &C,
    plan: &PostingPlan,
    found: &HashMap<String, (Uuid, String)>,
) -> Result<PostingOutcome, LedgerError> {
    let mut entries = Vec::with_capacity(plan.entries.len());
    for planned in &plan.entries {
        let key = planned.entry.idempotency_key.clone().unwrap_or_default();
        let (entry_id, entry_number) = found.get(&key).cloned().ok_or_else(|| {
            LedgerError::Consistency(format!("replayed leg {} has no stored entry", planned.leg))
        })?;
        entries.push(PostedEntry {
            leg: planned.leg.to_string(),
            entry_id,
            entry_number,
        });
    }

    let mut balances = Vec::new();
    for (kind, subject_id) in plan.lock_targets() {
        balances.push(SubledgerBalance {
            kind,
            subject_id,
            balance: head_balance(conn, kind, subject_id).await?,
        });
    }

    Ok(PostingOutcome {
        source: plan.source,
        entries,
        balances,
        replayed: true,
    })
}

/// Executes `plan` inside a transaction owned by the caller.
///
/// Used directly by the payment workflow so that the status change and the
/// ledger effects commit together.
pub(crate) async fn execute_plan<C: ConnectionTrait>(
    conn: &C,
    plan: &PostingPlan,
    tolerance: Decimal,
) -> Result<PostingOutcome, LedgerError> {
    let targets = plan.lock_targets();
    lock_heads(conn, &targets).await?;

    // Checked after locking so a concurrent duplicate sees the winner's rows.
    let keys: Vec<String> = plan
        .entries
        .iter()
        .filter_map(|e| e.entry.idempotency_key.clone())
        .collect();
    if !keys.is_empty() {
        let found: HashMap<String, (Uuid, String)> = find_by_keys(conn, keys.clone())
            .await?
            .into_iter()
            .filter_map(|e| e.idempotency_key.map(|k| (k, (e.id, e.entry_number))))
            .collect();
        if found.len() == keys.len() {
            info!(
                source_type = %plan.source.source_type,
                source_id = %plan.source.source_id,
                "Posting already recorded, replaying stored outcome"
            );
            return replay(conn, plan, &found).await;
        }
        if !found.is_empty() {
            return Err(LedgerError::Consistency(format!(
                "{} {} is partially posted ({} of {} legs)",
                plan.source.source_type,
                plan.source.source_id,
                found.len(),
                keys.len()
            )));
        }
    }

    let mut entries = Vec::with_capacity(plan.entries.len());
    let mut entry_ids: HashMap<&str, Uuid> = HashMap::new();
    for planned in &plan.entries {
        let stored = insert_entry(conn, &planned.entry, tolerance).await?;
        entry_ids.insert(planned.leg, stored.entry.id);
        entries.push(PostedEntry {
            leg: planned.leg.to_string(),
            entry_id: stored.entry.id,
            entry_number: stored.entry.entry_number,
        });
    }

    let mut heads: HashMap<(SubledgerKind, Uuid), Decimal> = HashMap::new();
    for movement in &plan.movements {
        let entry = plan.entry(movement.leg).ok_or_else(|| {
            LedgerError::Consistency(format!("movement references unknown leg {}", movement.leg))
        })?;
        let row = NewSubledgerRow {
            entry_date: entry.entry_date,
            description: movement.description.clone(),
            source: plan.source,
            journal_entry_id: entry_ids.get(movement.leg).copied(),
            debit: movement.debit,
            credit: movement.credit,
            status: movement.status,
        };
        let outcome = append_locked(conn, movement.kind, movement.subject_id, &row).await?;
        heads.insert((movement.kind, movement.subject_id), outcome.head_balance);
    }

    let balances = targets
        .into_iter()
        .map(|(kind, subject_id)| SubledgerBalance {
            kind,
            subject_id,
            balance: heads.get(&(kind, subject_id)).copied().unwrap_or_default(),
        })
        .collect();

    Ok(PostingOutcome {
        source: plan.source,
        entries,
        balances,
        replayed: false,
    })
}

/// Posting repository: one operation per business event.
#[derive(Debug, Clone)]
pub struct PostingRepository {
    db: DatabaseConnection,
    planner: PostingPlanner,
    tolerance: Decimal,
    lock_timeout_ms: u64,
}

impl PostingRepository {
    /// Creates a new posting repository.
    #[must_use]
    pub fn new(db: DatabaseConnection, planner: PostingPlanner, config: &LedgerConfig) -> Self {
        Self {
            db,
            planner,
            tolerance: config.balance_tolerance,
            lock_timeout_ms: config.lock_timeout_ms,
        }
    }

    /// The planner used to compute postings.
    #[must_use]
    pub const fn planner(&self) -> &PostingPlanner {
        &self.planner
    }

    /// Executes a plan in its own write transaction.
    ///
    /// # Errors
    ///
    /// Returns any validation, configuration, concurrency or consistency
    /// error; nothing is written in that case.
    #[instrument(
        skip(self, plan),
        fields(source_type = %plan.source.source_type, source_id = %plan.source.source_id)
    )]
    pub async fn execute(&self, plan: PostingPlan) -> Result<PostingOutcome, LedgerError> {
        let write = WriteTransaction::begin(&self.db, self.lock_timeout_ms).await?;
        let outcome = execute_plan(write.transaction(), &plan, self.tolerance).await?;
        write.commit().await?;

        if !outcome.replayed {
            info!(
                entries = outcome.entries.len(),
                chains = outcome.balances.len(),
                "Posted business event"
            );
        }
        Ok(outcome)
    }

    /// Posts a confirmed invoice: sale leg, cost leg, client debit.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn post_invoice(
        &self,
        event: &InvoiceConfirmed,
    ) -> Result<PostingOutcome, LedgerError> {
        self.execute(self.planner.invoice(event)?).await
    }

    /// Posts a credit note: reversed sale leg, optional restock, client credit.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn post_credit_note(
        &self,
        event: &CreditNoteIssued,
    ) -> Result<PostingOutcome, LedgerError> {
        self.execute(self.planner.credit_note(event)?).await
    }

    /// Posts a customer receipt directly, without the pending workflow.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn post_customer_payment(
        &self,
        event: &CustomerPaymentConfirmed,
    ) -> Result<PostingOutcome, LedgerError> {
        self.execute(self.planner.customer_payment(event)?).await
    }

    /// Posts a supplier payment directly, without the pending workflow.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn post_supplier_payment(
        &self,
        event: &SupplierPaymentConfirmed,
    ) -> Result<PostingOutcome, LedgerError> {
        self.execute(self.planner.supplier_payment(event)?).await
    }

    /// Posts an expense voucher.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn post_expense(&self, event: &ExpensePosted) -> Result<PostingOutcome, LedgerError> {
        self.execute(self.planner.expense(event)?).await
    }

    /// Posts a depreciation run.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn post_depreciation(
        &self,
        event: &DepreciationPosted,
    ) -> Result<PostingOutcome, LedgerError> {
        self.execute(self.planner.depreciation(event)?).await
    }

    /// Posts goods received from a supplier.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn post_purchase_receipt(
        &self,
        event: &PurchaseReceived,
    ) -> Result<PostingOutcome, LedgerError> {
        self.execute(self.planner.purchase_receipt(event)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tally_core::ledger::SourceType;

    #[test]
    fn test_outcome_lookups() {
        let client = Uuid::now_v7();
        let entry_id = Uuid::now_v7();
        let outcome = PostingOutcome {
            source: SourceRef::new(SourceType::Invoice, Uuid::now_v7()),
            entries: vec![PostedEntry {
                leg: "sale".to_string(),
                entry_id,
                entry_number: "JE-000001".to_string(),
            }],
            balances: vec![SubledgerBalance {
                kind: SubledgerKind::Client,
                subject_id: client,
                balance: dec!(1160.00),
            }],
            replayed: false,
        };
        assert_eq!(outcome.entry_id("sale"), Some(entry_id));
        assert_eq!(outcome.entry_id("cost"), None);
        assert_eq!(outcome.balance(SubledgerKind::Client, client), Some(dec!(1160.00)));
        assert_eq!(outcome.balance(SubledgerKind::Supplier, client), None);
    }
}
