//! Journal repository: balanced journal entries and their lines.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::Serialize;
use tally_core::ledger::{
    AccountInfo, JournalEntryInput, LedgerError, check_accounts, ensure_period_open,
    validate_entry,
};
use tally_shared::types::{AccountId, JournalEntryId};
use tracing::info;
use uuid::Uuid;

use super::period::closed_through;
use crate::entities::{chart_of_accounts, journal_entries, journal_entry_lines};
use crate::error::map_db_err;

/// Status stored on every entry written by the engine.
pub const POSTED: &str = "posted";

/// A journal entry with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalEntryWithLines {
    /// The entry header.
    pub entry: journal_entries::Model,
    /// Lines ordered by line number.
    pub lines: Vec<journal_entry_lines::Model>,
}

impl JournalEntryWithLines {
    /// Typed id of the entry.
    #[must_use]
    pub fn id(&self) -> JournalEntryId {
        JournalEntryId::from_uuid(self.entry.id)
    }
}

/// Loads the accounts referenced by `account_ids`.
async fn load_accounts<C: ConnectionTrait>(
    conn: &C,
    account_ids: Vec<Uuid>,
) -> Result<HashMap<AccountId, AccountInfo>, LedgerError> {
    let models = chart_of_accounts::Entity::find()
        .filter(chart_of_accounts::Column::Id.is_in(account_ids))
        .all(conn)
        .await
        .map_err(map_db_err)?;
    models
        .iter()
        .map(|m| m.to_info().map(|info| (info.id, info)))
        .collect()
}

/// Validates and inserts one entry with its lines.
///
/// The caller owns the transaction; nothing here touches subledgers.
pub(crate) async fn insert_entry<C: ConnectionTrait>(
    conn: &C,
    input: &JournalEntryInput,
    tolerance: Decimal,
) -> Result<JournalEntryWithLines, LedgerError> {
    let totals = validate_entry(input, tolerance)?;
    ensure_period_open(input.entry_date, closed_through(conn).await?)?;

    let account_ids = input.lines.iter().map(|l| l.account_id.into_inner()).collect();
    let accounts = load_accounts(conn, account_ids).await?;
    check_accounts(&input.lines, |id| accounts.get(&id).cloned())?;

    let now = Utc::now().into();
    let entry_id = Uuid::now_v7();
    let entry = journal_entries::ActiveModel {
        id: Set(entry_id),
        entry_number: NotSet,
        entry_date: Set(input.entry_date),
        reference: Set(input.reference.clone()),
        description: Set(input.description.clone()),
        reference_type: Set(input.source.map(|s| s.source_type.as_str().to_string())),
        reference_id: Set(input.source.map(|s| s.source_id)),
        idempotency_key: Set(input.idempotency_key.clone()),
        total_debit: Set(totals.debit),
        total_credit: Set(totals.credit),
        status: Set(POSTED.to_string()),
        created_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(map_db_err)?;

    let mut lines = Vec::with_capacity(input.lines.len());
    for (idx, line) in input.lines.iter().enumerate() {
        let line_number = i32::try_from(idx + 1)
            .map_err(|_| LedgerError::Validation("too many journal lines".to_string()))?;
        let inserted = journal_entry_lines::ActiveModel {
            id: Set(Uuid::now_v7()),
            journal_entry_id: Set(entry_id),
            line_number: Set(line_number),
            account_id: Set(line.account_id.into_inner()),
            debit_amount: Set(line.debit),
            credit_amount: Set(line.credit),
            description: Set(line.description.clone()),
        }
        .insert(conn)
        .await
        .map_err(map_db_err)?;
        lines.push(inserted);
    }

    info!(
        entry_id = %entry.id,
        entry_number = %entry.entry_number,
        entry_date = %entry.entry_date,
        total = %totals.debit,
        lines = lines.len(),
        "Posted journal entry"
    );

    Ok(JournalEntryWithLines { entry, lines })
}

async fn load_lines<C: ConnectionTrait>(
    conn: &C,
    entry_id: Uuid,
) -> Result<Vec<journal_entry_lines::Model>, LedgerError> {
    journal_entry_lines::Entity::find()
        .filter(journal_entry_lines::Column::JournalEntryId.eq(entry_id))
        .order_by_asc(journal_entry_lines::Column::LineNumber)
        .all(conn)
        .await
        .map_err(map_db_err)
}

/// Finds the entries carrying any of `keys`.
pub(crate) async fn find_by_keys<C: ConnectionTrait>(
    conn: &C,
    keys: Vec<String>,
) -> Result<Vec<journal_entries::Model>, LedgerError> {
    journal_entries::Entity::find()
        .filter(journal_entries::Column::IdempotencyKey.is_in(keys))
        .all(conn)
        .await
        .map_err(map_db_err)
}

/// Journal repository for posting and reading entries.
#[derive(Debug, Clone)]
pub struct JournalRepository {
    db: DatabaseConnection,
    tolerance: Decimal,
}

impl JournalRepository {
    /// Creates a new journal repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, tolerance: Decimal) -> Self {
        Self { db, tolerance }
    }

    /// Posts a balanced entry. Header and lines are written atomically; no
    /// subledger is touched.
    ///
    /// # Errors
    ///
    /// Returns `EmptyEntry`, `InvalidLine`, `ImbalancedEntry`,
    /// `AccountNotFound`, `AccountInactive`, `PeriodClosed` or a database
    /// error.
    pub async fn post_entry(
        &self,
        input: JournalEntryInput,
    ) -> Result<JournalEntryWithLines, LedgerError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let entry = insert_entry(&txn, &input, self.tolerance).await?;
        txn.commit().await.map_err(map_db_err)?;
        Ok(entry)
    }

    /// Gets an entry with its lines.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` if absent.
    pub async fn get_entry(&self, id: JournalEntryId) -> Result<JournalEntryWithLines, LedgerError> {
        let entry = journal_entries::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::EntryNotFound(id.into_inner()))?;
        let lines = load_lines(&self.db, entry.id).await?;
        Ok(JournalEntryWithLines { entry, lines })
    }

    /// Finds the entry posted under an idempotency key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<JournalEntryWithLines>, LedgerError> {
        let Some(entry) = journal_entries::Entity::find()
            .filter(journal_entries::Column::IdempotencyKey.eq(key))
            .one(&self.db)
            .await
            .map_err(map_db_err)?
        else {
            return Ok(None);
        };
        let lines = load_lines(&self.db, entry.id).await?;
        Ok(Some(JournalEntryWithLines { entry, lines }))
    }

    /// Entries posted for a business document, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn entries_for_reference(
        &self,
        reference_type: &str,
        reference_id: Uuid,
    ) -> Result<Vec<journal_entries::Model>, LedgerError> {
        journal_entries::Entity::find()
            .filter(journal_entries::Column::ReferenceType.eq(reference_type))
            .filter(journal_entries::Column::ReferenceId.eq(reference_id))
            .order_by_asc(journal_entries::Column::CreatedAt)
            .order_by_asc(journal_entries::Column::EntryNumber)
            .all(&self.db)
            .await
            .map_err(map_db_err)
    }
}
