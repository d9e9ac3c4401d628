//! Subledger repository: running-balance chains per account, client and supplier.
//!
//! The three chains share one row shape stored in `account_ledger`,
//! `client_ledger` and `supplier_ledger`. Appends to a chain are serialized
//! by locking the chain's row in `subledger_heads`, which also carries the
//! denormalized current balance.

use std::marker::PhantomData;

use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, FromQueryResult, Statement,
};
use serde::Serialize;
use tally_core::ledger::{LedgerError, SourceRef};
use tally_core::posting::MovementStatus;
use tally_core::subledger::{
    BalanceUpdate, ChainReport, ChainRow, Recalculation, Subject, SubledgerKind, check_tail,
    next_balance, recompute_tail, verify_chain,
};
use tally_shared::types::{AccountId, ClientId, SupplierId};
use tracing::{debug, info};
use uuid::Uuid;

use super::period::closed_through;
use crate::entities::chart_of_accounts;
use crate::error::map_db_err;
use crate::lock::WriteTransaction;

/// Table holding the rows of a chain kind.
#[must_use]
pub const fn table_name(kind: SubledgerKind) -> &'static str {
    match kind {
        SubledgerKind::Account => "account_ledger",
        SubledgerKind::Client => "client_ledger",
        SubledgerKind::Supplier => "supplier_ledger",
    }
}

/// Table holding the subjects of a chain kind.
#[must_use]
pub const fn registry_table(kind: SubledgerKind) -> &'static str {
    match kind {
        SubledgerKind::Account => "chart_of_accounts",
        SubledgerKind::Client => "clients",
        SubledgerKind::Supplier => "suppliers",
    }
}

const ROW_COLUMNS: &str = "id, subject_id, entry_date, description, reference_type, \
     reference_id, journal_entry_id, debit, credit, running_balance, status, created_at";

/// A stored subledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubledgerEntry {
    /// Insertion id.
    pub id: i64,
    /// Chain kind.
    pub kind: SubledgerKind,
    /// Account, client or supplier id.
    pub subject_id: Uuid,
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Narrative.
    pub description: String,
    /// Originating document type.
    pub reference_type: String,
    /// Originating document id.
    pub reference_id: Uuid,
    /// Journal entry posted with this row.
    pub journal_entry_id: Option<Uuid>,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Balance of the chain after this row.
    pub running_balance: Decimal,
    /// `pending` or `confirmed` for payment rows.
    pub status: Option<String>,
    /// Insertion time.
    pub created_at: DateTime<FixedOffset>,
}

impl SubledgerEntry {
    /// The fields taking part in balance arithmetic.
    #[must_use]
    pub fn chain_row(&self) -> ChainRow {
        ChainRow {
            id: self.id,
            entry_date: self.entry_date,
            debit: self.debit,
            credit: self.credit,
            running_balance: self.running_balance,
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct SubledgerRow {
    id: i64,
    subject_id: Uuid,
    entry_date: NaiveDate,
    description: String,
    reference_type: String,
    reference_id: Uuid,
    journal_entry_id: Option<Uuid>,
    debit: Decimal,
    credit: Decimal,
    running_balance: Decimal,
    status: Option<String>,
    created_at: DateTime<FixedOffset>,
}

impl SubledgerRow {
    fn into_entry(self, kind: SubledgerKind) -> SubledgerEntry {
        SubledgerEntry {
            id: self.id,
            kind,
            subject_id: self.subject_id,
            entry_date: self.entry_date,
            description: self.description,
            reference_type: self.reference_type,
            reference_id: self.reference_id,
            journal_entry_id: self.journal_entry_id,
            debit: self.debit,
            credit: self.credit,
            running_balance: self.running_balance,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct HeadState {
    current_balance: Decimal,
}

/// Input for one appended row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubledgerRow {
    /// Accounting date; may be earlier than existing rows.
    pub entry_date: NaiveDate,
    /// Narrative.
    pub description: String,
    /// Originating document.
    pub source: SourceRef,
    /// Journal entry posted in the same transaction, if any.
    pub journal_entry_id: Option<Uuid>,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Status for payment rows.
    pub status: Option<MovementStatus>,
}

/// Result of appending one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendOutcome {
    /// The inserted row.
    pub entry: SubledgerEntry,
    /// Head balance before the append.
    pub previous_head: Decimal,
    /// Head balance after the append (the chain's final value).
    pub head_balance: Decimal,
    /// Rows re-derived from the latest-dated row onward, by id.
    pub recalculation: Recalculation,
    /// True if the row is dated before the chain's latest-dated row.
    pub backdated: bool,
}

fn stmt(sql: &str, values: Vec<sea_orm::Value>) -> Statement {
    Statement::from_sql_and_values(DbBackend::Postgres, sql, values)
}

/// Checks that `subject_id` exists in the registry of `kind`. Account
/// chains also require an active cash or asset account.
async fn ensure_subject<C: ConnectionTrait>(
    conn: &C,
    kind: SubledgerKind,
    subject_id: Uuid,
) -> Result<(), LedgerError> {
    if kind == SubledgerKind::Account {
        let account = chart_of_accounts::Entity::find_by_id(subject_id)
            .one(conn)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| LedgerError::SubjectNotFound {
                kind: kind.to_string(),
                id: subject_id,
            })?;
        account.to_info()?.ensure_subledger_account()?;
        return Ok(());
    }

    let sql = format!("SELECT id FROM {} WHERE id = $1", registry_table(kind));
    let found = conn
        .query_one(stmt(&sql, vec![subject_id.into()]))
        .await
        .map_err(map_db_err)?;
    if found.is_none() {
        return Err(LedgerError::SubjectNotFound {
            kind: kind.to_string(),
            id: subject_id,
        });
    }
    Ok(())
}

/// Locks the head rows of `targets`, creating missing heads at zero.
///
/// Targets are locked in `(kind, subject)` order so that two writers
/// touching the same chains never wait on each other in a cycle.
pub(crate) async fn lock_heads<C: ConnectionTrait>(
    conn: &C,
    targets: &[(SubledgerKind, Uuid)],
) -> Result<(), LedgerError> {
    let mut ordered = targets.to_vec();
    ordered.sort();
    ordered.dedup();

    for (kind, subject_id) in ordered {
        ensure_subject(conn, kind, subject_id).await?;
        conn.execute(stmt(
            "INSERT INTO subledger_heads (kind, subject_id) VALUES ($1, $2) \
             ON CONFLICT (kind, subject_id) DO NOTHING",
            vec![kind.as_str().into(), subject_id.into()],
        ))
        .await
        .map_err(map_db_err)?;
        conn.query_one(stmt(
            "SELECT current_balance FROM subledger_heads \
             WHERE kind = $1 AND subject_id = $2 FOR UPDATE",
            vec![kind.as_str().into(), subject_id.into()],
        ))
        .await
        .map_err(map_db_err)?;
        debug!(kind = %kind, subject_id = %subject_id, "Locked subledger head");
    }
    Ok(())
}

async fn read_head<C: ConnectionTrait>(
    conn: &C,
    kind: SubledgerKind,
    subject_id: Uuid,
) -> Result<Option<HeadState>, LedgerError> {
    HeadState::find_by_statement(stmt(
        "SELECT current_balance FROM subledger_heads WHERE kind = $1 AND subject_id = $2",
        vec![kind.as_str().into(), subject_id.into()],
    ))
    .one(conn)
    .await
    .map_err(map_db_err)
}

/// Denormalized balance of a chain; zero if it has no head yet.
pub(crate) async fn head_balance<C: ConnectionTrait>(
    conn: &C,
    kind: SubledgerKind,
    subject_id: Uuid,
) -> Result<Decimal, LedgerError> {
    Ok(read_head(conn, kind, subject_id)
        .await?
        .map_or(Decimal::ZERO, |h| h.current_balance))
}

#[derive(Debug, FromQueryResult)]
struct Anchor {
    id: i64,
    entry_date: NaiveDate,
    running_balance: Decimal,
}

/// Latest row of a chain by `(entry_date DESC, id DESC)`.
async fn latest_dated<C: ConnectionTrait>(
    conn: &C,
    kind: SubledgerKind,
    subject_id: Uuid,
) -> Result<Option<Anchor>, LedgerError> {
    let sql = format!(
        "SELECT id, entry_date, running_balance FROM {} WHERE subject_id = $1 \
         ORDER BY entry_date DESC, id DESC LIMIT 1",
        table_name(kind)
    );
    Anchor::find_by_statement(stmt(&sql, vec![subject_id.into()]))
        .one(conn)
        .await
        .map_err(map_db_err)
}

/// Rows inserted after `id`, in id order.
async fn load_after<C: ConnectionTrait>(
    conn: &C,
    kind: SubledgerKind,
    subject_id: Uuid,
    id: i64,
) -> Result<Vec<ChainRow>, LedgerError> {
    let sql = format!(
        "SELECT {ROW_COLUMNS} FROM {} WHERE subject_id = $1 AND id > $2 ORDER BY id",
        table_name(kind)
    );
    let rows = SubledgerRow::find_by_statement(stmt(&sql, vec![subject_id.into(), id.into()]))
        .all(conn)
        .await
        .map_err(map_db_err)?;
    Ok(rows
        .into_iter()
        .map(|r| r.into_entry(kind).chain_row())
        .collect())
}

async fn apply_updates<C: ConnectionTrait>(
    conn: &C,
    kind: SubledgerKind,
    updates: &[BalanceUpdate],
) -> Result<(), LedgerError> {
    let sql = format!(
        "UPDATE {} SET running_balance = $1 WHERE id = $2",
        table_name(kind)
    );
    for update in updates {
        conn.execute(stmt(&sql, vec![update.new_balance.into(), update.id.into()]))
            .await
            .map_err(map_db_err)?;
    }
    Ok(())
}

/// Appends a row to a chain whose head is already locked by the caller.
///
/// The new row starts from the balance of the chain's latest row by
/// `(entry_date DESC, id DESC)`. Every row inserted after that row, the new
/// one included, is then re-derived in id order in the same transaction, so
/// the recurrence holds along insertion ids and the head is set to the
/// chain's final value.
pub(crate) async fn append_locked<C: ConnectionTrait>(
    conn: &C,
    kind: SubledgerKind,
    subject_id: Uuid,
    row: &NewSubledgerRow,
) -> Result<AppendOutcome, LedgerError> {
    if row.debit.is_sign_negative() || row.credit.is_sign_negative() {
        return Err(LedgerError::NegativeAmount);
    }
    if row.debit.is_zero() && row.credit.is_zero() {
        return Err(LedgerError::ZeroAmount);
    }
    tally_core::ledger::ensure_period_open(row.entry_date, closed_through(conn).await?)?;

    let head = read_head(conn, kind, subject_id).await?.ok_or_else(|| {
        LedgerError::Consistency(format!("{kind} {subject_id} appended without a locked head"))
    })?;

    let anchor = latest_dated(conn, kind, subject_id).await?;
    let backdated = anchor.as_ref().is_some_and(|a| row.entry_date < a.entry_date);
    let (anchor_id, previous) = anchor.map_or((0, Decimal::ZERO), |a| (a.id, a.running_balance));
    let running_balance = next_balance(kind, previous, row.debit, row.credit);

    let sql = format!(
        "INSERT INTO {} (subject_id, entry_date, description, reference_type, reference_id, \
         journal_entry_id, debit, credit, running_balance, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {ROW_COLUMNS}",
        table_name(kind)
    );
    let mut inserted = SubledgerRow::find_by_statement(stmt(
        &sql,
        vec![
            subject_id.into(),
            row.entry_date.into(),
            row.description.clone().into(),
            row.source.source_type.as_str().into(),
            row.source.source_id.into(),
            row.journal_entry_id.into(),
            row.debit.into(),
            row.credit.into(),
            running_balance.into(),
            row.status.map(|s| s.as_str().to_string()).into(),
        ],
    ))
    .one(conn)
    .await
    .map_err(map_db_err)?
    .ok_or_else(|| LedgerError::Database(format!("insert into {} returned no row", table_name(kind))))?
    .into_entry(kind);

    let tail = load_after(conn, kind, subject_id, anchor_id).await?;
    let recalculation = recompute_tail(kind, previous, &tail);
    apply_updates(conn, kind, &recalculation.updates).await?;
    if let Some(update) = recalculation.updates.iter().find(|u| u.id == inserted.id) {
        inserted.running_balance = update.new_balance;
    }

    let movement = kind.movement(row.debit, row.credit);
    check_tail(kind, head.current_balance, movement, recalculation.final_balance)?;

    conn.execute(stmt(
        "UPDATE subledger_heads SET current_balance = $1, entry_count = entry_count + 1, \
         last_entry_id = $2, updated_at = now() WHERE kind = $3 AND subject_id = $4",
        vec![
            recalculation.final_balance.into(),
            inserted.id.into(),
            kind.as_str().into(),
            subject_id.into(),
        ],
    ))
    .await
    .map_err(map_db_err)?;

    if recalculation.updates.is_empty() {
        debug!(
            kind = %kind,
            subject_id = %subject_id,
            row_id = inserted.id,
            running_balance = %inserted.running_balance,
            backdated,
            "Appended subledger row"
        );
    } else {
        info!(
            kind = %kind,
            subject_id = %subject_id,
            row_id = inserted.id,
            entry_date = %inserted.entry_date,
            rows_walked = recalculation.rows_walked,
            rows_updated = recalculation.updates.len(),
            head_balance = %recalculation.final_balance,
            backdated,
            "Re-derived running balances after out-of-order append"
        );
    }

    Ok(AppendOutcome {
        entry: inserted,
        previous_head: head.current_balance,
        head_balance: recalculation.final_balance,
        recalculation,
        backdated,
    })
}

/// All rows of a chain in id order.
async fn load_chain<C: ConnectionTrait>(
    conn: &C,
    kind: SubledgerKind,
    subject_id: Uuid,
) -> Result<Vec<ChainRow>, LedgerError> {
    load_after(conn, kind, subject_id, 0).await
}

/// Rows of a chain within an optional date range, date ascending then id.
pub(crate) async fn load_history<C: ConnectionTrait>(
    conn: &C,
    kind: SubledgerKind,
    subject_id: Uuid,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<SubledgerEntry>, LedgerError> {
    let sql = format!(
        "SELECT {ROW_COLUMNS} FROM {} WHERE subject_id = $1 \
         AND ($2::date IS NULL OR entry_date >= $2) \
         AND ($3::date IS NULL OR entry_date <= $3) \
         ORDER BY entry_date, id",
        table_name(kind)
    );
    let rows = SubledgerRow::find_by_statement(stmt(
        &sql,
        vec![subject_id.into(), from.into(), to.into()],
    ))
    .all(conn)
    .await
    .map_err(map_db_err)?;
    Ok(rows.into_iter().map(|r| r.into_entry(kind)).collect())
}

/// Every row of a kind dated on or before `as_of`, grouped by subject.
pub(crate) async fn load_kind_until<C: ConnectionTrait>(
    conn: &C,
    kind: SubledgerKind,
    as_of: NaiveDate,
) -> Result<Vec<(Uuid, Vec<ChainRow>)>, LedgerError> {
    let sql = format!(
        "SELECT {ROW_COLUMNS} FROM {} WHERE entry_date <= $1 \
         ORDER BY subject_id, entry_date, id",
        table_name(kind)
    );
    let rows = SubledgerRow::find_by_statement(stmt(&sql, vec![as_of.into()]))
        .all(conn)
        .await
        .map_err(map_db_err)?;

    let mut grouped: Vec<(Uuid, Vec<ChainRow>)> = Vec::new();
    for row in rows {
        let subject_id = row.subject_id;
        let chain_row = row.into_entry(kind).chain_row();
        match grouped.last_mut() {
            Some((last, chain)) if *last == subject_id => chain.push(chain_row),
            _ => grouped.push((subject_id, vec![chain_row])),
        }
    }
    Ok(grouped)
}

/// Replays a chain from zero and compares it with stored balances and head.
pub(crate) async fn verify<C: ConnectionTrait>(
    conn: &C,
    kind: SubledgerKind,
    subject_id: Uuid,
) -> Result<ChainReport, LedgerError> {
    let rows = load_chain(conn, kind, subject_id).await?;
    let head = read_head(conn, kind, subject_id)
        .await?
        .map(|h| h.current_balance);
    Ok(verify_chain(kind, &rows, head))
}

/// Re-derives every balance of a chain whose head the caller has locked.
pub(crate) async fn rebuild_locked<C: ConnectionTrait>(
    conn: &C,
    kind: SubledgerKind,
    subject_id: Uuid,
) -> Result<Recalculation, LedgerError> {
    let rows = load_chain(conn, kind, subject_id).await?;
    let recalculation = recompute_tail(kind, Decimal::ZERO, &rows);
    apply_updates(conn, kind, &recalculation.updates).await?;

    let entry_count = i64::try_from(rows.len())
        .map_err(|_| LedgerError::Consistency(format!("{kind} {subject_id} chain too long")))?;
    let last_entry_id = rows.iter().map(|r| r.id).max();
    conn.execute(stmt(
        "UPDATE subledger_heads SET current_balance = $1, entry_count = $2, \
         last_entry_id = $3, updated_at = now() WHERE kind = $4 AND subject_id = $5",
        vec![
            recalculation.final_balance.into(),
            entry_count.into(),
            last_entry_id.into(),
            kind.as_str().into(),
            subject_id.into(),
        ],
    ))
    .await
    .map_err(map_db_err)?;

    info!(
        kind = %kind,
        subject_id = %subject_id,
        rows_walked = recalculation.rows_walked,
        rows_updated = recalculation.updates.len(),
        head_balance = %recalculation.final_balance,
        "Rebuilt subledger chain"
    );
    Ok(recalculation)
}

/// Typed access to one subledger kind.
///
/// `S` fixes both the subject id type and the chain's sign convention.
#[derive(Debug, Clone)]
pub struct Subledger<S: Subject> {
    db: DatabaseConnection,
    lock_timeout_ms: u64,
    _subject: PhantomData<fn() -> S>,
}

/// Per cash/bank account chain.
pub type AccountLedger = Subledger<AccountId>;
/// Per client receivable chain.
pub type ClientLedger = Subledger<ClientId>;
/// Per supplier payable chain.
pub type SupplierLedger = Subledger<SupplierId>;

impl<S: Subject> Subledger<S> {
    /// Creates a subledger handle.
    #[must_use]
    pub const fn new(db: DatabaseConnection, lock_timeout_ms: u64) -> Self {
        Self {
            db,
            lock_timeout_ms,
            _subject: PhantomData,
        }
    }

    /// Kind served by this handle.
    #[must_use]
    pub const fn kind(&self) -> SubledgerKind {
        S::KIND
    }

    /// Appends one row in its own transaction, re-deriving the rows inserted
    /// after the chain's latest-dated row.
    ///
    /// # Errors
    ///
    /// Returns `SubjectNotFound`, `ZeroAmount`, `NegativeAmount`,
    /// `PeriodClosed`, `ConcurrencyConflict` or `Consistency`.
    pub async fn append(
        &self,
        subject: S,
        row: NewSubledgerRow,
    ) -> Result<AppendOutcome, LedgerError> {
        let write = WriteTransaction::begin(&self.db, self.lock_timeout_ms).await?;
        lock_heads(write.transaction(), &[(S::KIND, subject.uuid())]).await?;
        let outcome = append_locked(write.transaction(), S::KIND, subject.uuid(), &row).await?;
        write.commit().await?;
        Ok(outcome)
    }

    /// Current balance of the subject (zero if it has no rows).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn balance(&self, subject: S) -> Result<Decimal, LedgerError> {
        head_balance(&self.db, S::KIND, subject.uuid()).await
    }

    /// Rows of the subject's chain, optionally bounded by date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn history(
        &self,
        subject: S,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<SubledgerEntry>, LedgerError> {
        load_history(&self.db, S::KIND, subject.uuid(), from, to).await
    }

    /// Replays the chain and reports the first broken link.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn verify(&self, subject: S) -> Result<ChainReport, LedgerError> {
        verify(&self.db, S::KIND, subject.uuid()).await
    }

    /// Re-derives every stored balance of the chain under its lock.
    ///
    /// # Errors
    ///
    /// Returns `SubjectNotFound`, `ConcurrencyConflict` or a database error.
    pub async fn rebuild(&self, subject: S) -> Result<Recalculation, LedgerError> {
        let write = WriteTransaction::begin(&self.db, self.lock_timeout_ms).await?;
        lock_heads(write.transaction(), &[(S::KIND, subject.uuid())]).await?;
        let recalculation = rebuild_locked(write.transaction(), S::KIND, subject.uuid()).await?;
        write.commit().await?;
        Ok(recalculation)
    }
}
