//! Period closing repository.
//!
//! Closing the books through a date freezes every journal entry and
//! subledger row dated on or before it.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, DatabaseConnection, DbBackend,
    EntityTrait, QueryOrder, Statement,
};
use tally_core::ledger::{LedgerError, validate_new_closing};
use tracing::info;
use uuid::Uuid;

use crate::entities::period_closings;
use crate::error::map_db_err;
use crate::lock::WriteTransaction;

/// Latest closed date, if the books were ever closed.
pub(crate) async fn closed_through<C: ConnectionTrait>(
    conn: &C,
) -> Result<Option<NaiveDate>, LedgerError> {
    let latest = period_closings::Entity::find()
        .order_by_desc(period_closings::Column::ClosedThrough)
        .one(conn)
        .await
        .map_err(map_db_err)?;
    Ok(latest.map(|p| p.closed_through))
}

/// Period closing repository.
#[derive(Debug, Clone)]
pub struct PeriodRepository {
    db: DatabaseConnection,
    lock_timeout_ms: u64,
}

impl PeriodRepository {
    /// Creates a new period repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, lock_timeout_ms: u64) -> Self {
        Self {
            db,
            lock_timeout_ms,
        }
    }

    /// Latest closed date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn closed_through(&self) -> Result<Option<NaiveDate>, LedgerError> {
        closed_through(&self.db).await
    }

    /// Closes the books through `through`.
    ///
    /// The closing date only moves forward.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if `through` is not after the current closing
    /// date, or a database error.
    pub async fn close_period(
        &self,
        through: NaiveDate,
        note: Option<String>,
    ) -> Result<period_closings::Model, LedgerError> {
        let write = WriteTransaction::begin(&self.db, self.lock_timeout_ms).await?;
        let txn = write.transaction();

        // Serializes concurrent closings against each other.
        txn.execute(Statement::from_string(
            DbBackend::Postgres,
            "LOCK TABLE period_closings IN SHARE ROW EXCLUSIVE MODE",
        ))
        .await
        .map_err(map_db_err)?;

        validate_new_closing(through, closed_through(txn).await?)?;

        let closing = period_closings::ActiveModel {
            id: Set(Uuid::now_v7()),
            closed_through: Set(through),
            closed_at: Set(Utc::now().into()),
            note: Set(note),
        }
        .insert(txn)
        .await
        .map_err(map_db_err)?;

        write.commit().await?;
        info!(closed_through = %through, "Closed accounting period");
        Ok(closing)
    }
}
