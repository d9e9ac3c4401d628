//! Write transactions with a bounded lock wait.
//!
//! Every ledger write runs in a transaction that sets `lock_timeout` with
//! `SET LOCAL`, so a writer blocked on a subledger head gives up after the
//! configured wait instead of queueing forever.
//!
//! # Usage
//!
//! ```ignore
//! use tally_db::lock::WriteTransaction;
//!
//! let write = WriteTransaction::begin(&db, 5_000).await?;
//! post_something(write.transaction()).await?;
//! write.commit().await?;
//! ```

use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tally_core::ledger::LedgerError;

use crate::error::map_db_err;

/// A transaction whose lock waits are bounded.
///
/// Dropping it without calling [`commit`](Self::commit) rolls back.
pub struct WriteTransaction {
    txn: DatabaseTransaction,
}

impl WriteTransaction {
    /// Begins a transaction and sets its `lock_timeout`.
    ///
    /// A timeout of zero leaves the server default (wait forever).
    ///
    /// # Errors
    ///
    /// Returns `Database` if the transaction cannot be started.
    pub async fn begin(db: &DatabaseConnection, lock_timeout_ms: u64) -> Result<Self, LedgerError> {
        let txn = db.begin().await.map_err(map_db_err)?;
        set_lock_timeout(&txn, lock_timeout_ms).await?;
        Ok(Self { txn })
    }

    /// Returns the underlying transaction for executing statements.
    #[must_use]
    pub fn transaction(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub async fn commit(self) -> Result<(), LedgerError> {
        self.txn.commit().await.map_err(map_db_err)
    }
}

/// Statement that scopes `lock_timeout` to the current transaction.
#[must_use]
pub fn lock_timeout_sql(lock_timeout_ms: u64) -> String {
    format!("SET LOCAL lock_timeout = '{lock_timeout_ms}ms'")
}

/// Sets `lock_timeout` on an existing transaction.
///
/// # Errors
///
/// Returns an error if the setting cannot be applied.
pub async fn set_lock_timeout(
    txn: &DatabaseTransaction,
    lock_timeout_ms: u64,
) -> Result<(), LedgerError> {
    if lock_timeout_ms == 0 {
        return Ok(());
    }
    txn.execute_unprepared(&lock_timeout_sql(lock_timeout_ms))
        .await
        .map_err(map_db_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_timeout_sql_format() {
        assert_eq!(lock_timeout_sql(5_000), "SET LOCAL lock_timeout = '5000ms'");
        assert_eq!(lock_timeout_sql(250), "SET LOCAL lock_timeout = '250ms'");
    }
}
