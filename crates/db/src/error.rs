//! Mapping from database errors to ledger errors.
//!
//! Postgres reports lock waits that hit `lock_timeout`, serialization
//! failures and deadlocks through SQLSTATE codes. Those become
//! `ConcurrencyConflict` so callers know a retry is safe. A unique violation
//! is only a conflict on the journal idempotency key; on any other
//! constraint it is invalid input. Everything else is an internal `Database`
//! error.

use sea_orm::{DbErr, RuntimeErr};
use sqlx::error::DatabaseError;
use tally_core::ledger::LedgerError;

/// `lock_not_available`, raised when `lock_timeout` expires.
pub const LOCK_NOT_AVAILABLE: &str = "55P03";
/// `serialization_failure`.
pub const SERIALIZATION_FAILURE: &str = "40001";
/// `deadlock_detected`.
pub const DEADLOCK_DETECTED: &str = "40P01";
/// `unique_violation`.
pub const UNIQUE_VIOLATION: &str = "23505";
/// Unique constraint on `journal_entries.idempotency_key`. Two writers racing
/// on the same key collide here; the loser's retry replays the winner's result.
pub const IDEMPOTENCY_CONSTRAINT: &str = "uq_journal_entries_idempotency_key";

fn database_error(err: &DbErr) -> Option<&(dyn DatabaseError + 'static)> {
    let runtime = match err {
        DbErr::Conn(e) | DbErr::Exec(e) | DbErr::Query(e) => e,
        _ => return None,
    };
    let RuntimeErr::SqlxError(sqlx_err) = runtime else {
        return None;
    };
    sqlx_err.as_database_error()
}

/// Extracts the Postgres SQLSTATE from a database error, if any.
#[must_use]
pub fn sqlstate(err: &DbErr) -> Option<String> {
    database_error(err)
        .and_then(|db_err| db_err.code())
        .map(std::borrow::Cow::into_owned)
}

/// Name of the constraint a database error reports, if any.
#[must_use]
pub fn constraint(err: &DbErr) -> Option<String> {
    database_error(err)
        .and_then(|db_err| db_err.constraint())
        .map(str::to_string)
}

/// Returns true if `code` on `constraint` marks a conflict that a retry can
/// resolve.
#[must_use]
pub fn is_conflict(code: &str, constraint: Option<&str>) -> bool {
    match code {
        LOCK_NOT_AVAILABLE | SERIALIZATION_FAILURE | DEADLOCK_DETECTED => true,
        UNIQUE_VIOLATION => constraint == Some(IDEMPOTENCY_CONSTRAINT),
        _ => false,
    }
}

/// Converts a `SeaORM` error into the ledger taxonomy.
#[must_use]
pub fn map_db_err(err: DbErr) -> LedgerError {
    let constraint = constraint(&err);
    match sqlstate(&err).as_deref() {
        Some(code) if is_conflict(code, constraint.as_deref()) => {
            tracing::warn!(sqlstate = %code, error = %err, "Concurrent write conflict");
            LedgerError::ConcurrencyConflict(err.to_string())
        }
        Some(UNIQUE_VIOLATION) => LedgerError::Validation(format!(
            "duplicate value violates {}",
            constraint.as_deref().unwrap_or("a unique constraint")
        )),
        _ => LedgerError::Database(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_codes() {
        assert!(is_conflict("55P03", None));
        assert!(is_conflict("40001", None));
        assert!(is_conflict("40P01", None));
        assert!(!is_conflict("23503", None));
        assert!(!is_conflict("42P01", None));
    }

    #[test]
    fn test_unique_violation_is_conflict_only_on_idempotency_key() {
        assert!(is_conflict("23505", Some(IDEMPOTENCY_CONSTRAINT)));
        assert!(!is_conflict("23505", Some("chart_of_accounts_account_code_key")));
        assert!(!is_conflict("23505", None));
    }

    #[test]
    fn test_non_sql_errors_are_internal() {
        let err = map_db_err(DbErr::RecordNotFound("journal_entries".to_string()));
        assert!(matches!(err, LedgerError::Database(_)));
        assert!(!err.is_retryable());

        let err = map_db_err(DbErr::Custom("boom".to_string()));
        assert!(matches!(err, LedgerError::Database(msg) if msg.contains("boom")));
    }

    #[test]
    fn test_internal_runtime_error_has_no_sqlstate() {
        let err = DbErr::Query(RuntimeErr::Internal("connection reset".to_string()));
        assert_eq!(sqlstate(&err), None);
    }

    #[test]
    fn test_sqlx_error_without_database_code() {
        let err = DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::RowNotFound));
        assert_eq!(sqlstate(&err), None);
        assert!(matches!(map_db_err(err), LedgerError::Database(_)));
    }
}
