//! Ledger error types.
//!
//! One taxonomy covers the whole engine: journal validation, subledger
//! chains, posting configuration, the payment workflow and persistence.
//! Callers branch on [`LedgerError::category`] rather than on variants.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tally_shared::AppError;
use tally_shared::types::MoneyError;
use thiserror::Error;
use uuid::Uuid;

/// Coarse classification used to decide who can fix an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller sent something invalid.
    InvalidInput,
    /// Accounts are missing or misconfigured; an administrator must act.
    Configuration,
    /// Lost a race for a lock; retrying the same request is safe.
    Transient,
    /// A referenced record does not exist.
    NotFound,
    /// The ledger or the database is in an unexpected state.
    Internal,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Generic input validation failure.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Journal entry has fewer than two lines.
    #[error("Journal entry must have at least 2 lines, got {lines}")]
    EmptyEntry {
        /// Number of lines supplied.
        lines: usize,
    },

    /// A line does not carry exactly one non-negative, nonzero side.
    #[error("Invalid journal line {line}: {reason}")]
    InvalidLine {
        /// 1-based line number.
        line: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// Debits and credits differ by more than the tolerance.
    #[error("Journal entry is not balanced. Debit: {debit}, Credit: {credit}")]
    ImbalancedEntry {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// Amount cannot be zero.
    #[error("Amount cannot be zero")]
    ZeroAmount,

    /// Amount cannot be negative.
    #[error("Amount cannot be negative")]
    NegativeAmount,

    /// Tax rate outside `[0, 1]`.
    #[error("Invalid tax rate: {0}")]
    InvalidTaxRate(Decimal),

    /// Posting date falls inside a closed period.
    #[error("Period is closed through {closed_through}, cannot post on {date}")]
    PeriodClosed {
        /// Requested posting date.
        date: NaiveDate,
        /// Last closed date.
        closed_through: NaiveDate,
    },

    /// State machine transition not allowed.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: String,
        /// Requested state.
        to: String,
    },

    // ========== Configuration Errors ==========
    /// A posting role has no account configured.
    #[error("No account configured for {0}")]
    MissingAccount(String),

    /// Account is inactive and cannot be posted to.
    #[error("Account {0} is inactive")]
    AccountInactive(Uuid),

    /// Account exists but has the wrong type for its role.
    #[error("Account {account_id} must be of type {expected}")]
    AccountTypeMismatch {
        /// The account ID.
        account_id: Uuid,
        /// Type expected for the role.
        expected: String,
    },

    // ========== Not Found ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// Subledger subject (client, supplier, account) not found.
    #[error("{kind} not found: {id}")]
    SubjectNotFound {
        /// Subledger kind.
        kind: String,
        /// Subject identifier.
        id: Uuid,
    },

    /// Journal entry not found.
    #[error("Journal entry not found: {0}")]
    EntryNotFound(Uuid),

    /// Payment not found.
    #[error("Payment not found: {0}")]
    PaymentNotFound(Uuid),

    // ========== Concurrency Errors ==========
    /// Lock timeout, deadlock or serialization failure.
    #[error("Concurrent modification detected, please retry: {0}")]
    ConcurrencyConflict(String),

    // ========== Internal Errors ==========
    /// Running balances disagree with the movements that produced them.
    #[error("Ledger consistency violation: {0}")]
    Consistency(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_)
            | Self::EmptyEntry { .. }
            | Self::InvalidLine { .. }
            | Self::ImbalancedEntry { .. }
            | Self::ZeroAmount
            | Self::NegativeAmount
            | Self::InvalidTaxRate(_)
            | Self::PeriodClosed { .. }
            | Self::InvalidTransition { .. } => ErrorCategory::InvalidInput,
            Self::MissingAccount(_)
            | Self::AccountInactive(_)
            | Self::AccountTypeMismatch { .. } => ErrorCategory::Configuration,
            Self::AccountNotFound(_)
            | Self::SubjectNotFound { .. }
            | Self::EntryNotFound(_)
            | Self::PaymentNotFound(_) => ErrorCategory::NotFound,
            Self::ConcurrencyConflict(_) => ErrorCategory::Transient,
            Self::Consistency(_) | Self::Database(_) => ErrorCategory::Internal,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::EmptyEntry { .. } => "EMPTY_ENTRY",
            Self::InvalidLine { .. } => "INVALID_LINE",
            Self::ImbalancedEntry { .. } => "IMBALANCED_ENTRY",
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::NegativeAmount => "NEGATIVE_AMOUNT",
            Self::InvalidTaxRate(_) => "INVALID_TAX_RATE",
            Self::PeriodClosed { .. } => "PERIOD_CLOSED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::MissingAccount(_) => "MISSING_ACCOUNT",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::AccountTypeMismatch { .. } => "ACCOUNT_TYPE_MISMATCH",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::SubjectNotFound { .. } => "SUBJECT_NOT_FOUND",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            Self::Consistency(_) => "CONSISTENCY_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self.category() {
            ErrorCategory::InvalidInput => match self {
                Self::PeriodClosed { .. } | Self::InvalidTransition { .. } => 422,
                _ => 400,
            },
            ErrorCategory::NotFound => 404,
            ErrorCategory::Transient => 409,
            ErrorCategory::Configuration | ErrorCategory::Internal => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Transient)
    }
}

impl From<MoneyError> for LedgerError {
    fn from(err: MoneyError) -> Self {
        match err {
            MoneyError::InvalidTaxRate(rate) => Self::InvalidTaxRate(rate),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err.category() {
            ErrorCategory::InvalidInput => match err {
                LedgerError::PeriodClosed { .. } | LedgerError::InvalidTransition { .. } => {
                    Self::BusinessRule(message)
                }
                _ => Self::Validation(message),
            },
            ErrorCategory::Configuration => Self::Configuration(message),
            ErrorCategory::Transient => Self::Conflict(message),
            ErrorCategory::NotFound => Self::NotFound(message),
            ErrorCategory::Internal => match err {
                LedgerError::Database(_) => Self::Database(message),
                _ => Self::Internal(message),
            },
        }
    }
}
