//! Double-entry bookkeeping logic.
//!
//! - Account classification and normal-balance sign rules
//! - Journal entry inputs and validation
//! - Period closing rules
//! - Balance and trial balance aggregation
//! - The error taxonomy shared by the whole engine

pub mod account;
pub mod balance;
pub mod error;
pub mod journal;
pub mod period;

#[cfg(test)]
mod journal_props;

pub use account::{AccountInfo, AccountType, NormalBalance};
pub use balance::{AccountBalance, TrialBalance, TrialBalanceRow};
pub use error::{ErrorCategory, LedgerError};
pub use journal::{
    EntryTotals, JournalEntryInput, JournalLineInput, MIN_LINES, SourceRef, SourceType,
    check_accounts, validate_entry,
};
pub use period::{ensure_period_open, validate_new_closing};
