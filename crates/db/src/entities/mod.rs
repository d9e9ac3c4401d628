//! `SeaORM` entities for the ledger schema.
//!
//! The three subledger tables share one row shape and are read and written
//! through raw statements in [`crate::repositories::subledger`].

pub mod chart_of_accounts;
pub mod clients;
pub mod journal_entries;
pub mod journal_entry_lines;
pub mod payments;
pub mod period_closings;
pub mod subledger_heads;
pub mod suppliers;
