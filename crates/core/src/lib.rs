//! Core ledger logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `ledger` - Double-entry journal validation, account sign rules, period closing
//! - `subledger` - Running-balance chains for accounts, clients and suppliers
//! - `posting` - Planning journal entries and subledger rows for business events
//! - `payment` - Two-phase payment state machine
//! - `reports` - Aging of receivable and payable balances

pub mod ledger;
pub mod payment;
pub mod posting;
pub mod reports;
pub mod subledger;
