//! Running-balance subledgers.
//!
//! A subledger is a per-subject chain of rows where every row stores the
//! cumulative signed movement up to and including itself. Three kinds share
//! one implementation and differ only in their subject id and sign rule.

pub mod chain;
pub mod kind;

#[cfg(test)]
mod chain_props;

pub use chain::{
    BalanceUpdate, ChainBreak, ChainReport, ChainRow, Recalculation, dated_order, check_tail,
    next_balance, recompute_tail, verify_chain,
};
pub use kind::{Subject, SubledgerKind};
