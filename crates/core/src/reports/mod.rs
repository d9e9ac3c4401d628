//! Read-side projections over the journal and subledgers.
//!
//! - Receivable/payable aging by FIFO open-item matching

pub mod service;
pub mod types;

pub use service::ReportService;
pub use types::*;
