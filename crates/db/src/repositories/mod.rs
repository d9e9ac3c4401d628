//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Every repository returns [`tally_core::ledger::LedgerError`].

pub mod account;
pub mod journal;
pub mod payment;
pub mod period;
pub mod posting;
pub mod report;
pub mod subject;
pub mod subledger;

pub use account::{AccountRepository, CreateAccountInput};
pub use journal::{JournalEntryWithLines, JournalRepository};
pub use payment::{ConfirmedPayment, PaymentFilter, PaymentRepository, RecordPaymentInput};
pub use period::PeriodRepository;
pub use posting::{PostedEntry, PostingOutcome, PostingRepository, SubledgerBalance};
pub use report::ReportRepository;
pub use subject::SubjectRepository;
pub use subledger::{
    AccountLedger, AppendOutcome, ClientLedger, NewSubledgerRow, Subledger, SubledgerEntry,
    SupplierLedger,
};
