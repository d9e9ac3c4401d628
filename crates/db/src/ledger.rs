//! Wiring of all repositories from configuration.

use sea_orm::DatabaseConnection;
use tally_core::ledger::LedgerError;
use tally_core::posting::PostingPlanner;
use tally_shared::config::LedgerConfig;
use tally_shared::types::TaxRate;

use crate::repositories::{
    AccountLedger, AccountRepository, ClientLedger, JournalRepository, PaymentRepository,
    PeriodRepository, PostingRepository, ReportRepository, SubjectRepository, SupplierLedger,
};

/// Every ledger repository sharing one pool and one configuration.
#[derive(Debug, Clone)]
pub struct Ledger {
    /// Chart of accounts.
    pub accounts: AccountRepository,
    /// Clients and suppliers.
    pub subjects: SubjectRepository,
    /// Journal entries.
    pub journal: JournalRepository,
    /// Business event postings.
    pub posting: PostingRepository,
    /// Pending payment workflow.
    pub payments: PaymentRepository,
    /// Period closing.
    pub periods: PeriodRepository,
    /// Read API.
    pub reports: ReportRepository,
    /// Per-account chains.
    pub account_ledger: AccountLedger,
    /// Per-client chains.
    pub client_ledger: ClientLedger,
    /// Per-supplier chains.
    pub supplier_ledger: SupplierLedger,
}

impl Ledger {
    /// Resolves the posting accounts and builds every repository.
    ///
    /// # Errors
    ///
    /// Returns `MissingAccount`, `AccountInactive` or `AccountTypeMismatch`
    /// if the configured receivable or payable account is unusable, and
    /// `InvalidTaxRate` for a default rate outside `[0, 1]`.
    pub async fn open(db: DatabaseConnection, config: &LedgerConfig) -> Result<Self, LedgerError> {
        let accounts = AccountRepository::new(db.clone());
        let posting_accounts = accounts.resolve_posting_accounts(&config.accounts).await?;
        let planner = PostingPlanner::new(posting_accounts, TaxRate::new(config.default_tax_rate)?);

        Ok(Self {
            accounts,
            subjects: SubjectRepository::new(db.clone()),
            journal: JournalRepository::new(db.clone(), config.balance_tolerance),
            posting: PostingRepository::new(db.clone(), planner.clone(), config),
            payments: PaymentRepository::new(db.clone(), planner, config),
            periods: PeriodRepository::new(db.clone(), config.lock_timeout_ms),
            reports: ReportRepository::new(db.clone(), config.balance_tolerance),
            account_ledger: AccountLedger::new(db.clone(), config.lock_timeout_ms),
            client_ledger: ClientLedger::new(db.clone(), config.lock_timeout_ms),
            supplier_ledger: SupplierLedger::new(db, config.lock_timeout_ms),
        })
    }
}
