//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger posting configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Posting rules shared by every ledger write.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Tax rate applied when an event does not carry its own (0.16 = 16%).
    #[serde(default = "default_tax_rate", with = "rust_decimal::serde::str")]
    pub default_tax_rate: Decimal,
    /// Maximum |debit - credit| accepted on a journal entry.
    #[serde(default = "default_tolerance", with = "rust_decimal::serde::str")]
    pub balance_tolerance: Decimal,
    /// Postgres `lock_timeout` for write transactions, in milliseconds.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Account codes for each posting role.
    #[serde(default)]
    pub accounts: AccountCodes,
}

fn default_tax_rate() -> Decimal {
    Decimal::new(16, 2)
}

fn default_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_tax_rate: default_tax_rate(),
            balance_tolerance: default_tolerance(),
            lock_timeout_ms: default_lock_timeout_ms(),
            accounts: AccountCodes::default(),
        }
    }
}

/// Chart-of-accounts codes used by the posting coordinator.
///
/// Receivable and payable are mandatory at startup; the others are only
/// checked when an event needs them.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountCodes {
    /// Accounts Receivable.
    pub receivable: String,
    /// Accounts Payable.
    pub payable: String,
    /// Sales Revenue.
    pub sales_revenue: Option<String>,
    /// Sales Tax Payable (output tax).
    pub sales_tax_payable: Option<String>,
    /// Cost of Goods Sold.
    pub cost_of_goods_sold: Option<String>,
    /// Inventory.
    pub inventory: Option<String>,
    /// Recoverable input tax on purchases and expenses.
    pub tax_control: Option<String>,
    /// Accrued Expenses, credited for deferred expenses.
    pub accrued_expenses: Option<String>,
    /// Depreciation Expense.
    pub depreciation_expense: Option<String>,
    /// Accumulated Depreciation.
    pub accumulated_depreciation: Option<String>,
}

impl Default for AccountCodes {
    fn default() -> Self {
        Self {
            receivable: "1200".to_string(),
            payable: "2100".to_string(),
            sales_revenue: Some("4100".to_string()),
            sales_tax_payable: Some("2200".to_string()),
            cost_of_goods_sold: Some("5100".to_string()),
            inventory: Some("1300".to_string()),
            tax_control: Some("1400".to_string()),
            accrued_expenses: Some("2300".to_string()),
            depreciation_expense: Some("5300".to_string()),
            accumulated_depreciation: Some("1590".to_string()),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "tally=debug,sea_orm=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Loads `.env` (if present) and then [`AppConfig::load`].
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        Self::load()
    }
}
