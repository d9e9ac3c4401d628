//! Account classification and sign conventions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::AccountId;

use super::error::LedgerError;

/// The side on which an account's balance grows.
///
/// - Debit-normal (assets, expenses): balance += debit - credit
/// - Credit-normal (liabilities, equity, revenue): balance += credit - debit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalBalance {
    /// Balance increases with debits.
    Debit,
    /// Balance increases with credits.
    Credit,
}

impl NormalBalance {
    /// Signed balance change produced by one debit/credit pair.
    #[must_use]
    pub fn signed_movement(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::Debit => debit - credit,
            Self::Credit => credit - debit,
        }
    }
}

/// Chart-of-accounts classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// General asset (inventory, tax receivable).
    Asset,
    /// Cash or bank account; carries an account subledger.
    Cash,
    /// Accounts receivable control account.
    Receivable,
    /// Accounts payable control account.
    Payable,
    /// Other liabilities (taxes payable, accruals).
    Liability,
    /// Owner's equity.
    Equity,
    /// Revenue.
    Revenue,
    /// Expense, including cost of goods sold.
    Expense,
    /// Asset contra account (accumulated depreciation).
    ContraAsset,
}

impl AccountType {
    /// Returns the normal balance side for this type.
    #[must_use]
    pub const fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Asset | Self::Cash | Self::Receivable | Self::Expense => NormalBalance::Debit,
            Self::Payable
            | Self::Liability
            | Self::Equity
            | Self::Revenue
            | Self::ContraAsset => NormalBalance::Credit,
        }
    }

    /// Returns the string representation stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Cash => "cash",
            Self::Receivable => "receivable",
            Self::Payable => "payable",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Revenue => "revenue",
            Self::Expense => "expense",
            Self::ContraAsset => "contra_asset",
        }
    }

    /// True for the types that may carry an account subledger. The account
    /// chain is debit-normal, so only cash and asset accounts qualify.
    #[must_use]
    pub const fn carries_subledger(self) -> bool {
        matches!(self, Self::Cash | Self::Asset)
    }

    /// Parses the database representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asset" => Some(Self::Asset),
            "cash" => Some(Self::Cash),
            "receivable" => Some(Self::Receivable),
            "payable" => Some(Self::Payable),
            "liability" => Some(Self::Liability),
            "equity" => Some(Self::Equity),
            "revenue" => Some(Self::Revenue),
            "expense" => Some(Self::Expense),
            "contra_asset" => Some(Self::ContraAsset),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parts of a chart-of-accounts row the engine needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Account ID.
    pub id: AccountId,
    /// Unique account code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Classification.
    pub account_type: AccountType,
    /// Inactive accounts reject postings.
    pub is_active: bool,
}

impl AccountInfo {
    /// Checks that the account can be moved through an account subledger.
    ///
    /// # Errors
    ///
    /// Returns `AccountInactive`, or `AccountTypeMismatch` for anything but a
    /// cash or asset account.
    pub fn ensure_subledger_account(&self) -> Result<AccountId, LedgerError> {
        if !self.is_active {
            return Err(LedgerError::AccountInactive(self.id.into_inner()));
        }
        if !self.account_type.carries_subledger() {
            return Err(LedgerError::AccountTypeMismatch {
                account_id: self.id.into_inner(),
                expected: "cash or asset".to_string(),
            });
        }
        Ok(self.id)
    }
}
