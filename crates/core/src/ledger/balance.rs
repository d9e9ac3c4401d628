//! Account balance calculations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::AccountId;

use super::account::{AccountInfo, NormalBalance};

/// Account balance at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// The account ID.
    pub account_id: AccountId,
    /// Side on which the balance is positive.
    pub normal_balance: NormalBalance,
    /// Total debit amount.
    pub debit_total: Decimal,
    /// Total credit amount.
    pub credit_total: Decimal,
    /// Net balance, signed by `normal_balance`.
    pub balance: Decimal,
}

impl AccountBalance {
    /// Creates a zero balance.
    #[must_use]
    pub const fn new(account_id: AccountId, normal_balance: NormalBalance) -> Self {
        Self {
            account_id,
            normal_balance,
            debit_total: Decimal::ZERO,
            credit_total: Decimal::ZERO,
            balance: Decimal::ZERO,
        }
    }

    /// Creates a balance from aggregated totals.
    #[must_use]
    pub fn from_totals(
        account_id: AccountId,
        normal_balance: NormalBalance,
        debit_total: Decimal,
        credit_total: Decimal,
    ) -> Self {
        Self {
            account_id,
            normal_balance,
            debit_total,
            credit_total,
            balance: normal_balance.signed_movement(debit_total, credit_total),
        }
    }

    /// Adds one journal line.
    pub fn add_line(&mut self, debit: Decimal, credit: Decimal) {
        self.debit_total += debit;
        self.credit_total += credit;
        self.balance = self
            .normal_balance
            .signed_movement(self.debit_total, self.credit_total);
    }
}

/// One account in a trial balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    /// Account.
    pub account: AccountInfo,
    /// Totals and signed balance.
    pub balance: AccountBalance,
}

/// Debit and credit totals for every account with activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalance {
    /// Rows ordered by account code.
    pub rows: Vec<TrialBalanceRow>,
    /// Sum of all debit totals.
    pub total_debit: Decimal,
    /// Sum of all credit totals.
    pub total_credit: Decimal,
    /// True if the totals agree within tolerance.
    pub is_balanced: bool,
}

impl TrialBalance {
    /// Builds a trial balance from per-account rows.
    #[must_use]
    pub fn from_rows(mut rows: Vec<TrialBalanceRow>, tolerance: Decimal) -> Self {
        rows.sort_by(|a, b| a.account.code.cmp(&b.account.code));
        let total_debit: Decimal = rows.iter().map(|r| r.balance.debit_total).sum();
        let total_credit: Decimal = rows.iter().map(|r| r.balance.credit_total).sum();
        Self {
            rows,
            total_debit,
            total_credit,
            is_balanced: (total_debit - total_credit).abs() <= tolerance,
        }
    }
}
