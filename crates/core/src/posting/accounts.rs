//! Posting roles and their resolved accounts.

use serde::{Deserialize, Serialize};
use tally_shared::config::AccountCodes;
use tally_shared::types::AccountId;

use crate::ledger::{AccountInfo, AccountType, LedgerError};

/// A role an account plays in automatic postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    /// Accounts Receivable control account.
    Receivable,
    /// Accounts Payable control account.
    Payable,
    /// Sales Revenue.
    SalesRevenue,
    /// Output tax collected on sales.
    SalesTaxPayable,
    /// Cost of Goods Sold.
    CostOfGoodsSold,
    /// Inventory.
    Inventory,
    /// Recoverable input tax.
    TaxControl,
    /// Accrued Expenses liability.
    AccruedExpenses,
    /// Depreciation Expense.
    DepreciationExpense,
    /// Accumulated Depreciation (contra-asset).
    AccumulatedDepreciation,
}

impl AccountRole {
    /// Human-readable role name used in error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Receivable => "accounts receivable",
            Self::Payable => "accounts payable",
            Self::SalesRevenue => "sales revenue",
            Self::SalesTaxPayable => "sales tax payable",
            Self::CostOfGoodsSold => "cost of goods sold",
            Self::Inventory => "inventory",
            Self::TaxControl => "tax control",
            Self::AccruedExpenses => "accrued expenses",
            Self::DepreciationExpense => "depreciation expense",
            Self::AccumulatedDepreciation => "accumulated depreciation",
        }
    }

    /// Account types acceptable for this role.
    #[must_use]
    pub const fn accepted_types(self) -> &'static [AccountType] {
        match self {
            Self::Receivable => &[AccountType::Receivable, AccountType::Asset],
            Self::Payable => &[AccountType::Payable, AccountType::Liability],
            Self::SalesRevenue => &[AccountType::Revenue],
            Self::SalesTaxPayable | Self::AccruedExpenses => &[AccountType::Liability],
            Self::CostOfGoodsSold | Self::DepreciationExpense => &[AccountType::Expense],
            Self::Inventory | Self::TaxControl => &[AccountType::Asset],
            Self::AccumulatedDepreciation => &[AccountType::ContraAsset],
        }
    }
}

impl std::fmt::Display for AccountRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Accounts used by the posting planner, resolved once at startup.
///
/// Receivable and payable are always present. The rest are optional until an
/// event actually needs them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingAccounts {
    /// Accounts Receivable.
    pub receivable: AccountId,
    /// Accounts Payable.
    pub payable: AccountId,
    /// Sales Revenue.
    pub sales_revenue: Option<AccountId>,
    /// Sales Tax Payable.
    pub sales_tax_payable: Option<AccountId>,
    /// Cost of Goods Sold.
    pub cost_of_goods_sold: Option<AccountId>,
    /// Inventory.
    pub inventory: Option<AccountId>,
    /// Input tax control.
    pub tax_control: Option<AccountId>,
    /// Accrued Expenses.
    pub accrued_expenses: Option<AccountId>,
    /// Depreciation Expense.
    pub depreciation_expense: Option<AccountId>,
    /// Accumulated Depreciation.
    pub accumulated_depreciation: Option<AccountId>,
}

impl PostingAccounts {
    /// Creates accounts with only the mandatory roles filled.
    #[must_use]
    pub const fn new(receivable: AccountId, payable: AccountId) -> Self {
        Self {
            receivable,
            payable,
            sales_revenue: None,
            sales_tax_payable: None,
            cost_of_goods_sold: None,
            inventory: None,
            tax_control: None,
            accrued_expenses: None,
            depreciation_expense: None,
            accumulated_depreciation: None,
        }
    }

    /// Returns the account for a role, if configured.
    #[must_use]
    pub const fn get(&self, role: AccountRole) -> Option<AccountId> {
        match role {
            AccountRole::Receivable => Some(self.receivable),
            AccountRole::Payable => Some(self.payable),
            AccountRole::SalesRevenue => self.sales_revenue,
            AccountRole::SalesTaxPayable => self.sales_tax_payable,
            AccountRole::CostOfGoodsSold => self.cost_of_goods_sold,
            AccountRole::Inventory => self.inventory,
            AccountRole::TaxControl => self.tax_control,
            AccountRole::AccruedExpenses => self.accrued_expenses,
            AccountRole::DepreciationExpense => self.depreciation_expense,
            AccountRole::AccumulatedDepreciation => self.accumulated_depreciation,
        }
    }

    /// Returns the account for a role or a configuration error.
    ///
    /// # Errors
    ///
    /// Returns `MissingAccount` if the role is not configured.
    pub fn require(&self, role: AccountRole) -> Result<AccountId, LedgerError> {
        self.get(role)
            .ok_or_else(|| LedgerError::MissingAccount(role.label().to_string()))
    }

    /// Resolves configured account codes through `lookup`.
    ///
    /// Receivable and payable must resolve to active accounts of a matching
    /// type. Optional roles whose code is unset or unknown stay `None`; a
    /// known code with the wrong type is still an error.
    ///
    /// # Errors
    ///
    /// Returns `MissingAccount`, `AccountInactive` or `AccountTypeMismatch`.
    pub fn resolve<F>(codes: &AccountCodes, lookup: F) -> Result<Self, LedgerError>
    where
        F: Fn(&str) -> Option<AccountInfo>,
    {
        let required = |role: AccountRole, code: &str| -> Result<AccountId, LedgerError> {
            let info =
                lookup(code).ok_or_else(|| LedgerError::MissingAccount(role.label().to_string()))?;
            check_role(role, &info)
        };
        let optional = |role: AccountRole, code: Option<&String>| -> Result<Option<AccountId>, LedgerError> {
            match code.and_then(|c| lookup(c.as_str())) {
                Some(info) => check_role(role, &info).map(Some),
                None => Ok(None),
            }
        };

        Ok(Self {
            receivable: required(AccountRole::Receivable, &codes.receivable)?,
            payable: required(AccountRole::Payable, &codes.payable)?,
            sales_revenue: optional(AccountRole::SalesRevenue, codes.sales_revenue.as_ref())?,
            sales_tax_payable: optional(
                AccountRole::SalesTaxPayable,
                codes.sales_tax_payable.as_ref(),
            )?,
            cost_of_goods_sold: optional(
                AccountRole::CostOfGoodsSold,
                codes.cost_of_goods_sold.as_ref(),
            )?,
            inventory: optional(AccountRole::Inventory, codes.inventory.as_ref())?,
            tax_control: optional(AccountRole::TaxControl, codes.tax_control.as_ref())?,
            accrued_expenses: optional(
                AccountRole::AccruedExpenses,
                codes.accrued_expenses.as_ref(),
            )?,
            depreciation_expense: optional(
                AccountRole::DepreciationExpense,
                codes.depreciation_expense.as_ref(),
            )?,
            accumulated_depreciation: optional(
                AccountRole::AccumulatedDepreciation,
                codes.accumulated_depreciation.as_ref(),
            )?,
        })
    }
}

fn check_role(role: AccountRole, info: &AccountInfo) -> Result<AccountId, LedgerError> {
    if !info.is_active {
        return Err(LedgerError::AccountInactive(info.id.into_inner()));
    }
    if !role.accepted_types().contains(&info.account_type) {
        return Err(LedgerError::AccountTypeMismatch {
            account_id: info.id.into_inner(),
            expected: role.label().to_string(),
        });
    }
    Ok(info.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart() -> Vec<AccountInfo> {
        [
            ("1200", AccountType::Receivable),
            ("2100", AccountType::Payable),
            ("4100", AccountType::Revenue),
            ("2200", AccountType::Liability),
            ("1300", AccountType::Expense),
        ]
        .into_iter()
        .map(|(code, account_type)| AccountInfo {
            id: AccountId::new(),
            code: code.to_string(),
            name: code.to_string(),
            account_type,
            is_active: true,
        })
        .collect()
    }

    #[test]
    fn test_resolve_with_optional_gaps() {
        let chart = chart();
        let mut codes = AccountCodes::default();
        codes.inventory = None;
        let accounts =
            PostingAccounts::resolve(&codes, |c| chart.iter().find(|a| a.code == c).cloned())
                .unwrap();
        assert_eq!(accounts.receivable, chart[0].id);
        assert_eq!(accounts.sales_revenue, Some(chart[2].id));
        assert_eq!(accounts.tax_control, None);
        assert!(matches!(
            accounts.require(AccountRole::CostOfGoodsSold),
            Err(LedgerError::MissingAccount(_))
        ));
    }

    #[test]
    fn test_missing_receivable_is_fatal() {
        let chart = chart();
        let codes = AccountCodes {
            receivable: "9999".to_string(),
            ..AccountCodes::default()
        };
        let err = PostingAccounts::resolve(&codes, |c| chart.iter().find(|a| a.code == c).cloned())
            .unwrap_err();
        assert!(matches!(err, LedgerError::MissingAccount(role) if role == "accounts receivable"));
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        // 1300 exists but is an expense account, not inventory.
        let chart = chart();
        let err = PostingAccounts::resolve(&AccountCodes::default(), |c| {
            chart.iter().find(|a| a.code == c).cloned()
        })
        .unwrap_err();
        assert!(matches!(err, LedgerError::AccountTypeMismatch { .. }));
    }
}
