//! Account repository for chart of accounts lookups.
//!
//! The engine never mutates the chart during postings. Accounts are created
//! by the seeder and by tests; the posting coordinator only reads them,
//! resolving configured codes into [`PostingAccounts`] once at startup.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use tally_core::ledger::{AccountInfo, AccountType, LedgerError};
use tally_core::posting::PostingAccounts;
use tally_shared::config::AccountCodes;
use tally_shared::types::AccountId;
use tracing::info;

use crate::entities::chart_of_accounts;
use crate::error::map_db_err;

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Unique account code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Classification.
    pub account_type: AccountType,
    /// Optional parent in the chart hierarchy.
    pub parent_id: Option<AccountId>,
}

impl CreateAccountInput {
    /// Creates input for a top-level account.
    #[must_use]
    pub fn new(code: impl Into<String>, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            account_type,
            parent_id: None,
        }
    }
}

/// Account repository.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an account.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the code is already used.
    pub async fn create_account(
        &self,
        input: CreateAccountInput,
    ) -> Result<AccountInfo, LedgerError> {
        if self.find_by_code(&input.code).await?.is_some() {
            return Err(LedgerError::Validation(format!(
                "account code '{}' already exists",
                input.code
            )));
        }

        let model = chart_of_accounts::ActiveModel {
            id: Set(AccountId::new().into_inner()),
            account_code: Set(input.code),
            account_name: Set(input.name),
            account_type: Set(input.account_type.as_str().to_string()),
            parent_account_id: Set(input.parent_id.map(AccountId::into_inner)),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await
        .map_err(map_db_err)?;

        info!(code = %model.account_code, account_type = %model.account_type, "Created account");
        model.to_info()
    }

    /// Finds an account by id.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if absent.
    pub async fn find_by_id(&self, id: AccountId) -> Result<AccountInfo, LedgerError> {
        chart_of_accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::AccountNotFound(id.into_inner()))?
            .to_info()
    }

    /// Finds an account by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<AccountInfo>, LedgerError> {
        chart_of_accounts::Entity::find()
            .filter(chart_of_accounts::Column::AccountCode.eq(code))
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .map(|m| m.to_info())
            .transpose()
    }

    /// Lists all accounts ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_accounts(&self) -> Result<Vec<AccountInfo>, LedgerError> {
        chart_of_accounts::Entity::find()
            .order_by_asc(chart_of_accounts::Column::AccountCode)
            .all(&self.db)
            .await
            .map_err(map_db_err)?
            .iter()
            .map(chart_of_accounts::Model::to_info)
            .collect()
    }

    /// Activates or deactivates an account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if absent.
    pub async fn set_active(&self, id: AccountId, is_active: bool) -> Result<(), LedgerError> {
        let model = chart_of_accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::AccountNotFound(id.into_inner()))?;
        let mut active: chart_of_accounts::ActiveModel = model.into();
        active.is_active = Set(is_active);
        active.update(&self.db).await.map_err(map_db_err)?;
        Ok(())
    }

    /// Resolves the configured posting-role codes against the chart.
    ///
    /// Receivable and payable must exist; other roles stay unset until an
    /// event needs them.
    ///
    /// # Errors
    ///
    /// Returns `MissingAccount`, `AccountInactive` or `AccountTypeMismatch`.
    pub async fn resolve_posting_accounts(
        &self,
        codes: &AccountCodes,
    ) -> Result<PostingAccounts, LedgerError> {
        let by_code: HashMap<String, AccountInfo> = self
            .list_accounts()
            .await?
            .into_iter()
            .map(|info| (info.code.clone(), info))
            .collect();
        let accounts = PostingAccounts::resolve(codes, |code| by_code.get(code).cloned())?;
        info!(
            receivable = %accounts.receivable,
            payable = %accounts.payable,
            "Resolved posting accounts"
        );
        Ok(accounts)
    }
}
