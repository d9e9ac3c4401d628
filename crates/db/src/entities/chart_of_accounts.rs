//! `SeaORM` Entity for chart_of_accounts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::ledger::{AccountInfo, AccountType, LedgerError};
use tally_shared::types::AccountId;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "chart_of_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub account_code: String,
    pub account_name: String,
    pub account_type: String,
    pub parent_account_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentAccountId",
        to = "Column::Id"
    )]
    Parent,
    #[sea_orm(has_many = "super::journal_entry_lines::Entity")]
    JournalEntryLines,
}

impl Related<super::journal_entry_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JournalEntryLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Converts the row into the classification used by posting rules.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the stored account type is unknown.
    pub fn to_info(&self) -> Result<AccountInfo, LedgerError> {
        let account_type = AccountType::parse(&self.account_type).ok_or_else(|| {
            LedgerError::Database(format!(
                "account {} has unknown type {}",
                self.account_code, self.account_type
            ))
        })?;
        Ok(AccountInfo {
            id: AccountId::from_uuid(self.id),
            code: self.account_code.clone(),
            name: self.account_name.clone(),
            account_type,
            is_active: self.is_active,
        })
    }
}
