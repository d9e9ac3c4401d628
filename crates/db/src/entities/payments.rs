//! `SeaORM` Entity for payments table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::ledger::LedgerError;
use tally_core::payment::{PaymentDirection, PaymentStatus, PendingPayment};
use tally_shared::types::{AccountId, PaymentId};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub direction: String,
    pub subject_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    pub payment_date: Date,
    pub method: String,
    pub account_id: Uuid,
    pub status: String,
    pub reference: String,
    pub journal_entry_id: Option<Uuid>,
    pub confirmed_at: Option<DateTimeWithTimeZone>,
    pub cancelled_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub cancel_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::chart_of_accounts::Entity",
        from = "Column::AccountId",
        to = "super::chart_of_accounts::Column::Id"
    )]
    ChartOfAccounts,
    #[sea_orm(
        belongs_to = "super::journal_entries::Entity",
        from = "Column::JournalEntryId",
        to = "super::journal_entries::Column::Id"
    )]
    JournalEntries,
}

impl Related<super::chart_of_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChartOfAccounts.def()
    }
}

impl Related<super::journal_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JournalEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Current workflow state.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the stored status is unknown.
    pub fn payment_status(&self) -> Result<PaymentStatus, LedgerError> {
        PaymentStatus::parse(&self.status).ok_or_else(|| {
            LedgerError::Database(format!("payment {} has unknown status {}", self.id, self.status))
        })
    }

    /// Converts the row into the workflow's view of a payment.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the stored direction or status is unknown.
    pub fn to_pending(&self) -> Result<PendingPayment, LedgerError> {
        let direction = PaymentDirection::parse(&self.direction).ok_or_else(|| {
            LedgerError::Database(format!(
                "payment {} has unknown direction {}",
                self.id, self.direction
            ))
        })?;
        Ok(PendingPayment {
            id: PaymentId::from_uuid(self.id),
            direction,
            subject_id: self.subject_id,
            cash_account: AccountId::from_uuid(self.account_id),
            amount: self.amount,
            payment_date: self.payment_date,
            reference: self.reference.clone(),
            status: self.payment_status()?,
        })
    }
}
