//! Payment repository: the pending payment workflow.
//!
//! A payment is recorded `in_pay` with no ledger effect. Confirming it posts
//! the cash and client/supplier legs and flips the status in the same
//! transaction; cancelling only flips the status.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::Serialize;
use tally_core::ledger::LedgerError;
use tally_core::payment::{PaymentAction, PaymentDirection, PaymentStatus, PaymentWorkflow};
use tally_core::posting::{PostingPlanner, legs};
use tally_core::subledger::SubledgerKind;
use tally_shared::config::LedgerConfig;
use tally_shared::types::{AccountId, PaymentId};
use tracing::{info, instrument};
use uuid::Uuid;

use super::posting::{PostingOutcome, execute_plan};
use crate::entities::{chart_of_accounts, clients, payments, suppliers};
use crate::error::map_db_err;
use crate::lock::WriteTransaction;

/// Input for recording a payment.
#[derive(Debug, Clone)]
pub struct RecordPaymentInput {
    /// Receipt from a client or disbursement to a supplier.
    pub direction: PaymentDirection,
    /// Client id for receipts, supplier id for disbursements.
    pub subject_id: Uuid,
    /// Cash or bank account.
    pub cash_account: AccountId,
    /// Amount, strictly positive.
    pub amount: Decimal,
    /// Accounting date.
    pub payment_date: NaiveDate,
    /// Payment method (cash, transfer, card...).
    pub method: String,
    /// Receipt or transfer reference.
    pub reference: String,
}

/// A confirmed payment and what its confirmation posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmedPayment {
    /// The payment after the transition.
    pub payment: payments::Model,
    /// Journal entry and subledger balances.
    pub posting: PostingOutcome,
}

/// Filter for listing payments.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentFilter {
    /// Only payments in this state.
    pub status: Option<PaymentStatus>,
    /// Only receipts or only disbursements.
    pub direction: Option<PaymentDirection>,
}

/// Payment repository.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    db: DatabaseConnection,
    planner: PostingPlanner,
    tolerance: Decimal,
    lock_timeout_ms: u64,
}

impl PaymentRepository {
    /// Creates a new payment repository.
    #[must_use]
    pub fn new(db: DatabaseConnection, planner: PostingPlanner, config: &LedgerConfig) -> Self {
        Self {
            db,
            planner,
            tolerance: config.balance_tolerance,
            lock_timeout_ms: config.lock_timeout_ms,
        }
    }

    /// Records a payment as `in_pay`. No journal entry or subledger row is
    /// written.
    ///
    /// # Errors
    ///
    /// Returns `ZeroAmount`, `NegativeAmount`, `SubjectNotFound`,
    /// `AccountNotFound`, `AccountInactive`, `AccountTypeMismatch` for a cash
    /// account that is not cash or asset, or a database error.
    pub async fn record(&self, input: RecordPaymentInput) -> Result<payments::Model, LedgerError> {
        let status = PaymentWorkflow::record(input.amount)?;
        self.ensure_subject(input.direction, input.subject_id).await?;
        chart_of_accounts::Entity::find_by_id(input.cash_account.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::AccountNotFound(input.cash_account.into_inner()))?
            .to_info()?
            .ensure_subledger_account()?;

        let payment = payments::ActiveModel {
            id: Set(PaymentId::new().into_inner()),
            direction: Set(input.direction.as_str().to_string()),
            subject_id: Set(input.subject_id),
            amount: Set(input.amount),
            payment_date: Set(input.payment_date),
            method: Set(input.method),
            account_id: Set(input.cash_account.into_inner()),
            status: Set(status.as_str().to_string()),
            reference: Set(input.reference),
            journal_entry_id: Set(None),
            confirmed_at: Set(None),
            cancelled_at: Set(None),
            cancel_reason: Set(None),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await
        .map_err(map_db_err)?;

        info!(
            payment_id = %payment.id,
            direction = %payment.direction,
            amount = %payment.amount,
            "Recorded pending payment"
        );
        Ok(payment)
    }

    async fn ensure_subject(
        &self,
        direction: PaymentDirection,
        subject_id: Uuid,
    ) -> Result<(), LedgerError> {
        let (exists, kind) = match direction {
            PaymentDirection::Receipt => (
                clients::Entity::find_by_id(subject_id)
                    .one(&self.db)
                    .await
                    .map_err(map_db_err)?
                    .is_some(),
                SubledgerKind::Client,
            ),
            PaymentDirection::Disbursement => (
                suppliers::Entity::find_by_id(subject_id)
                    .one(&self.db)
                    .await
                    .map_err(map_db_err)?
                    .is_some(),
                SubledgerKind::Supplier,
            ),
        };
        if exists {
            Ok(())
        } else {
            Err(LedgerError::SubjectNotFound {
                kind: kind.to_string(),
                id: subject_id,
            })
        }
    }

    /// Confirms an `in_pay` payment and posts its ledger effects atomically.
    ///
    /// The payment row is locked first, so two confirmations of the same
    /// payment serialize and the second fails with `InvalidTransition`.
    ///
    /// # Errors
    ///
    /// Returns `PaymentNotFound`, `InvalidTransition`, any posting error, or
    /// `ConcurrencyConflict`. The payment keeps its status on failure.
    #[instrument(skip(self), fields(payment_id = %id))]
    pub async fn confirm(&self, id: PaymentId) -> Result<ConfirmedPayment, LedgerError> {
        let write = WriteTransaction::begin(&self.db, self.lock_timeout_ms).await?;
        let txn = write.transaction();

        let model = payments::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::PaymentNotFound(id.into_inner()))?;
        let pending = model.to_pending()?;

        let (action, plan) = PaymentWorkflow::plan_confirmation(&self.planner, &pending)?;
        let PaymentAction::Confirm {
            new_status,
            confirmed_at,
        } = action
        else {
            return Err(LedgerError::Consistency(
                "confirmation produced a non-confirm action".to_string(),
            ));
        };

        let posting = execute_plan(txn, &plan, self.tolerance).await?;
        let entry_id = posting.entry_id(legs::PAYMENT).ok_or_else(|| {
            LedgerError::Consistency(format!("payment {} posted without a journal entry", model.id))
        })?;

        let mut active: payments::ActiveModel = model.into();
        active.status = Set(new_status.as_str().to_string());
        active.journal_entry_id = Set(Some(entry_id));
        active.confirmed_at = Set(Some(confirmed_at.into()));
        let payment = active.update(txn).await.map_err(map_db_err)?;

        write.commit().await?;
        info!(
            journal_entry_id = %entry_id,
            amount = %payment.amount,
            "Confirmed payment"
        );
        Ok(ConfirmedPayment { payment, posting })
    }

    /// Cancels an `in_pay` payment. Ledgers are not touched.
    ///
    /// # Errors
    ///
    /// Returns `PaymentNotFound` or `InvalidTransition`.
    #[instrument(skip(self, reason), fields(payment_id = %id))]
    pub async fn cancel(
        &self,
        id: PaymentId,
        reason: Option<String>,
    ) -> Result<payments::Model, LedgerError> {
        let write = WriteTransaction::begin(&self.db, self.lock_timeout_ms).await?;
        let txn = write.transaction();

        let model = payments::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::PaymentNotFound(id.into_inner()))?;

        let action = PaymentWorkflow::cancel(model.payment_status()?, reason)?;
        let PaymentAction::Cancel {
            new_status,
            reason,
            cancelled_at,
        } = action
        else {
            return Err(LedgerError::Consistency(
                "cancellation produced a non-cancel action".to_string(),
            ));
        };

        let mut active: payments::ActiveModel = model.into();
        active.status = Set(new_status.as_str().to_string());
        active.cancelled_at = Set(Some(cancelled_at.into()));
        active.cancel_reason = Set(reason);
        let payment = active.update(txn).await.map_err(map_db_err)?;

        write.commit().await?;
        info!("Cancelled payment");
        Ok(payment)
    }

    /// Gets a payment.
    ///
    /// # Errors
    ///
    /// Returns `PaymentNotFound` if absent.
    pub async fn get(&self, id: PaymentId) -> Result<payments::Model, LedgerError> {
        payments::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::PaymentNotFound(id.into_inner()))
    }

    /// Lists payments, oldest payment date first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, filter: PaymentFilter) -> Result<Vec<payments::Model>, LedgerError> {
        let mut query = payments::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(payments::Column::Status.eq(status.as_str()));
        }
        if let Some(direction) = filter.direction {
            query = query.filter(payments::Column::Direction.eq(direction.as_str()));
        }
        query
            .order_by_asc(payments::Column::PaymentDate)
            .order_by_asc(payments::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(map_db_err)
    }
}
