//! Report repository: the read API over the journal and subledgers.
//!
//! Balances come from journal lines; histories and aging come from the
//! subledger chains. Nothing here writes.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, DbBackend, EntityTrait, FromQueryResult, Statement};
use tally_core::ledger::{AccountBalance, LedgerError, TrialBalance, TrialBalanceRow};
use tally_core::reports::{ReportService, SubjectAging};
use tally_core::subledger::{ChainReport, SubledgerKind};
use tally_shared::types::AccountId;
use uuid::Uuid;

use super::subledger::{SubledgerEntry, load_history, load_kind_until, verify};
use crate::entities::chart_of_accounts;
use crate::error::map_db_err;

#[derive(Debug, FromQueryResult)]
struct LineTotals {
    debit_total: Decimal,
    credit_total: Decimal,
}

#[derive(Debug, FromQueryResult)]
struct TrialBalanceLine {
    id: Uuid,
    account_code: String,
    account_name: String,
    account_type: String,
    parent_account_id: Option<Uuid>,
    is_active: bool,
    created_at: chrono::DateTime<chrono::FixedOffset>,
    debit_total: Decimal,
    credit_total: Decimal,
}

impl TrialBalanceLine {
    fn into_row(self) -> Result<TrialBalanceRow, LedgerError> {
        let account = chart_of_accounts::Model {
            id: self.id,
            account_code: self.account_code,
            account_name: self.account_name,
            account_type: self.account_type,
            parent_account_id: self.parent_account_id,
            is_active: self.is_active,
            created_at: self.created_at,
        }
        .to_info()?;
        let balance = AccountBalance::from_totals(
            account.id,
            account.account_type.normal_balance(),
            self.debit_total,
            self.credit_total,
        );
        Ok(TrialBalanceRow { account, balance })
    }
}

/// Report repository.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    db: DatabaseConnection,
    tolerance: Decimal,
}

impl ReportRepository {
    /// Creates a new report repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, tolerance: Decimal) -> Self {
        Self { db, tolerance }
    }

    /// Debit and credit totals of an account's journal lines dated on or
    /// before `as_of`, with the balance signed by its normal side.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist.
    pub async fn account_totals(
        &self,
        account_id: AccountId,
        as_of: NaiveDate,
    ) -> Result<AccountBalance, LedgerError> {
        let account = chart_of_accounts::Entity::find_by_id(account_id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::AccountNotFound(account_id.into_inner()))?
            .to_info()?;

        let totals = LineTotals::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            r"
            SELECT COALESCE(SUM(l.debit_amount), 0) AS debit_total,
                   COALESCE(SUM(l.credit_amount), 0) AS credit_total
            FROM journal_entry_lines l
            JOIN journal_entries e ON e.id = l.journal_entry_id
            WHERE l.account_id = $1 AND e.entry_date <= $2
            ",
            [account_id.into_inner().into(), as_of.into()],
        ))
        .one(&self.db)
        .await
        .map_err(map_db_err)?
        .unwrap_or(LineTotals {
            debit_total: Decimal::ZERO,
            credit_total: Decimal::ZERO,
        });

        Ok(AccountBalance::from_totals(
            account_id,
            account.account_type.normal_balance(),
            totals.debit_total,
            totals.credit_total,
        ))
    }

    /// Signed balance of an account as of a date.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist.
    pub async fn account_balance(
        &self,
        account_id: AccountId,
        as_of: NaiveDate,
    ) -> Result<Decimal, LedgerError> {
        Ok(self.account_totals(account_id, as_of).await?.balance)
    }

    /// Trial balance of every account with activity up to `as_of`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn trial_balance(&self, as_of: NaiveDate) -> Result<TrialBalance, LedgerError> {
        let lines = TrialBalanceLine::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            r"
            SELECT a.id, a.account_code, a.account_name, a.account_type,
                   a.parent_account_id, a.is_active, a.created_at,
                   SUM(l.debit_amount) AS debit_total,
                   SUM(l.credit_amount) AS credit_total
            FROM journal_entry_lines l
            JOIN journal_entries e ON e.id = l.journal_entry_id
            JOIN chart_of_accounts a ON a.id = l.account_id
            WHERE e.entry_date <= $1
            GROUP BY a.id
            ",
            [as_of.into()],
        ))
        .all(&self.db)
        .await
        .map_err(map_db_err)?;

        let rows = lines
            .into_iter()
            .map(TrialBalanceLine::into_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TrialBalance::from_rows(rows, self.tolerance))
    }

    /// Rows of one subject's chain, date ascending then id.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if `from` is after `to`.
    pub async fn subledger_history(
        &self,
        kind: SubledgerKind,
        subject_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<SubledgerEntry>, LedgerError> {
        if let (Some(from), Some(to)) = (from, to)
            && from > to
        {
            return Err(LedgerError::Validation(format!(
                "invalid date range: {from} is after {to}"
            )));
        }
        load_history(&self.db, kind, subject_id, from, to).await
    }

    /// Subjects of `kind` with a nonzero balance as of `as_of`, aged by
    /// open item.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn open_balances(
        &self,
        kind: SubledgerKind,
        as_of: NaiveDate,
    ) -> Result<Vec<SubjectAging>, LedgerError> {
        let subjects = load_kind_until(&self.db, kind, as_of).await?;
        Ok(ReportService::open_balances(kind, &subjects, as_of))
    }

    /// Replays one chain and compares it with its stored balances.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn verify_chain(
        &self,
        kind: SubledgerKind,
        subject_id: Uuid,
    ) -> Result<ChainReport, LedgerError> {
        verify(&self.db, kind, subject_id).await
    }
}
