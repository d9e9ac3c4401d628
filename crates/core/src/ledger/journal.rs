//! Journal entry inputs and double-entry validation.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::AccountId;
use uuid::Uuid;

use super::account::AccountInfo;
use super::error::LedgerError;

/// Minimum number of lines in a journal entry.
pub const MIN_LINES: usize = 2;

/// Business document that produced a journal entry or subledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Confirmed sales invoice.
    Invoice,
    /// Credit note against an invoice.
    CreditNote,
    /// Cash received from a client.
    CustomerPayment,
    /// Cash paid to a supplier.
    SupplierPayment,
    /// Operating expense.
    Expense,
    /// Periodic depreciation run.
    Depreciation,
    /// Goods received from a supplier.
    PurchaseReceipt,
    /// Manual journal entry.
    Manual,
}

impl SourceType {
    /// Returns the string representation stored in `reference_type` columns.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::CreditNote => "credit_note",
            Self::CustomerPayment => "customer_payment",
            Self::SupplierPayment => "supplier_payment",
            Self::Expense => "expense",
            Self::Depreciation => "depreciation",
            Self::PurchaseReceipt => "purchase_receipt",
            Self::Manual => "manual",
        }
    }

    /// Parses the stored representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "invoice" => Some(Self::Invoice),
            "credit_note" => Some(Self::CreditNote),
            "customer_payment" => Some(Self::CustomerPayment),
            "supplier_payment" => Some(Self::SupplierPayment),
            "expense" => Some(Self::Expense),
            "depreciation" => Some(Self::Depreciation),
            "purchase_receipt" => Some(Self::PurchaseReceipt),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cross-reference from ledger rows back to the business document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    /// Document type.
    pub source_type: SourceType,
    /// Document id.
    pub source_id: Uuid,
}

impl SourceRef {
    /// Creates a source reference.
    #[must_use]
    pub const fn new(source_type: SourceType, source_id: Uuid) -> Self {
        Self {
            source_type,
            source_id,
        }
    }

    /// Key that identifies one journal leg of this document.
    ///
    /// Posting the same leg twice yields the same key, which the store keeps
    /// unique.
    #[must_use]
    pub fn idempotency_key(&self, leg: &str) -> String {
        format!("{}:{}:{leg}", self.source_type, self.source_id)
    }
}

/// One debit or credit line of a journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLineInput {
    /// Account posted to.
    pub account_id: AccountId,
    /// Debit amount (zero for credit lines).
    pub debit: Decimal,
    /// Credit amount (zero for debit lines).
    pub credit: Decimal,
    /// Optional line memo.
    pub description: Option<String>,
}

impl JournalLineInput {
    /// Creates a debit line.
    #[must_use]
    pub const fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Decimal::ZERO,
            description: None,
        }
    }

    /// Creates a credit line.
    #[must_use]
    pub const fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: Decimal::ZERO,
            credit: amount,
            description: None,
        }
    }

    /// Attaches a memo to the line.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A journal entry ready to be validated and stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntryInput {
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Human reference (invoice number, receipt number).
    pub reference: String,
    /// Narrative.
    pub description: String,
    /// Originating document, if any.
    pub source: Option<SourceRef>,
    /// Retry-safety key; unique across all entries.
    pub idempotency_key: Option<String>,
    /// Lines.
    pub lines: Vec<JournalLineInput>,
}

/// Debit and credit totals of a validated entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntryTotals {
    /// Sum of debit amounts.
    pub debit: Decimal,
    /// Sum of credit amounts.
    pub credit: Decimal,
}

impl EntryTotals {
    /// Returns |debit - credit|.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        (self.debit - self.credit).abs()
    }
}

/// Validates the double-entry rules of a journal entry and returns its totals.
///
/// Rules, checked in order:
/// - at least [`MIN_LINES`] lines
/// - each line carries exactly one nonzero, non-negative side
/// - |total debit - total credit| is at most `tolerance`
///
/// # Errors
///
/// Returns `EmptyEntry`, `InvalidLine` or `ImbalancedEntry`.
pub fn validate_entry(
    input: &JournalEntryInput,
    tolerance: Decimal,
) -> Result<EntryTotals, LedgerError> {
    if input.lines.len() < MIN_LINES {
        return Err(LedgerError::EmptyEntry {
            lines: input.lines.len(),
        });
    }

    let mut totals = EntryTotals::default();
    for (idx, line) in input.lines.iter().enumerate() {
        let invalid = |reason: &str| LedgerError::InvalidLine {
            line: idx + 1,
            reason: reason.to_string(),
        };

        if line.debit.is_sign_negative() || line.credit.is_sign_negative() {
            return Err(invalid("amounts must be non-negative"));
        }
        match (line.debit.is_zero(), line.credit.is_zero()) {
            (true, true) => return Err(invalid("line has no amount")),
            (false, false) => return Err(invalid("line must be either debit or credit, not both")),
            _ => {}
        }

        totals.debit += line.debit;
        totals.credit += line.credit;
    }

    if totals.difference() > tolerance {
        return Err(LedgerError::ImbalancedEntry {
            debit: totals.debit,
            credit: totals.credit,
        });
    }

    Ok(totals)
}

/// Checks that every account referenced by `lines` exists and is active.
///
/// `lookup` is injected so the check stays independent of storage.
///
/// # Errors
///
/// Returns `AccountNotFound` or `AccountInactive` for the first offending line.
pub fn check_accounts<F>(
    lines: &[JournalLineInput],
    lookup: F,
) -> Result<HashMap<AccountId, AccountInfo>, LedgerError>
where
    F: Fn(AccountId) -> Option<AccountInfo>,
{
    let mut resolved = HashMap::new();
    for line in lines {
        if resolved.contains_key(&line.account_id) {
            continue;
        }
        let info = lookup(line.account_id)
            .ok_or(LedgerError::AccountNotFound(line.account_id.into_inner()))?;
        if !info.is_active {
            return Err(LedgerError::AccountInactive(line.account_id.into_inner()));
        }
        resolved.insert(line.account_id, info);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::account::AccountType;
    use rust_decimal_macros::dec;

    fn entry(lines: Vec<JournalLineInput>) -> JournalEntryInput {
        JournalEntryInput {
            entry_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            reference: "INV-0001".to_string(),
            description: "test".to_string(),
            source: None,
            idempotency_key: None,
            lines,
        }
    }

    #[test]
    fn test_balanced_entry_passes() {
        let (ar, sales, tax) = (AccountId::new(), AccountId::new(), AccountId::new());
        let totals = validate_entry(
            &entry(vec![
                JournalLineInput::debit(ar, dec!(1160.00)),
                JournalLineInput::credit(sales, dec!(1000.00)),
                JournalLineInput::credit(tax, dec!(160.00)),
            ]),
            dec!(0.01),
        )
        .unwrap();
        assert_eq!(totals.debit, dec!(1160.00));
        assert_eq!(totals.credit, dec!(1160.00));
    }

    #[test]
    fn test_single_line_is_empty_entry() {
        let err = validate_entry(
            &entry(vec![JournalLineInput::debit(AccountId::new(), dec!(10))]),
            dec!(0.01),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::EmptyEntry { lines: 1 }));
    }

    #[test]
    fn test_line_with_both_sides_rejected() {
        let mut both = JournalLineInput::debit(AccountId::new(), dec!(10));
        both.credit = dec!(10);
        let err = validate_entry(
            &entry(vec![both, JournalLineInput::credit(AccountId::new(), dec!(0.5))]),
            dec!(0.01),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidLine { line: 1, .. }));
    }

    #[test]
    fn test_zero_and_negative_lines_rejected() {
        let a = AccountId::new();
        let err = validate_entry(
            &entry(vec![
                JournalLineInput::debit(a, dec!(10)),
                JournalLineInput::credit(a, dec!(0)),
            ]),
            dec!(0.01),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidLine { line: 2, .. }));

        let err = validate_entry(
            &entry(vec![
                JournalLineInput::debit(a, dec!(-10)),
                JournalLineInput::credit(a, dec!(-10)),
            ]),
            dec!(0.01),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidLine { line: 1, .. }));
    }

    #[test]
    fn test_tolerance_boundary() {
        let (a, b) = (AccountId::new(), AccountId::new());
        assert!(validate_entry(
            &entry(vec![
                JournalLineInput::debit(a, dec!(100.00)),
                JournalLineInput::credit(b, dec!(99.99)),
            ]),
            dec!(0.01),
        )
        .is_ok());

        let err = validate_entry(
            &entry(vec![
                JournalLineInput::debit(a, dec!(100.00)),
                JournalLineInput::credit(b, dec!(99.98)),
            ]),
            dec!(0.01),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::ImbalancedEntry { .. }));
    }

    #[test]
    fn test_check_accounts() {
        let active = AccountInfo {
            id: AccountId::new(),
            code: "1000".into(),
            name: "Cash".into(),
            account_type: AccountType::Cash,
            is_active: true,
        };
        let inactive = AccountInfo {
            id: AccountId::new(),
            code: "1010".into(),
            name: "Old bank".into(),
            account_type: AccountType::Cash,
            is_active: false,
        };
        let chart = [active.clone(), inactive.clone()];
        let lookup = |id: AccountId| chart.iter().find(|a| a.id == id).cloned();

        let ok = check_accounts(
            &[
                JournalLineInput::debit(active.id, dec!(1)),
                JournalLineInput::credit(active.id, dec!(1)),
            ],
            lookup,
        )
        .unwrap();
        assert_eq!(ok.len(), 1);

        let err = check_accounts(&[JournalLineInput::debit(inactive.id, dec!(1))], lookup)
            .unwrap_err();
        assert!(matches!(err, LedgerError::AccountInactive(_)));

        let err = check_accounts(&[JournalLineInput::debit(AccountId::new(), dec!(1))], lookup)
            .unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotFound(_)));
    }

    #[test]
    fn test_idempotency_key() {
        let id = Uuid::nil();
        let source = SourceRef::new(SourceType::Invoice, id);
        assert_eq!(
            source.idempotency_key("sale"),
            format!("invoice:{id}:sale")
        );
    }
}
