//! Period closing rules.
//!
//! Books are closed through a date. Nothing dated on or before that date may
//! be posted, which also keeps backdated recalculation out of closed periods.

use chrono::NaiveDate;

use super::error::LedgerError;

/// Checks that `date` falls after the last closed date.
///
/// # Errors
///
/// Returns `PeriodClosed` if `date <= closed_through`.
pub fn ensure_period_open(
    date: NaiveDate,
    closed_through: Option<NaiveDate>,
) -> Result<(), LedgerError> {
    match closed_through {
        Some(closed_through) if date <= closed_through => Err(LedgerError::PeriodClosed {
            date,
            closed_through,
        }),
        _ => Ok(()),
    }
}

/// Checks that a new closing date does not move backwards.
///
/// # Errors
///
/// Returns `Validation` if `through` is not after the current closing date.
pub fn validate_new_closing(
    through: NaiveDate,
    current: Option<NaiveDate>,
) -> Result<(), LedgerError> {
    match current {
        Some(current) if through <= current => Err(LedgerError::Validation(format!(
            "books are already closed through {current}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Duration::days(offset)
    }

    #[test]
    fn test_no_closing_allows_everything() {
        assert!(ensure_period_open(date(0), None).is_ok());
    }

    #[test]
    fn test_closing_date_itself_is_closed() {
        let err = ensure_period_open(date(30), Some(date(30))).unwrap_err();
        assert!(matches!(err, LedgerError::PeriodClosed { .. }));
        assert!(ensure_period_open(date(31), Some(date(30))).is_ok());
    }

    #[test]
    fn test_closing_cannot_move_backwards() {
        assert!(validate_new_closing(date(60), Some(date(30))).is_ok());
        assert!(validate_new_closing(date(30), Some(date(30))).is_err());
        assert!(validate_new_closing(date(10), None).is_ok());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// **Property: posting is allowed exactly after the closing date**
        #[test]
        fn prop_open_iff_after_closing(posting in -400i64..400, closing in -400i64..400) {
            let result = ensure_period_open(date(posting), Some(date(closing)));
            prop_assert_eq!(result.is_ok(), posting > closing);
        }
    }
}
