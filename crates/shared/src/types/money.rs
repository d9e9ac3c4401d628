//! Monetary helpers with decimal precision.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are `rust_decimal::Decimal` rounded to two places.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of decimal places stored for every amount.
pub const MONEY_SCALE: u32 = 2;

/// Default tolerance for comparing two amounts that went through division.
pub const AMOUNT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Errors raised when building monetary values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// Tax rate outside `[0, 1]`.
    #[error("Invalid tax rate {0}: must be between 0 and 1")]
    InvalidTaxRate(Decimal),
}

/// Rounds an amount to cents, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Returns true if `a` and `b` differ by at most `tolerance`.
#[must_use]
pub fn within_tolerance(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    (a - b).abs() <= tolerance
}

/// A tax rate expressed as a fraction (0.16 = 16%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct TaxRate(Decimal);

impl TaxRate {
    /// Zero rate.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a rate, rejecting values outside `[0, 1]`.
    pub fn new(rate: Decimal) -> Result<Self, MoneyError> {
        if rate.is_sign_negative() || rate > Decimal::ONE {
            return Err(MoneyError::InvalidTaxRate(rate));
        }
        Ok(Self(rate))
    }

    /// Returns the rate as a fraction.
    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }

    /// Splits a tax-inclusive amount into net and tax.
    ///
    /// `net = round(gross / (1 + rate))` and `tax = gross - net`, so the two
    /// parts always add back to `gross` exactly.
    #[must_use]
    pub fn split_gross(self, gross: Decimal) -> TaxSplit {
        let net = round_money(gross / (Decimal::ONE + self.0));
        TaxSplit {
            gross,
            net,
            tax: gross - net,
        }
    }
}

impl TryFrom<Decimal> for TaxRate {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaxRate> for Decimal {
    fn from(rate: TaxRate) -> Self {
        rate.0
    }
}

impl std::fmt::Display for TaxRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", (self.0 * Decimal::ONE_HUNDRED).normalize())
    }
}

/// A tax-inclusive amount broken into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxSplit {
    /// Tax-inclusive amount.
    pub gross: Decimal,
    /// Amount before tax.
    pub net: Decimal,
    /// Tax portion.
    pub tax: Decimal,
}

impl std::ops::Add for TaxSplit {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            gross: self.gross + rhs.gross,
            net: self.net + rhs.net,
            tax: self.tax + rhs.tax,
        }
    }
}

impl std::iter::Sum for TaxSplit {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, s| acc + s)
    }
}
