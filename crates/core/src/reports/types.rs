//! Report data types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subledger::SubledgerKind;

/// Age classification of an outstanding amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgingBucket {
    /// Not yet past its date.
    Current,
    /// 1 to 30 days.
    Days1To30,
    /// 31 to 60 days.
    Days31To60,
    /// 61 to 90 days.
    Days61To90,
    /// More than 90 days.
    Over90,
}

impl AgingBucket {
    /// Bucket for an amount `days` old.
    #[must_use]
    pub const fn for_days(days: i64) -> Self {
        match days {
            i64::MIN..=0 => Self::Current,
            1..=30 => Self::Days1To30,
            31..=60 => Self::Days31To60,
            61..=90 => Self::Days61To90,
            _ => Self::Over90,
        }
    }

    /// Column label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Days1To30 => "1-30",
            Self::Days31To60 => "31-60",
            Self::Days61To90 => "61-90",
            Self::Over90 => "90+",
        }
    }
}

/// Outstanding amounts per bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AgingBuckets {
    /// Current.
    pub current: Decimal,
    /// 1-30 days.
    pub days_1_30: Decimal,
    /// 31-60 days.
    pub days_31_60: Decimal,
    /// 61-90 days.
    pub days_61_90: Decimal,
    /// Over 90 days.
    pub over_90: Decimal,
}

impl AgingBuckets {
    /// Adds `amount` to `bucket`.
    pub fn add(&mut self, bucket: AgingBucket, amount: Decimal) {
        let slot = match bucket {
            AgingBucket::Current => &mut self.current,
            AgingBucket::Days1To30 => &mut self.days_1_30,
            AgingBucket::Days31To60 => &mut self.days_31_60,
            AgingBucket::Days61To90 => &mut self.days_61_90,
            AgingBucket::Over90 => &mut self.over_90,
        };
        *slot += amount;
    }

    /// Sum of all buckets.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.current + self.days_1_30 + self.days_31_60 + self.days_61_90 + self.over_90
    }
}

/// A charge not yet fully settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenItem {
    /// Subledger row id of the charge.
    pub row_id: i64,
    /// Charge date.
    pub entry_date: NaiveDate,
    /// Original charge amount.
    pub original: Decimal,
    /// Amount still outstanding.
    pub outstanding: Decimal,
    /// Days between the charge and the report date.
    pub age_days: i64,
}

/// Aging of one subject's balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectAging {
    /// Chain kind.
    pub kind: SubledgerKind,
    /// Subject id.
    pub subject_id: Uuid,
    /// Balance as of the report date.
    pub balance: Decimal,
    /// Outstanding charges by age.
    pub buckets: AgingBuckets,
    /// Settlements not matched to any charge (a negative balance).
    pub unapplied: Decimal,
    /// Open charges, oldest first.
    pub open_items: Vec<OpenItem>,
}
