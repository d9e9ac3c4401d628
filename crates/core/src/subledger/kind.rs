//! Subledger kinds and their subjects.

use std::fmt::Debug;
use std::hash::Hash;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, ClientId, SupplierId};
use uuid::Uuid;

use crate::ledger::NormalBalance;

/// The three running-balance chains kept next to the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubledgerKind {
    /// Per cash/bank account. Debit-normal.
    Account,
    /// Per client (receivable). Debit-normal.
    Client,
    /// Per supplier (payable). Credit-normal.
    Supplier,
}

impl SubledgerKind {
    /// All kinds, in lock order.
    pub const ALL: [Self; 3] = [Self::Account, Self::Client, Self::Supplier];

    /// Side on which the subject's balance grows.
    #[must_use]
    pub const fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Account | Self::Client => NormalBalance::Debit,
            Self::Supplier => NormalBalance::Credit,
        }
    }

    /// Signed balance change of one row.
    #[must_use]
    pub fn movement(self, debit: Decimal, credit: Decimal) -> Decimal {
        self.normal_balance().signed_movement(debit, credit)
    }

    /// Returns the string stored in `subledger_heads.kind`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Client => "client",
            Self::Supplier => "supplier",
        }
    }

    /// Parses the stored representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "account" => Some(Self::Account),
            "client" => Some(Self::Client),
            "supplier" => Some(Self::Supplier),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubledgerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed id that keys one subledger chain.
pub trait Subject: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// The chain this subject lives in.
    const KIND: SubledgerKind;

    /// Returns the raw UUID.
    fn uuid(self) -> Uuid;

    /// Wraps a raw UUID.
    fn from_uuid(uuid: Uuid) -> Self;
}

macro_rules! subject {
    ($id:ty, $kind:expr) => {
        impl Subject for $id {
            const KIND: SubledgerKind = $kind;

            fn uuid(self) -> Uuid {
                self.into_inner()
            }

            fn from_uuid(uuid: Uuid) -> Self {
                <$id>::from_uuid(uuid)
            }
        }
    };
}

subject!(AccountId, SubledgerKind::Account);
subject!(ClientId, SubledgerKind::Client);
subject!(SupplierId, SubledgerKind::Supplier);

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sign_conventions() {
        assert_eq!(SubledgerKind::Account.movement(dec!(100), dec!(0)), dec!(100));
        assert_eq!(SubledgerKind::Client.movement(dec!(0), dec!(500)), dec!(-500));
        assert_eq!(SubledgerKind::Supplier.movement(dec!(0), dec!(300)), dec!(300));
        assert_eq!(SubledgerKind::Supplier.movement(dec!(120), dec!(0)), dec!(-120));
    }

    #[test]
    fn test_subject_kinds() {
        assert_eq!(ClientId::KIND, SubledgerKind::Client);
        assert_eq!(SupplierId::KIND, SubledgerKind::Supplier);
        assert_eq!(<AccountId as Subject>::KIND, SubledgerKind::Account);

        let uuid = Uuid::now_v7();
        assert_eq!(<ClientId as Subject>::from_uuid(uuid).uuid(), uuid);
    }

    #[test]
    fn test_kind_strings() {
        for kind in SubledgerKind::ALL {
            assert_eq!(SubledgerKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(SubledgerKind::parse("vendor"), None);
    }
}
