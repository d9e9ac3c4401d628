//! Report calculations over subledger chains.

use std::collections::VecDeque;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::types::{AgingBucket, AgingBuckets, OpenItem, SubjectAging};
use crate::subledger::{ChainRow, SubledgerKind, dated_order};

/// Stateless report calculations.
pub struct ReportService;

impl ReportService {
    /// Ages one subject's balance as of `as_of`.
    ///
    /// Rows are replayed in date order. Movements that increase the balance
    /// open an item; movements that decrease it settle the oldest open items
    /// first. Any settlement left over is reported as unapplied.
    #[must_use]
    pub fn age_subject(
        kind: SubledgerKind,
        subject_id: Uuid,
        rows: &[ChainRow],
        as_of: NaiveDate,
    ) -> SubjectAging {
        let mut ordered: Vec<&ChainRow> = rows.iter().filter(|r| r.entry_date <= as_of).collect();
        ordered.sort_by(|a, b| dated_order(a, b));

        let mut open: VecDeque<OpenItem> = VecDeque::new();
        let mut unapplied = Decimal::ZERO;
        let mut balance = Decimal::ZERO;

        for row in ordered {
            let movement = kind.movement(row.debit, row.credit);
            balance += movement;

            if movement > Decimal::ZERO {
                // a charge first absorbs any earlier unapplied settlement
                let absorbed = movement.min(unapplied);
                unapplied -= absorbed;
                let outstanding = movement - absorbed;
                if outstanding > Decimal::ZERO {
                    open.push_back(OpenItem {
                        row_id: row.id,
                        entry_date: row.entry_date,
                        original: movement,
                        outstanding,
                        age_days: (as_of - row.entry_date).num_days(),
                    });
                }
            } else {
                let mut remaining = -movement;
                while remaining > Decimal::ZERO {
                    let Some(item) = open.front_mut() else {
                        unapplied += remaining;
                        break;
                    };
                    let applied = remaining.min(item.outstanding);
                    item.outstanding -= applied;
                    remaining -= applied;
                    if item.outstanding.is_zero() {
                        open.pop_front();
                    }
                }
            }
        }

        let mut buckets = AgingBuckets::default();
        for item in &open {
            buckets.add(AgingBucket::for_days(item.age_days), item.outstanding);
        }

        SubjectAging {
            kind,
            subject_id,
            balance,
            buckets,
            unapplied,
            open_items: open.into_iter().collect(),
        }
    }

    /// Ages every subject and keeps those with a nonzero balance.
    #[must_use]
    pub fn open_balances(
        kind: SubledgerKind,
        subjects: &[(Uuid, Vec<ChainRow>)],
        as_of: NaiveDate,
    ) -> Vec<SubjectAging> {
        subjects
            .iter()
            .map(|(subject_id, rows)| Self::age_subject(kind, *subject_id, rows, as_of))
            .filter(|aging| !aging.balance.is_zero())
            .collect()
    }
}
