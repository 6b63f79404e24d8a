//! Accountant — per-day run statistics and period rollups.
//!
//! Each run produces a [`RunStats`] delta. Deltas are merged into one stored
//! row per calendar day by addition; rollups over a window are always summed
//! fresh from the per-day rows.

use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::types::{PeriodStats, PeriodSummary, RunStats};

/// Days in a weekly report window, ending on (and including) the report day.
pub const WEEK_DAYS: i64 = 7;

/// Merge a run delta into the stored row for `date`.
///
/// With no existing row the delta becomes the row. Every counter is summed,
/// never overwritten. Submissions are not deduplicated: merging the same
/// delta twice counts it twice.
pub fn merge_stats(existing: Option<PeriodStats>, date: NaiveDate, delta: &RunStats) -> PeriodStats {
    match existing {
        Some(mut row) if row.date == date => {
            row.totals += delta;
            row
        }
        Some(row) => {
            warn!(
                stored = %row.date,
                requested = %date,
                "Merge target belongs to another day, starting a new row"
            );
            PeriodStats {
                date,
                totals: delta.clone(),
            }
        }
        None => PeriodStats {
            date,
            totals: delta.clone(),
        },
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Keyed store of per-day rows.
///
/// `record` does its read-merge-write under a single lock, so concurrent
/// runs (a scheduled one overlapping a manual one) cannot lose updates.
#[derive(Debug, Default)]
pub struct StatsLedger {
    rows: Mutex<BTreeMap<NaiveDate, RunStats>>,
}

impl StatsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from stored rows. Duplicate dates are merged.
    pub fn from_rows(rows: impl IntoIterator<Item = PeriodStats>) -> Self {
        let ledger = Self::new();
        for row in rows {
            ledger.record(row.date, &row.totals);
        }
        ledger
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<NaiveDate, RunStats>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Merge a run delta into the row for `date` and return the updated row.
    pub fn record(&self, date: NaiveDate, delta: &RunStats) -> PeriodStats {
        let mut rows = self.lock();
        let existing = rows.get(&date).map(|totals| PeriodStats {
            date,
            totals: totals.clone(),
        });
        let merged = merge_stats(existing, date, delta);
        rows.insert(date, merged.totals.clone());

        debug!(date = %date, totals = %merged.totals, "Stats row updated");
        merged
    }

    pub fn get(&self, date: NaiveDate) -> Option<PeriodStats> {
        self.lock().get(&date).map(|totals| PeriodStats {
            date,
            totals: totals.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// All rows, oldest first.
    pub fn rows(&self) -> Vec<PeriodStats> {
        self.lock()
            .iter()
            .map(|(date, totals)| PeriodStats {
                date: *date,
                totals: totals.clone(),
            })
            .collect()
    }

    /// Rows on or after `since`, newest first.
    pub fn daily(&self, since: NaiveDate) -> Vec<PeriodStats> {
        self.lock()
            .range(since..)
            .rev()
            .map(|(date, totals)| PeriodStats {
                date: *date,
                totals: totals.clone(),
            })
            .collect()
    }

    /// Sum of the rows in `from..=to`.
    pub fn rollup(&self, from: NaiveDate, to: NaiveDate) -> PeriodSummary {
        let rows = self.lock();
        let (days_recorded, totals) = if from <= to {
            let window: Vec<&RunStats> = rows.range(from..=to).map(|(_, s)| s).collect();
            (window.len(), window.into_iter().sum())
        } else {
            (0, RunStats::default())
        };

        PeriodSummary {
            from,
            to,
            days_recorded,
            totals,
        }
    }

    /// The seven days ending on `today`.
    pub fn weekly(&self, today: NaiveDate) -> PeriodSummary {
        let summary = self.rollup(today - Duration::days(WEEK_DAYS - 1), today);
        info!(
            from = %summary.from,
            to = %summary.to,
            days = summary.days_recorded,
            totals = %summary.totals,
            "Weekly rollup"
        );
        summary
    }

    /// Drop rows older than `cutoff`. Returns how many were removed.
    pub fn prune_before(&self, cutoff: NaiveDate) -> usize {
        let mut rows = self.lock();
        let kept = rows.split_off(&cutoff);
        let removed = rows.len();
        *rows = kept;
        if removed > 0 {
            info!(removed, cutoff = %cutoff, "Pruned old stats rows");
        }
        removed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
