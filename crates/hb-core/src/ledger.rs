//! The per-day ledger row shared by storage and presentation.

use chrono::NaiveDate;

use crate::category::DayCategory;

/// One device-day of attendance accounting.
///
/// `time_recorded` only ever grows within a day (one minute per heartbeat);
/// `time_required` is a materialized value recomputed by the accrual engine
/// whenever settings or holidays change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub device_id: String,
    pub date: NaiveDate,
    pub category: DayCategory,
    /// Minutes actually recorded via heartbeats.
    pub time_recorded: u32,
    /// Minutes owed for the day, derived from category and settings.
    pub time_required: u32,
    /// Holiday/leave description, if any.
    pub description: Option<String>,
}

impl LedgerEntry {
    /// Recorded minus required minutes; positive means ahead of quota.
    #[must_use]
    pub fn balance(&self) -> i64 {
        i64::from(self.time_recorded) - i64::from(self.time_required)
    }
}

/// A manual correction overlaying one date's recorded minutes.
///
/// Corrections win over the raw heartbeat count for balance purposes; the
/// ledger row itself is never rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub date: NaiveDate,
    pub corrected_minutes: u32,
    pub reason: String,
}
