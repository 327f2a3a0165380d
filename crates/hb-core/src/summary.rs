//! Aggregation of ledger rows into month and period summaries.
//!
//! These are pure functions over slices of [`LedgerEntry`]; the caller
//! fetches the rows for the span of interest. Missing rows are treated as
//! zero recorded minutes with the requirement computed on the fly from the
//! calendar rules, so summaries stay correct before the accrual engine has
//! materialized a row for every day. Manual [`Correction`]s override the
//! recorded minutes of their date for balance purposes; the raw ledger
//! value is untouched.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::category::DayCategory;
use crate::ledger::{Correction, LedgerEntry};
use crate::settings::Settings;

/// First and last day of a calendar month.
#[must_use]
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next_first.pred_opt()?))
}

/// The `(year, month)` pairs whose months intersect `[start, end]`.
#[must_use]
pub fn months_in_span(start: NaiveDate, end: NaiveDate) -> Vec<(i32, u32)> {
    let mut months = Vec::new();
    let Some(mut cursor) = start.with_day(1) else {
        return months;
    };
    while cursor <= end {
        months.push((cursor.year(), cursor.month()));
        let Some((_, last)) = month_bounds(cursor.year(), cursor.month()) else {
            break;
        };
        let Some(next) = last.succ_opt() else {
            break;
        };
        cursor = next;
    }
    months
}

/// One day in a month breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub category: DayCategory,
    /// Effective recorded minutes: the correction when one exists,
    /// otherwise the raw heartbeat count.
    pub time_recorded: u32,
    pub time_required: u32,
    pub balance: i64,
    /// A manual correction replaced the raw recorded minutes.
    pub corrected: bool,
    pub is_today: bool,
    /// Future days appear as informational placeholders with zeroed
    /// numbers; they never contribute to sums.
    pub is_future: bool,
    pub description: Option<String>,
}

/// Month roll-up with its day-by-day breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthSummary {
    pub year: i32,
    pub month: u32,
    /// Display label, e.g. "June 2024".
    pub label: String,
    pub time_recorded: u32,
    pub time_required: u32,
    pub balance: i64,
    /// Whole month lies after today's month; rendered as a placeholder.
    pub is_future: bool,
    pub days: Vec<DaySummary>,
}

/// Recorded/required/balance sums for a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeriodBalance {
    pub time_recorded: u32,
    pub time_required: u32,
    pub balance: i64,
}

struct DayNumbers {
    category: DayCategory,
    recorded: u32,
    required: u32,
    corrected: bool,
    description: Option<String>,
}

fn by_date(rows: &[LedgerEntry]) -> BTreeMap<NaiveDate, &LedgerEntry> {
    rows.iter().map(|row| (row.date, row)).collect()
}

fn corrections_by_date(corrections: &[Correction]) -> BTreeMap<NaiveDate, u32> {
    corrections
        .iter()
        .map(|correction| (correction.date, correction.corrected_minutes))
        .collect()
}

/// Effective numbers for one date: the stored row if present, otherwise
/// zero recorded with the requirement computed from the calendar rules;
/// corrections override the recorded minutes either way.
fn day_numbers(
    date: NaiveDate,
    rows: &BTreeMap<NaiveDate, &LedgerEntry>,
    corrections: &BTreeMap<NaiveDate, u32>,
    settings: &Settings,
) -> DayNumbers {
    let (category, raw_recorded, required, description) = rows.get(&date).map_or_else(
        || {
            let category = settings.working_days.classify(date);
            let required = category.required_minutes(settings.daily_required_minutes);
            (category, 0, required, None)
        },
        |row| {
            (
                row.category,
                row.time_recorded,
                row.time_required,
                row.description.clone(),
            )
        },
    );

    let correction = corrections.get(&date).copied();
    DayNumbers {
        category,
        recorded: correction.unwrap_or(raw_recorded),
        required,
        corrected: correction.is_some(),
        description,
    }
}

/// Rolls the month's ledger rows into totals and a calendar breakdown.
///
/// `rows` and `corrections` may cover any span; only entries dated inside
/// the month are used. Months after today's month produce a placeholder
/// with no day data. Returns `None` only for an invalid year/month pair.
#[must_use]
pub fn monthly_summary(
    year: i32,
    month: u32,
    rows: &[LedgerEntry],
    corrections: &[Correction],
    settings: &Settings,
    today: NaiveDate,
) -> Option<MonthSummary> {
    let (first, last) = month_bounds(year, month)?;
    let label = first.format("%B %Y").to_string();

    let current_month_start = today.with_day(1)?;
    if first > current_month_start {
        return Some(MonthSummary {
            year,
            month,
            label,
            time_recorded: 0,
            time_required: 0,
            balance: 0,
            is_future: true,
            days: Vec::new(),
        });
    }

    let lookup = by_date(rows);
    let corrected = corrections_by_date(corrections);
    let mut days = Vec::new();
    let mut total_recorded: u32 = 0;
    let mut total_required: u32 = 0;

    for date in first.iter_days().take_while(|d| *d <= last) {
        let numbers = day_numbers(date, &lookup, &corrected, settings);
        if date > today {
            days.push(DaySummary {
                date,
                category: numbers.category,
                time_recorded: 0,
                time_required: 0,
                balance: 0,
                corrected: false,
                is_today: false,
                is_future: true,
                description: numbers.description,
            });
            continue;
        }

        total_recorded += numbers.recorded;
        total_required += numbers.required;
        days.push(DaySummary {
            date,
            category: numbers.category,
            time_recorded: numbers.recorded,
            time_required: numbers.required,
            balance: i64::from(numbers.recorded) - i64::from(numbers.required),
            corrected: numbers.corrected,
            is_today: date == today,
            is_future: false,
            description: numbers.description,
        });
    }

    Some(MonthSummary {
        year,
        month,
        label,
        time_recorded: total_recorded,
        time_required: total_required,
        balance: i64::from(total_recorded) - i64::from(total_required),
        is_future: false,
        days,
    })
}

/// Sums recorded and required minutes over `[start, min(end, today)]`.
///
/// Days after today are not yet due and are excluded entirely; callers that
/// want them rendered use [`monthly_summary`]'s placeholders.
#[must_use]
pub fn period_balance(
    rows: &[LedgerEntry],
    corrections: &[Correction],
    settings: &Settings,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> PeriodBalance {
    let effective_end = end.min(today);
    if effective_end < start {
        return PeriodBalance::default();
    }

    let lookup = by_date(rows);
    let corrected = corrections_by_date(corrections);
    let mut total_recorded: u32 = 0;
    let mut total_required: u32 = 0;

    for date in start.iter_days().take_while(|d| *d <= effective_end) {
        let numbers = day_numbers(date, &lookup, &corrected, settings);
        total_recorded += numbers.recorded;
        total_required += numbers.required;
    }

    PeriodBalance {
        time_recorded: total_recorded,
        time_required: total_required,
        balance: i64::from(total_recorded) - i64::from(total_required),
    }
}
