//! Core attendance accounting logic for the heartbeat tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Day classification: resolving a date to a category (workday, weekend,
//!   leave, holiday) with an intrinsic precedence ordering
//! - Settings: the reporting period, working-day set, and daily requirement
//! - Aggregation: rolling ledger rows into month and period summaries
//! - Formatting: rendering minute balances for display

pub mod category;
pub mod format;
mod ledger;
pub mod settings;
pub mod summary;

pub use category::{DayCategory, OverrideKind, UnknownCategory};
pub use format::{format_balance, format_minutes};
pub use ledger::{Correction, LedgerEntry};
pub use settings::{Settings, SettingsError, WorkingDays};
pub use summary::{
    DaySummary, MonthSummary, PeriodBalance, month_bounds, monthly_summary, months_in_span,
    period_balance,
};
