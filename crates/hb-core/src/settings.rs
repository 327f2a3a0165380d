//! Settings and the canonical working-day set.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

use crate::category::DayCategory;
use crate::summary::month_bounds;

/// Default daily requirement: eight hours.
pub const DEFAULT_DAILY_REQUIRED_MINUTES: u32 = 480;

/// Validation errors for settings values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// A weekday index outside 0..=6.
    #[error("weekday index out of range: {index}")]
    InvalidWeekday { index: u8 },

    /// A day-name token that is not a known weekday.
    #[error("unknown weekday name: {name}")]
    UnknownWeekdayName { name: String },

    /// The working-days value could not be parsed in any supported format.
    #[error("unparsable working days: {raw}")]
    UnparsableWorkingDays { raw: String },

    /// The device id was empty.
    #[error("device id cannot be empty")]
    EmptyDeviceId,

    /// The reporting period was inverted.
    #[error("start date {start} is after end date {end}")]
    DateRange { start: NaiveDate, end: NaiveDate },

    /// The daily requirement was zero.
    #[error("daily required minutes must be positive")]
    ZeroDailyRequirement,
}

/// Index of a date's weekday, 0 = Monday through 6 = Sunday.
#[must_use]
pub fn weekday_index(date: NaiveDate) -> u8 {
    // num_days_from_monday is always 0..=6
    u8::try_from(date.weekday().num_days_from_monday()).unwrap_or(u8::MAX)
}

/// The set of weekdays that count as workdays, 0 = Monday through 6 = Sunday.
///
/// This is the single canonical representation; the legacy comma-separated
/// day-name form (`"Mon,Tue,Wed"`) is migrated at the parse boundary and
/// never read back per-query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDays(BTreeSet<u8>);

impl WorkingDays {
    /// Builds a set from weekday indices, rejecting indices above 6.
    pub fn from_indices(indices: impl IntoIterator<Item = u8>) -> Result<Self, SettingsError> {
        let mut set = BTreeSet::new();
        for index in indices {
            if index > 6 {
                return Err(SettingsError::InvalidWeekday { index });
            }
            set.insert(index);
        }
        Ok(Self(set))
    }

    /// Parses a stored working-days value.
    ///
    /// Accepts the canonical JSON array form (`"[0,1,2,3,4]"`), a
    /// comma-separated list of indices (`"0,1,2"`), or the legacy
    /// comma-separated day names (`"Mon,Tue,Wed"`). An empty string is an
    /// empty set (every day classifies as weekend).
    pub fn parse(raw: &str) -> Result<Self, SettingsError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self(BTreeSet::new()));
        }

        if trimmed.starts_with('[') {
            let indices: Vec<u8> = serde_json::from_str(trimmed).map_err(|_| {
                SettingsError::UnparsableWorkingDays {
                    raw: raw.to_string(),
                }
            })?;
            return Self::from_indices(indices);
        }

        let mut set = BTreeSet::new();
        for token in trimmed.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let index = match token.parse::<u8>() {
                Ok(index) => index,
                Err(_) => day_name_index(token)?,
            };
            if index > 6 {
                return Err(SettingsError::InvalidWeekday { index });
            }
            set.insert(index);
        }
        Ok(Self(set))
    }

    /// The canonical stored form: a JSON array of indices.
    #[must_use]
    pub fn to_canonical(&self) -> String {
        let indices: Vec<u8> = self.0.iter().copied().collect();
        serde_json::to_string(&indices).unwrap_or_else(|_| "[]".to_string())
    }

    /// Whether the given date's weekday is a working day.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.0.contains(&weekday_index(date))
    }

    /// Whether the weekday index (0 = Monday) is a working day.
    #[must_use]
    pub fn contains_index(&self, index: u8) -> bool {
        self.0.contains(&index)
    }

    /// Classifies a date against this working-day set.
    ///
    /// Explicit holiday/leave overrides live in the ledger and win over this
    /// result; callers consult stored rows first.
    #[must_use]
    pub fn classify(&self, date: NaiveDate) -> DayCategory {
        if self.contains(date) {
            DayCategory::Workday
        } else {
            DayCategory::Weekend
        }
    }

    /// Iterates the contained weekday indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for WorkingDays {
    /// Monday through Friday.
    fn default() -> Self {
        Self((0..=4).collect())
    }
}

impl fmt::Display for WorkingDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical())
    }
}

fn day_name_index(name: &str) -> Result<u8, SettingsError> {
    match name {
        "Mon" | "Monday" => Ok(0),
        "Tue" | "Tuesday" => Ok(1),
        "Wed" | "Wednesday" => Ok(2),
        "Thu" | "Thursday" => Ok(3),
        "Fri" | "Friday" => Ok(4),
        "Sat" | "Saturday" => Ok(5),
        "Sun" | "Sunday" => Ok(6),
        _ => Err(SettingsError::UnknownWeekdayName {
            name: name.to_string(),
        }),
    }
}

/// The singleton accounting configuration.
///
/// Passed explicitly into every accounting call; there is no global settings
/// state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub device_id: String,
    /// First day of the reporting period.
    pub start_date: NaiveDate,
    /// Last day of the reporting period (inclusive).
    pub end_date: NaiveDate,
    pub working_days: WorkingDays,
    pub daily_required_minutes: u32,
}

impl Settings {
    /// Creates settings after validating the invariants.
    pub fn new(
        device_id: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        working_days: WorkingDays,
        daily_required_minutes: u32,
    ) -> Result<Self, SettingsError> {
        let device_id = device_id.into();
        if device_id.is_empty() {
            return Err(SettingsError::EmptyDeviceId);
        }
        if start_date > end_date {
            return Err(SettingsError::DateRange {
                start: start_date,
                end: end_date,
            });
        }
        if daily_required_minutes == 0 {
            return Err(SettingsError::ZeroDailyRequirement);
        }
        Ok(Self {
            device_id,
            start_date,
            end_date,
            working_days,
            daily_required_minutes,
        })
    }

    /// Default settings covering the calendar month of `today`:
    /// Monday-Friday workdays, eight required hours.
    ///
    /// Used by write paths to self-heal a missing settings row.
    pub fn default_for_month(
        device_id: impl Into<String>,
        today: NaiveDate,
    ) -> Result<Self, SettingsError> {
        let (start, end) = month_bounds(today.year(), today.month()).ok_or(
            SettingsError::DateRange {
                start: today,
                end: today,
            },
        )?;
        Self::new(
            device_id,
            start,
            end,
            WorkingDays::default(),
            DEFAULT_DAILY_REQUIRED_MINUTES,
        )
    }

    /// The requirement expressed in hours, for API compatibility.
    #[must_use]
    pub fn daily_working_hours(&self) -> f64 {
        f64::from(self.daily_required_minutes) / 60.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parse_json_array() {
        let days = WorkingDays::parse("[0,1,2,3,4]").unwrap();
        assert_eq!(days, WorkingDays::default());
    }

    #[test]
    fn parse_legacy_day_names() {
        let days = WorkingDays::parse("Mon,Tue,Wed,Thu,Fri").unwrap();
        assert_eq!(days, WorkingDays::default());
    }

    #[test]
    fn parse_long_day_names() {
        let days = WorkingDays::parse("Saturday,Sunday").unwrap();
        assert_eq!(days.to_canonical(), "[5,6]");
    }

    #[test]
    fn parse_numeric_csv() {
        let days = WorkingDays::parse("5, 6, 0").unwrap();
        assert_eq!(days.to_canonical(), "[0,5,6]");
    }

    #[test]
    fn parse_empty_is_empty_set() {
        let days = WorkingDays::parse("").unwrap();
        assert!(days.is_empty());
    }

    #[test]
    fn parse_rejects_unknown_names() {
        assert!(matches!(
            WorkingDays::parse("Mon,Funday"),
            Err(SettingsError::UnknownWeekdayName { .. })
        ));
    }

    #[test]
    fn parse_rejects_out_of_range_index() {
        assert!(matches!(
            WorkingDays::parse("[0,7]"),
            Err(SettingsError::InvalidWeekday { index: 7 })
        ));
    }

    #[test]
    fn canonical_form_is_sorted_and_deduplicated() {
        let days = WorkingDays::from_indices([4, 0, 4, 2]).unwrap();
        assert_eq!(days.to_canonical(), "[0,2,4]");
    }

    #[test]
    fn classify_workday_and_weekend() {
        let days = WorkingDays::default();
        // 2024-06-03 is a Monday, 2024-06-08 a Saturday
        assert_eq!(days.classify(date(2024, 6, 3)), DayCategory::Workday);
        assert_eq!(days.classify(date(2024, 6, 8)), DayCategory::Weekend);
    }

    #[test]
    fn classify_with_empty_set_is_always_weekend() {
        let days = WorkingDays::parse("").unwrap();
        assert_eq!(days.classify(date(2024, 6, 3)), DayCategory::Weekend);
    }

    #[test]
    fn weekday_index_is_monday_based() {
        assert_eq!(weekday_index(date(2024, 6, 3)), 0); // Monday
        assert_eq!(weekday_index(date(2024, 6, 9)), 6); // Sunday
    }

    #[test]
    fn settings_validation() {
        let days = WorkingDays::default();
        assert!(matches!(
            Settings::new("", date(2024, 1, 1), date(2024, 12, 31), days.clone(), 480),
            Err(SettingsError::EmptyDeviceId)
        ));
        assert!(matches!(
            Settings::new("dev", date(2024, 2, 1), date(2024, 1, 1), days.clone(), 480),
            Err(SettingsError::DateRange { .. })
        ));
        assert!(matches!(
            Settings::new("dev", date(2024, 1, 1), date(2024, 12, 31), days, 0),
            Err(SettingsError::ZeroDailyRequirement)
        ));
    }

    #[test]
    fn default_for_month_spans_the_calendar_month() {
        let settings = Settings::default_for_month("dev", date(2024, 6, 15)).unwrap();
        assert_eq!(settings.start_date, date(2024, 6, 1));
        assert_eq!(settings.end_date, date(2024, 6, 30));
        assert_eq!(settings.daily_required_minutes, 480);
    }

    #[test]
    fn daily_working_hours_conversion() {
        let settings =
            Settings::new("dev", date(2024, 1, 1), date(2024, 1, 31), WorkingDays::default(), 450)
                .unwrap();
        assert!((settings.daily_working_hours() - 7.5).abs() < f64::EPSILON);
    }
}
