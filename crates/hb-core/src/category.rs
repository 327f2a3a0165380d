//! Day category enum as the single source of truth for classification codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classification of a calendar date.
///
/// Variants are declared in precedence order, so the derived `Ord` is the
/// merge precedence: a stored category is only replaced by one that compares
/// greater than or equal to it. Explicit delete/reset operations are the one
/// exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DayCategory {
    Weekend,
    Workday,
    HalfLeave,
    FullLeave,
    Holiday,
}

impl DayCategory {
    /// Stable string code used for database storage and API payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weekend => "weekend",
            Self::Workday => "workday",
            Self::HalfLeave => "half_leave",
            Self::FullLeave => "full_leave",
            Self::Holiday => "holiday",
        }
    }

    /// Required minutes for a day of this category.
    ///
    /// Half-day leave owes half the daily requirement, rounded down.
    #[must_use]
    pub const fn required_minutes(self, daily_required_minutes: u32) -> u32 {
        match self {
            Self::Workday => daily_required_minutes,
            Self::HalfLeave => daily_required_minutes / 2,
            Self::Weekend | Self::FullLeave | Self::Holiday => 0,
        }
    }

    /// Whether this category is an explicit holiday/leave override.
    #[must_use]
    pub const fn is_override(self) -> bool {
        matches!(self, Self::HalfLeave | Self::FullLeave | Self::Holiday)
    }

    /// Decodes a stored category code, falling back to `Workday`.
    ///
    /// Unknown codes should not occur, but a corrupted row must not poison
    /// aggregation, so they decode to the workday requirement.
    #[must_use]
    pub fn parse_lossy(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| {
            tracing::warn!(code = s, "unknown day category, treating as workday");
            Self::Workday
        })
    }
}

impl fmt::Display for DayCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DayCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekend" => Ok(Self::Weekend),
            "workday" => Ok(Self::Workday),
            "half_leave" => Ok(Self::HalfLeave),
            "full_leave" => Ok(Self::FullLeave),
            "holiday" => Ok(Self::Holiday),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

impl Serialize for DayCategory {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DayCategory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown category codes.
#[derive(Debug, Clone)]
pub struct UnknownCategory(String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown day category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

/// The categories a holiday/leave request may apply to a date range.
///
/// Workday and weekend are resolved from settings, never requested, so the
/// request surface gets its own closed enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideKind {
    HalfLeave,
    FullLeave,
    Holiday,
}

impl OverrideKind {
    /// The ledger category this override stores.
    #[must_use]
    pub const fn category(self) -> DayCategory {
        match self {
            Self::HalfLeave => DayCategory::HalfLeave,
            Self::FullLeave => DayCategory::FullLeave,
            Self::Holiday => DayCategory::Holiday,
        }
    }

    /// Whether this kind is a leave (and so skips days that are already off).
    #[must_use]
    pub const fn is_leave(self) -> bool {
        matches!(self, Self::HalfLeave | Self::FullLeave)
    }

    /// Description stored when the request left it blank.
    #[must_use]
    pub const fn default_description(self) -> &'static str {
        match self {
            Self::HalfLeave => "Leave (half day)",
            Self::FullLeave => "Leave (full day)",
            Self::Holiday => "Holiday",
        }
    }
}

impl FromStr for OverrideKind {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "half_leave" => Ok(Self::HalfLeave),
            "full_leave" => Ok(Self::FullLeave),
            "holiday" => Ok(Self::Holiday),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}
