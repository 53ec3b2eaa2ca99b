//! Period keys: the (month, year) buckets balances roll over between

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::DateRange;

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Errors raised while parsing a period label
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("unknown month label: {0}")]
    UnknownMonth(String),

    #[error("invalid period: {0}")]
    InvalidFormat(String),
}

/// Canonical period identifier. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeriodKey {
    year: i32,
    /// 1-based month number
    month: u32,
}

impl PeriodKey {
    /// Build a key from a year and a 1-based month. Returns `None` for months
    /// outside 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The period a calendar date belongs to, using the date as given
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Rebuild a key from its stored form (short month label plus year)
    pub fn from_label(label: &str, year: i32) -> Result<Self, PeriodError> {
        let month = MONTH_LABELS
            .iter()
            .position(|m| m.eq_ignore_ascii_case(label.trim()))
            .ok_or_else(|| PeriodError::UnknownMonth(label.to_string()))?;

        Ok(Self {
            year,
            month: month as u32 + 1,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Short English month label ("Jan" .. "Dec")
    pub fn month_label(&self) -> &'static str {
        MONTH_LABELS[(self.month - 1) as usize]
    }

    /// The immediately preceding period; January rolls back to December of
    /// the previous year.
    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        // month is always 1..=12 and day 1 exists in every month
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    /// First to last calendar day of the month, inclusive
    pub fn date_range(&self) -> DateRange {
        DateRange::new(self.first_day(), self.last_day())
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.month_label(), self.year)
    }
}

/// Parses the display form, e.g. `Jan-2024`
impl FromStr for PeriodKey {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (label, year) = s
            .split_once('-')
            .ok_or_else(|| PeriodError::InvalidFormat(s.to_string()))?;
        let year = year
            .trim()
            .parse::<i32>()
            .map_err(|_| PeriodError::InvalidFormat(s.to_string()))?;
        Self::from_label(label, year)
    }
}

#[derive(Serialize, Deserialize)]
struct PeriodRepr {
    month: String,
    year: i32,
}

impl Serialize for PeriodKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PeriodRepr {
            month: self.month_label().to_string(),
            year: self.year,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PeriodKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = PeriodRepr::deserialize(deserializer)?;
        Self::from_label(&repr.month, repr.year).map_err(serde::de::Error::custom)
    }
}
