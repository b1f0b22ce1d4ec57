//! Calendar month identifying one forecast/actual observation

use crate::error::{EvalError, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Formats accepted for full timestamps; only the month survives.
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// A calendar month, ordered chronologically and displayed as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// Create a period, validating the month number.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(EvalError::InvalidParameter(format!(
                "month must be between 1 and 12, got {}",
                month
            )));
        }
        Ok(Self { year, month })
    }

    /// The month containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month.
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = EvalError;

    /// Accepts `YYYY-MM`, `YYYY-MM-DD` and full timestamps.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EvalError::ParseError("empty period".to_string()));
        }

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self::from_date(date));
        }

        for format in DATETIME_FORMATS {
            if let Ok(datetime) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(Self::from_date(datetime.date()));
            }
        }

        let date = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d")
            .map_err(|e| EvalError::ParseError(format!("invalid period '{}': {}", s, e)))?;
        Ok(Self::from_date(date))
    }
}

impl TryFrom<String> for Period {
    type Error = EvalError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}
