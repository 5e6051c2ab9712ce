//! Calendar months and timestamp parsing

use crate::config::CalendarConfig;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Datetime layouts accepted for transaction timestamps
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Date-only layouts accepted for transaction timestamps
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// A calendar month, ordered chronologically and printed as `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Create a month, rejecting month numbers outside 1..=12
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ForecastError::InvalidParameter(format!(
                "Month must be in 1..=12, got {}",
                month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn from_date<D: Datelike>(date: &D) -> Self {
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

    /// The month immediately following this one
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ForecastError::InvalidParameter(format!("Invalid year-month {:?}", s));

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;

        Self::new(year, month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = ForecastError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

/// Derive the calendar month of a transaction timestamp
///
/// Returns `None` when the text matches none of the accepted layouts.
pub fn parse_year_month(timestamp: &str) -> Option<YearMonth> {
    let text = timestamp.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(YearMonth::from_date(&dt));
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(YearMonth::from_date(&dt));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(YearMonth::from_date(&date));
        }
    }

    text.parse::<YearMonth>().ok()
}

/// Fixed month sets behind the holiday and summer flags
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonCalendar {
    holiday_months: Vec<u32>,
    summer_months: Vec<u32>,
}

impl SeasonCalendar {
    pub fn new(holiday_months: Vec<u32>, summer_months: Vec<u32>) -> Self {
        Self {
            holiday_months,
            summer_months,
        }
    }

    pub fn from_config(config: &CalendarConfig) -> Self {
        Self::new(config.holiday_months.clone(), config.summer_months.clone())
    }

    pub fn is_holiday(&self, month: YearMonth) -> bool {
        self.holiday_months.contains(&month.month())
    }

    pub fn is_summer(&self, month: YearMonth) -> bool {
        self.summer_months.contains(&month.month())
    }
}

impl Default for SeasonCalendar {
    fn default() -> Self {
        Self::from_config(&CalendarConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    #[test]
    fn test_parse_year_month_layouts() {
        let expected = Some(ym(2023, 3));
        assert_eq!(parse_year_month("2023-03-15 10:22:01"), expected);
        assert_eq!(parse_year_month("2023-03-15T10:22:01.250"), expected);
        assert_eq!(parse_year_month("2023-03-15T10:22:01+05:45"), expected);
        assert_eq!(parse_year_month("2023-03-15"), expected);
        assert_eq!(parse_year_month("2023/03/15"), expected);
        assert_eq!(parse_year_month(" 2023-03 "), expected);
    }

    #[test]
    fn test_parse_year_month_rejects_garbage() {
        assert_eq!(parse_year_month(""), None);
        assert_eq!(parse_year_month("yesterday"), None);
        assert_eq!(parse_year_month("2023-13"), None);
        assert_eq!(parse_year_month("2023-02-30"), None);
    }

    #[test]
    fn test_year_month_order_and_next() {
        assert!(ym(2022, 12) < ym(2023, 1));
        assert_eq!(ym(2022, 12).next(), ym(2023, 1));
        assert_eq!(ym(2023, 4).next(), ym(2023, 5));
        assert_eq!(ym(2023, 4).to_string(), "2023-04");
    }

    #[test]
    fn test_season_calendar_defaults() {
        let calendar = SeasonCalendar::default();
        assert!(calendar.is_holiday(ym(2023, 12)));
        assert!(!calendar.is_holiday(ym(2023, 7)));
        assert!(calendar.is_summer(ym(2023, 7)));
        assert!(!calendar.is_summer(ym(2023, 1)));
    }
}
