use crate::error::{InventoryReportError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A calendar month, ordered chronologically and rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(InventoryReportError::InvalidMonth(format!(
                "{:04}-{:02}",
                year, month
            )));
        }
        Ok(Self { year, month })
    }

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
}

impl From<NaiveDate> for YearMonth {
    fn from(date: NaiveDate) -> Self {
        Self::from_date(date)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = InventoryReportError;

    fn from_str(s: &str) -> Result<Self> {
        parse_month_string(s)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_month_string(&raw).map_err(serde::de::Error::custom)
    }
}

/// Parses a month string in the format "YYYY-MM".
pub fn parse_month_string(month: &str) -> Result<YearMonth> {
    let trimmed = month.trim();
    let start_str = format!("{}-01", trimmed);
    let start_date = NaiveDate::parse_from_str(&start_str, "%Y-%m-%d")
        .map_err(|_| InventoryReportError::InvalidMonth(trimmed.to_string()))?;

    Ok(YearMonth::from_date(start_date))
}

/// Interprets loosely typed numeric text, falling back to zero for anything that
/// is not a finite number.
pub fn parse_numeric_or_zero(text: &str) -> f64 {
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Renders a quantity with the shortest representation (`5`, `2.5`, `-3`).
pub fn format_quantity(value: f64) -> String {
    if value == 0.0 {
        // Avoids "-0" leaking into exports.
        return "0".to_string();
    }
    format!("{}", value)
}
