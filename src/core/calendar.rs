use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, Months, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PlanMonth(NaiveDate);

impl PlanMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    pub fn current() -> Self {
        let today = Local::now().date_naive();
        Self(today.with_day(1).unwrap_or(today))
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    /// Month `n` months after this one. Saturates at chrono's upper date bound.
    pub fn offset(self, n: u32) -> Self {
        self.0
            .checked_add_months(Months::new(n))
            .map(Self)
            .unwrap_or(self)
    }

    pub fn label(self) -> String {
        self.0.format("%Y-%m").to_string()
    }
}

impl fmt::Display for PlanMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for PlanMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (year, month) = trimmed
            .split_once('-')
            .ok_or_else(|| format!("month must be YYYY-MM, got '{trimmed}'"))?;
        let year = year
            .parse::<i32>()
            .map_err(|_| format!("invalid year in '{trimmed}'"))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| format!("invalid month in '{trimmed}'"))?;
        Self::new(year, month).ok_or_else(|| format!("month out of range in '{trimmed}'"))
    }
}

impl Serialize for PlanMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for PlanMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_rolls_over_year_boundary() {
        let start = PlanMonth::new(2024, 11).expect("valid month");
        assert_eq!(start.offset(0).label(), "2024-11");
        assert_eq!(start.offset(1).label(), "2024-12");
        assert_eq!(start.offset(2).label(), "2025-01");
        assert_eq!(start.offset(14).label(), "2026-01");
    }

    #[test]
    fn parses_zero_padded_and_bare_months() {
        assert_eq!("2025-03".parse::<PlanMonth>(), Ok(PlanMonth::new(2025, 3).unwrap()));
        assert_eq!(" 2025-3 ".parse::<PlanMonth>(), Ok(PlanMonth::new(2025, 3).unwrap()));
    }

    #[test]
    fn rejects_malformed_months() {
        assert!("2025".parse::<PlanMonth>().is_err());
        assert!("2025-13".parse::<PlanMonth>().is_err());
        assert!("abcd-01".parse::<PlanMonth>().is_err());
    }

    #[test]
    fn current_month_is_first_of_month() {
        let now = PlanMonth::current();
        assert_eq!(now.offset(0), now);
        assert_eq!(now.label().len(), 7);
    }

    #[test]
    fn serde_uses_label_string() {
        let month = PlanMonth::new(2030, 7).expect("valid month");
        let json = serde_json::to_string(&month).expect("serialize");
        assert_eq!(json, "\"2030-07\"");
        let back: PlanMonth = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, month);
    }
}
