use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::CampaignError;

/// A calendar month at year+month granularity, the unit of payout allocation.
///
/// Internally anchored on the first day of the month so ordering and range
/// checks reduce to plain date comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PayoutMonth(NaiveDate);

impl PayoutMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date - Duration::days(date.day0() as i64))
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn first_day(self) -> NaiveDate {
        self.0
    }

    pub fn plus_months(self, months: u32) -> Option<Self> {
        self.0.checked_add_months(Months::new(months)).map(Self)
    }

    pub fn next(self) -> Option<Self> {
        self.plus_months(1)
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        Self::from_date(date) == self
    }

    /// Whole months from `self` to `later`; negative when `later` precedes `self`.
    pub fn months_until(self, later: PayoutMonth) -> i64 {
        let from = self.year() as i64 * 12 + self.month() as i64;
        let to = later.year() as i64 * 12 + later.month() as i64;
        to - from
    }
}

impl fmt::Display for PayoutMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for PayoutMonth {
    type Err = CampaignError;

    /// Accepts `YYYY-MM` as well as the ISO dates and timestamps the REST API stores.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || CampaignError::InvalidInput(format!("allocated_month `{raw}`"));
        let trimmed = raw.trim();
        let head = trimmed.get(..7).ok_or_else(invalid)?;
        let (year, month) = head.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        PayoutMonth::new(year, month).ok_or_else(invalid)
    }
}

impl TryFrom<String> for PayoutMonth {
    type Error = CampaignError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PayoutMonth> for String {
    fn from(value: PayoutMonth) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_month_and_iso_timestamps() {
        let march = PayoutMonth::new(2025, 3).unwrap();
        assert_eq!("2025-03".parse::<PayoutMonth>().unwrap(), march);
        assert_eq!("2025-03-01T00:00:00.000Z".parse::<PayoutMonth>().unwrap(), march);
        assert!("2025-13".parse::<PayoutMonth>().is_err());
        assert!("March".parse::<PayoutMonth>().is_err());
    }

    #[test]
    fn plus_months_rolls_over_years() {
        let november = PayoutMonth::new(2025, 11).unwrap();
        assert_eq!(november.plus_months(3), PayoutMonth::new(2026, 2));
        assert_eq!(november.months_until(PayoutMonth::new(2026, 2).unwrap()), 3);
    }

    #[test]
    fn from_date_drops_the_day() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let month = PayoutMonth::from_date(date);
        assert_eq!(month.first_day(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert!(month.contains(date));
        assert_eq!(month.to_string(), "2024-02");
    }
}
