//! # Month keys
//! Every record belongs to exactly one calendar month, and the month key is the only thing records
//! are partitioned by. Its text form is written to and queried from the store, so there is exactly
//! one way to spell it: `{year}-{month}` with the month *not* zero-padded (`2025-3`, `2025-11`).
//! Parsing refuses other spellings rather than silently producing a key that matches nothing.

use std::{fmt, ops::RangeInclusive, str::FromStr};

use chrono::{Datelike, NaiveDate};

use crate::ValidationError;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(into = "String", try_from = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

/// Four-digit years only, so every key has a date on both sides of it and spells without a sign.
const YEARS: RangeInclusive<i32> = 1..=9999;

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        if !YEARS.contains(&year) || !(1..=12).contains(&month) {
            return Err(ValidationError::InvalidMonthKey(format!("{year}-{month}")));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: impl Datelike) -> Result<Self, ValidationError> {
        Self::new(date.year(), date.month())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// 1-based.
    pub fn month(&self) -> u32 {
        self.month
    }

    /// Stays put on the last supported month.
    pub fn next(&self) -> Self {
        if self.month == 12 && self.year == *YEARS.end() {
            *self
        } else if self.month == 12 {
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

    /// Stays put on the first supported month.
    pub fn prev(&self) -> Self {
        if self.month == 1 && self.year == *YEARS.start() {
            *self
        } else if self.month == 1 {
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

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn days_in_month(&self) -> u32 {
        // in range for every key `new` accepts, December 9999 included
        let (year, month) = match self.month {
            12 => (self.year + 1, 1),
            month => (self.year, month + 1),
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|first_of_next| first_of_next.pred_opt())
            .map(|last| last.day())
            .unwrap_or(31)
    }

    pub fn days(&self) -> RangeInclusive<u32> {
        1..=self.days_in_month()
    }

    pub fn check_day(&self, day: u32) -> Result<u32, ValidationError> {
        let days_in_month = self.days_in_month();
        if (1..=days_in_month).contains(&day) {
            Ok(day)
        } else {
            Err(ValidationError::DayOutOfRange { day, days_in_month })
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidMonthKey(s.to_string());

        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        let is_number = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !is_number(year) || !is_number(month) || month.starts_with('0') {
            return Err(invalid());
        }

        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        let key = Self::new(year, month).map_err(|_| invalid())?;

        // `2025-3` round-trips; anything else would be written under a different key
        if key.to_string() != s {
            return Err(invalid());
        }
        Ok(key)
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for MonthKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_same_month_same_key() {
        let early = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 3, 31, 23, 59, 59).unwrap();
        assert_eq!(MonthKey::from_date(early).unwrap(), MonthKey::from_date(late).unwrap());
        assert_eq!(
            MonthKey::from_date(early).unwrap().to_string(),
            MonthKey::from_date(late).unwrap().to_string()
        );
    }

    #[test]
    fn test_different_months_different_keys() {
        let march = MonthKey::from_date(NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()).unwrap();
        let february = MonthKey::from_date(NaiveDate::from_ymd_opt(2025, 2, 14).unwrap()).unwrap();
        let next_march = MonthKey::from_date(NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()).unwrap();
        assert_ne!(march.to_string(), february.to_string());
        assert_ne!(march.to_string(), next_march.to_string());
    }

    #[test]
    fn test_canonical_spelling() {
        assert_eq!(MonthKey::new(2025, 3).unwrap().to_string(), "2025-3");
        assert_eq!(MonthKey::new(2025, 11).unwrap().to_string(), "2025-11");
        assert_eq!("2025-11".parse::<MonthKey>(), MonthKey::new(2025, 11));
    }

    #[test]
    fn test_rejects_drifted_spellings() {
        for bad in ["2025-03", "2025-13", "2025-0", "2025", "-3", "2025-3-1", " 2025-3", "20x5-3"] {
            assert!(bad.parse::<MonthKey>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_year_rollover() {
        let december = MonthKey::new(2024, 12).unwrap();
        assert_eq!(december.next(), MonthKey::new(2025, 1).unwrap());
        assert_eq!(december.next().prev(), december);
    }

    #[test]
    fn test_years_stay_four_digits() {
        for bad in ["2147483647-12", "300000-2", "10000-1", "0-5", "00-5"] {
            assert!(bad.parse::<MonthKey>().is_err(), "{bad} should not parse");
        }
        assert!(MonthKey::new(0, 1).is_err());
        assert!(MonthKey::from_date(NaiveDate::from_ymd_opt(12000, 1, 1).unwrap()).is_err());

        let last = MonthKey::new(9999, 12).unwrap();
        assert_eq!(last.next(), last);
        assert_eq!(last.days_in_month(), 31);
        assert_eq!(last.check_day(31), Ok(31));
        let first = MonthKey::new(1, 1).unwrap();
        assert_eq!(first.prev(), first);
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(MonthKey::new(2024, 2).unwrap().days_in_month(), 29);
        assert_eq!(MonthKey::new(2025, 2).unwrap().days_in_month(), 28);
        assert_eq!(MonthKey::new(2025, 4).unwrap().days_in_month(), 30);
        assert_eq!(MonthKey::new(2025, 12).unwrap().days_in_month(), 31);
    }

    #[test]
    fn test_check_day() {
        let april = MonthKey::new(2025, 4).unwrap();
        assert_eq!(april.check_day(30), Ok(30));
        assert_eq!(
            april.check_day(31),
            Err(ValidationError::DayOutOfRange {
                day: 31,
                days_in_month: 30
            })
        );
        assert!(april.check_day(0).is_err());
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let key = MonthKey::new(2025, 3).unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"2025-3\"");
        assert_eq!(serde_json::from_str::<MonthKey>("\"2025-3\"").unwrap(), key);
        assert!(serde_json::from_str::<MonthKey>("\"2025-03\"").is_err());
    }
}
