use std::fmt;
use std::str::FromStr;

#[cfg(feature = "chrono")]
use chrono::{Datelike, NaiveDate};

use super::ValueError;

/// A calendar day as reported by a bank.
///
/// Ordering is lexicographic over (year, month, day). The parts are not
/// range checked; banks are trusted to hand out real days.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Date {
    year: i32,
    month: u32,
    day: u32,
}

impl Date {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Date { year, month, day }
    }

    /// Builds a date from textual parts, failing when one of them is not an integer.
    pub fn from_parts(year: &str, month: &str, day: &str) -> Result<Self, ValueError> {
        let invalid = || ValueError::InvalidDate {
            input: format!("{}/{}/{}", year, month, day),
        };
        Ok(Date {
            year: year.trim().parse().map_err(|_| invalid())?,
            month: month.trim().parse().map_err(|_| invalid())?,
            day: day.trim().parse().map_err(|_| invalid())?,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}/{:02}/{:02}", self.year, self.month, self.day)
    }
}

/// Parses the `YYYY/MM/DD` form used in rules files.
impl FromStr for Date {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(year), Some(month), Some(day), None) => Date::from_parts(year, month, day),
            _ => Err(ValueError::InvalidDate {
                input: s.to_string(),
            }),
        }
    }
}

#[cfg(feature = "chrono")]
impl From<NaiveDate> for Date {
    fn from(d: NaiveDate) -> Self {
        Date::new(d.year(), d.month(), d.day())
    }
}

#[cfg(feature = "chrono")]
#[test]
fn test_date_from_chrono() {
    assert_eq!(
        Date::from(chrono::NaiveDate::from_ymd_opt(2020, 5, 5).unwrap()),
        Date::new(2020, 5, 5)
    );
}
