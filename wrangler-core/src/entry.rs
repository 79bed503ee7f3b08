use std::cmp::Ordering;
use std::fmt;

use regex::Regex;

use super::{Date, Dollars, ValueError};

/// The kind of value a column holds.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum EntryKind {
    Date,
    String,
    Dollars,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryKind::Date => "Date",
            EntryKind::String => "String",
            EntryKind::Dollars => "Dollars",
        };
        f.write_str(name)
    }
}

/// A single immutable field of a transaction.
///
/// Entries of different kinds are never equal and have no ordering between
/// them: `partial_cmp` gives `None` and [`Entry::try_cmp`] an error.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Entry {
    Date(Date),
    String(String),
    Dollars(Dollars),
}

impl Entry {
    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Date(_) => EntryKind::Date,
            Entry::String(_) => EntryKind::String,
            Entry::Dollars(_) => EntryKind::Dollars,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Entry::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<Date> {
        match self {
            Entry::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_dollars(&self) -> Option<Dollars> {
        match self {
            Entry::Dollars(d) => Some(*d),
            _ => None,
        }
    }

    pub fn try_cmp(&self, other: &Entry) -> Result<Ordering, ValueError> {
        self.partial_cmp(other).ok_or(ValueError::KindMismatch {
            left: self.kind(),
            right: other.kind(),
        })
    }

    /// Regex search of `pattern` anywhere in a String entry.
    pub fn matches(&self, pattern: &str) -> Result<bool, ValueError> {
        let re = Regex::new(pattern).map_err(|e| ValueError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        self.matches_regex(&re)
    }

    pub fn matches_regex(&self, re: &Regex) -> Result<bool, ValueError> {
        match self {
            Entry::String(s) => Ok(re.is_match(s)),
            other => Err(ValueError::KindMismatch {
                left: other.kind(),
                right: EntryKind::String,
            }),
        }
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Entry) -> Option<Ordering> {
        match (self, other) {
            (Entry::Date(a), Entry::Date(b)) => Some(a.cmp(b)),
            (Entry::String(a), Entry::String(b)) => Some(a.cmp(b)),
            (Entry::Dollars(a), Entry::Dollars(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Date(d) => write!(f, "{}", d),
            Entry::String(s) => write!(f, "{}", s),
            Entry::Dollars(d) => write!(f, "{}", d),
        }
    }
}

impl From<Date> for Entry {
    fn from(d: Date) -> Self {
        Entry::Date(d)
    }
}

impl From<Dollars> for Entry {
    fn from(d: Dollars) -> Self {
        Entry::Dollars(d)
    }
}

impl From<String> for Entry {
    fn from(s: String) -> Self {
        Entry::String(s)
    }
}

impl<'a> From<&'a str> for Entry {
    fn from(s: &'a str) -> Self {
        Entry::String(s.to_string())
    }
}
