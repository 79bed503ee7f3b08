use std::collections::HashMap;

use lazy_static::lazy_static;

use super::{EntryKind, SchemaError};

pub const BANK: &str = "bank";
pub const FROM: &str = "from";
pub const TO: &str = "to";
pub const DATE: &str = "date";
pub const DESCRIPTION: &str = "description";
pub const AMOUNT: &str = "amount";
pub const CATEGORY: &str = "category";

lazy_static! {
    static ref BASE: ColumnSchema = ColumnSchema::from_unique(vec![
        (BANK.to_string(), EntryKind::String),
        (FROM.to_string(), EntryKind::String),
        (TO.to_string(), EntryKind::String),
        (DATE.to_string(), EntryKind::Date),
        (DESCRIPTION.to_string(), EntryKind::String),
        (AMOUNT.to_string(), EntryKind::Dollars),
    ]);
    static ref CATEGORIZED: ColumnSchema = {
        let mut columns = BASE.columns.clone();
        columns.push((CATEGORY.to_string(), EntryKind::String));
        ColumnSchema::from_unique(columns)
    };
}

/// Ordered column names and the kind of entry each holds.
///
/// Column order defines the positional layout of every row governed by the
/// schema.
#[derive(Clone, Debug)]
pub struct ColumnSchema {
    columns: Vec<(String, EntryKind)>,
    index: HashMap<String, usize>,
}

impl PartialEq for ColumnSchema {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl Eq for ColumnSchema {}

impl ColumnSchema {
    pub fn new<I, S>(columns: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (S, EntryKind)>,
        S: Into<String>,
    {
        let columns: Vec<(String, EntryKind)> = columns
            .into_iter()
            .map(|(name, kind)| (name.into(), kind))
            .collect();
        let mut index = HashMap::with_capacity(columns.len());
        for (i, (name, _)) in columns.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateColumn(name.clone()));
            }
        }
        Ok(ColumnSchema { columns, index })
    }

    // Only for the static schemas above, whose names are known to be unique.
    fn from_unique(columns: Vec<(String, EntryKind)>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.clone(), i))
            .collect();
        ColumnSchema { columns, index }
    }

    /// `bank, from, to, date, description, amount`.
    pub fn base() -> Self {
        BASE.clone()
    }

    /// The base columns followed by `category`.
    pub fn categorized() -> Self {
        CATEGORIZED.clone()
    }

    /// A copy of this schema with one more trailing column.
    pub fn with_column<S: Into<String>>(&self, name: S, kind: EntryKind) -> Result<Self, SchemaError> {
        let mut columns = self.columns.clone();
        columns.push((name.into(), kind));
        ColumnSchema::new(columns)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, EntryKind)> {
        self.columns.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn kind_of(&self, name: &str) -> Option<EntryKind> {
        self.index_of(name).map(|i| self.columns[i].1)
    }

    /// Like [`ColumnSchema::index_of`], failing for a missing column.
    pub fn require(&self, name: &str) -> Result<usize, SchemaError> {
        self.index_of(name)
            .ok_or_else(|| SchemaError::UnknownColumn(name.to_string()))
    }
}
