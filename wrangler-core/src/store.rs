use std::fmt;
use std::ops::Index;
use std::slice;
use std::sync::Arc;

use super::{ColumnSchema, Entry, EntryKind, SchemaError};

/// One transaction: a fixed-length, immutable sequence of entries.
///
/// Cloning a row shares its entries.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Row(Arc<[Entry]>);

impl Row {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Entry>,
    {
        Row(entries.into_iter().map(Into::<Entry>::into).collect())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.0.get(index)
    }

    pub fn iter(&self) -> slice::Iter<'_, Entry> {
        self.0.iter()
    }

    /// A new row with the entry at `index` replaced.
    pub fn with(&self, index: usize, entry: Entry) -> Row {
        let mut entries = self.0.to_vec();
        entries[index] = entry;
        Row(entries.into())
    }

    /// A new row with `entry` appended.
    pub fn extended(&self, entry: Entry) -> Row {
        let mut entries = self.0.to_vec();
        entries.push(entry);
        Row(entries.into())
    }
}

impl Index<usize> for Row {
    type Output = Entry;

    fn index(&self, index: usize) -> &Entry {
        &self.0[index]
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a Entry;
    type IntoIter = slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for entry in self.iter() {
            if !first {
                f.write_str("\t")?;
            }
            write!(f, "{}", entry)?;
            first = false;
        }
        Ok(())
    }
}

/// A frozen copy of a store's rows, unaffected by later ingests.
pub type Snapshot = Arc<[Row]>;

/// An append-only table of rows that all match one [`ColumnSchema`].
///
/// Every stage of processing produces a new store rather than editing an
/// old one.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionStore {
    schema: ColumnSchema,
    rows: Vec<Row>,
}

impl TransactionStore {
    pub fn new(schema: ColumnSchema) -> Self {
        TransactionStore {
            schema,
            rows: Vec::new(),
        }
    }

    /// A store over [`ColumnSchema::base`].
    pub fn base() -> Self {
        TransactionStore::new(ColumnSchema::base())
    }

    pub fn columns(&self) -> &ColumnSchema {
        &self.schema
    }

    /// Validates the entries against the schema and appends them as a new row.
    pub fn ingest_row<I>(&mut self, entries: I) -> Result<(), SchemaError>
    where
        I: IntoIterator,
        I::Item: Into<Entry>,
    {
        self.ingest(Row::new(entries))
    }

    pub fn ingest(&mut self, row: Row) -> Result<(), SchemaError> {
        self.validate(&row)?;
        self.rows.push(row);
        Ok(())
    }

    fn validate(&self, row: &Row) -> Result<(), SchemaError> {
        if row.len() != self.schema.len() {
            return Err(SchemaError::Arity {
                expected: self.schema.len(),
                found: row.len(),
            });
        }
        for (entry, (column, expected)) in row.iter().zip(self.schema.iter()) {
            if entry.kind() != expected {
                return Err(SchemaError::KindMismatch {
                    column: column.to_string(),
                    expected,
                    found: entry.kind(),
                });
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn view_snapshot(&self) -> Snapshot {
        self.rows.iter().cloned().collect()
    }

    /// Looks up the entry of `row` in the column called `name`.
    pub fn field<'r>(&self, row: &'r Row, name: &str) -> Result<&'r Entry, SchemaError> {
        let index = self.schema.require(name)?;
        row.get(index).ok_or(SchemaError::Arity {
            expected: self.schema.len(),
            found: row.len(),
        })
    }

    /// Joins several stores sharing one schema, keeping argument order.
    pub fn concat<I>(schema: ColumnSchema, stores: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = TransactionStore>,
    {
        let mut result = TransactionStore::new(schema);
        for store in stores {
            if store.schema != result.schema {
                return Err(SchemaError::SchemaMismatch);
            }
            result.rows.extend(store.rows);
        }
        Ok(result)
    }

    /// A new store with a trailing column, filled with `default` in every row.
    pub fn widen(&self, column: &str, default: Entry) -> Result<Self, SchemaError> {
        let kind: EntryKind = default.kind();
        let schema = self.schema.with_column(column, kind)?;
        let rows = self
            .rows
            .iter()
            .map(|row| row.extended(default.clone()))
            .collect();
        Ok(TransactionStore { schema, rows })
    }
}

impl<'a> IntoIterator for &'a TransactionStore {
    type Item = &'a Row;
    type IntoIter = slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
