use thiserror::Error;

use super::EntryKind;

/// Failure to build or compare a single entry.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum ValueError {
    #[error("dollar amounts cannot be negative, got {0}")]
    NegativeDollars(String),
    #[error("could not parse `{input}` as a decimal: {message}")]
    InvalidDecimal { input: String, message: String },
    #[error("could not parse `{input}` as a date")]
    InvalidDate { input: String },
    #[error("cannot compare a {left} entry with a {right} entry")]
    KindMismatch { left: EntryKind, right: EntryKind },
    #[error("invalid pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// A row or schema that does not line up with the columns it is used against.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum SchemaError {
    #[error("tried to ingest a row with {found} entries, expected {expected}")]
    Arity { expected: usize, found: usize },
    #[error("tried to ingest a {found} entry into column `{column}`, expected {expected}")]
    KindMismatch {
        column: String,
        expected: EntryKind,
        found: EntryKind,
    },
    #[error("column `{0}` appears more than once")]
    DuplicateColumn(String),
    #[error("no column named `{0}`")]
    UnknownColumn(String),
    #[error("cannot combine stores with different columns")]
    SchemaMismatch,
}
