use serde_json::{json, Value};
use std::{io, io::Write};
use thiserror::Error;
use wrangler_core::{ColumnSchema, Entry, Row, TransactionStore};


/// Writes a store as tab-separated text: the column names, then one line per row.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, Debug)]
pub struct TableRenderer {}

impl TableRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn render<W: Write>(w: &mut W, store: &TransactionStore) -> Result<(), RenderError> {
    TableRenderer::default().render(store, w)
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("an io error occurred")]
    Io(#[from] io::Error),
    #[error("could not serialize the transactions")]
    Json(#[from] serde_json::Error),
}

pub trait Renderer<T, W: Write> {
    type Error;
    fn render(&self, renderable: T, write: &mut W) -> Result<(), Self::Error>;
}

impl<'a, W: Write> Renderer<&'a TransactionStore, W> for TableRenderer {
    type Error = RenderError;
    fn render(&self, store: &'a TransactionStore, write: &mut W) -> Result<(), Self::Error> {
        self.render(store.columns(), write)?;
        for row in store {
            self.render(row, write)?;
        }
        Ok(())
    }
}

impl<'a, W: Write> Renderer<&'a ColumnSchema, W> for TableRenderer {
    type Error = RenderError;
    fn render(&self, schema: &'a ColumnSchema, write: &mut W) -> Result<(), Self::Error> {
        let names: Vec<&str> = schema.names().collect();
        writeln!(write, "{}", names.join("\t"))?;
        Ok(())
    }
}

impl<'a, W: Write> Renderer<&'a Row, W> for TableRenderer {
    type Error = RenderError;
    fn render(&self, row: &'a Row, write: &mut W) -> Result<(), Self::Error> {
        for (i, entry) in row.iter().enumerate() {
            if i > 0 {
                write!(write, "\t")?;
            }
            self.render(entry, write)?;
        }
        writeln!(write)?;
        Ok(())
    }
}

impl<'a, W: Write> Renderer<&'a Entry, W> for TableRenderer {
    type Error = RenderError;
    fn render(&self, entry: &'a Entry, write: &mut W) -> Result<(), Self::Error> {
        match entry {
            Entry::Date(date) => write!(write, "{}", date)?,
            Entry::Dollars(dollars) => write!(write, "{}", dollars)?,
            // Tabs and newlines would break the table apart.
            Entry::String(s) => write!(write, "{}", s.replace(|c: char| c == '\t' || c == '\n', " "))?,
        }
        Ok(())
    }
}

fn json_entry(entry: &Entry) -> Value {
    match entry {
        Entry::Date(date) => Value::String(date.to_string()),
        Entry::String(s) => Value::String(s.clone()),
        Entry::Dollars(dollars) => Value::String(dollars.amount().to_string()),
    }
}

/// The data behind a spending report, as a JSON document:
/// `{"columns": [..], "transactions": [[..], ..], "accounts": [..]}`.
///
/// Every entry becomes a string; dates as `YYYY/MM/DD`, dollars without the
/// `$` sign.
pub fn data_json<'a, I>(store: &TransactionStore, accounts: I) -> Result<String, RenderError>
where
    I: IntoIterator<Item = &'a str>,
{
    let transactions: Vec<Vec<Value>> = store
        .iter()
        .map(|row| row.iter().map(json_entry).collect())
        .collect();
    let document = json!({
        "columns": store.columns().names().collect::<Vec<_>>(),
        "transactions": transactions,
        "accounts": accounts.into_iter().collect::<Vec<_>>(),
    });
    Ok(serde_json::to_string(&document)?)
}
