//! Data representation for bank-wrangler: typed entries, column schemas and
//! the append-only store that transactions are ingested into.

pub use balance::{add_balance_correction, compute_balance};
pub use date::Date;
pub use dollars::Dollars;
pub use entry::{Entry, EntryKind};
pub use error::{SchemaError, ValueError};
pub use schema::ColumnSchema;
pub use store::{Row, Snapshot, TransactionStore};

pub mod balance;
mod date;
mod dollars;
mod entry;
pub mod error;
pub mod schema;
pub mod store;
