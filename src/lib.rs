//! Aggregate bank transactions from several sources, reconcile the transfers
//! both banks report, and categorize the result with a small rules language.
//!
//! ```ignore
//! let output = Pipeline::builder()
//!     .sources(vec![Fetched::new(bank_a, raw_a), Fetched::new(bank_b, raw_b)])
//!     .first_pass_rules(r#"description ~~ "TRANSFER TO SAV", to = "savings""#)
//!     .category_rules(r#"description ~~ "(?i)grocer", category = "Food""#)
//!     .build()
//!     .run()?;
//! output.render_table(&mut std::io::stdout())?;
//! ```
//!
//! The pieces live in their own crates and are re-exported here:
//! `wrangler-core` (entries, schemas, stores), `wrangler-rules`,
//! `wrangler-dedup` and `wrangler-render`.

use thiserror::Error;

pub use wrangler_core::schema;
pub use wrangler_core::{
    add_balance_correction, compute_balance, ColumnSchema, Date, Dollars, Entry, EntryKind, Row,
    SchemaError, Snapshot, TransactionStore, ValueError,
};
pub use wrangler_dedup::{account_flows, deduplicate, BankAccounts, DedupError};
pub use wrangler_render::{data_json, render, RenderError, Renderer, TableRenderer};
pub use wrangler_rules as rules;
pub use wrangler_rules::{Compilation, CompiledRules, Compiler, Diagnostic, RuleError};

pub use config::{ConfigField, SourceConfig};
pub use pipeline::{Fetched, PassReport, Pipeline, PipelineOutput, UNKNOWN_CATEGORY};
pub use source::{BankSource, SourceError, StaticPayload, StaticSource, StaticTransaction};

pub mod config;
pub mod pipeline;
pub mod source;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Dedup(#[from] DedupError),
    #[error(transparent)]
    Render(#[from] RenderError),
}
