use std::collections::BTreeSet;
use std::io::Write;

use tracing::{debug, info};
use typed_builder::TypedBuilder;
use wrangler_core::schema::{CATEGORY, DESCRIPTION, FROM, TO};
use wrangler_core::{ColumnSchema, Entry, TransactionStore};
use wrangler_dedup::{deduplicate, BankAccounts};
use wrangler_render::{data_json, render};
use wrangler_rules::{Compiler, Diagnostic, RuleError};

use crate::source::{BankSource, SourceError};
use crate::Error;

/// Category given to every transaction no rule classifies.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// A source together with what it fetched.
pub struct Fetched {
    pub source: Box<dyn BankSource>,
    pub raw: Vec<u8>,
}

impl Fetched {
    pub fn new<S: BankSource + 'static>(source: S, raw: Vec<u8>) -> Self {
        Fetched {
            source: Box::new(source),
            raw,
        }
    }

    /// Runs the source's fetch with `config`.
    pub fn fetch<S: BankSource + 'static>(
        source: S,
        config: &crate::SourceConfig,
    ) -> Result<Self, SourceError> {
        let raw = source.fetch(config)?;
        Ok(Fetched::new(source, raw))
    }
}

/// Everything one rule pass reported.
#[derive(Debug, Default)]
pub struct PassReport {
    /// Lines of the rules text that were left out.
    pub errors: Vec<RuleError>,
    pub diagnostics: Vec<Diagnostic>,
}

impl PassReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.diagnostics.is_empty()
    }
}

/// The store after every stage of [`Pipeline::run`].
#[derive(Debug)]
pub struct PipelineOutput {
    /// All sources, concatenated in the order they were given.
    pub ingested: TransactionStore,
    /// After the first rule pass.
    pub rewritten: TransactionStore,
    pub deduplicated: TransactionStore,
    /// After the category rules; has the `category` column.
    pub categorized: TransactionStore,
    pub banks: BankAccounts,
    pub first_pass: PassReport,
    pub categories: PassReport,
}

impl PipelineOutput {
    /// Writes the final store as a tab-separated table.
    pub fn render_table<W: Write>(&self, w: &mut W) -> Result<(), Error> {
        Ok(render(w, &self.categorized)?)
    }

    /// The final store and every known account as report data.
    pub fn data_json(&self) -> Result<String, Error> {
        Ok(data_json(&self.categorized, self.banks.all_accounts())?)
    }
}

/// Ingest, rewrite, reconcile and categorize transactions from several
/// sources.
///
/// The first rules text may rewrite `from`, `to` and `description`, usually
/// to name the accounts of a transfer the way the other bank does. The
/// category rules run after deduplication and may only set `category`.
#[derive(TypedBuilder)]
pub struct Pipeline {
    #[builder(default)]
    sources: Vec<Fetched>,
    #[builder(default, setter(strip_option, into))]
    first_pass_rules: Option<String>,
    #[builder(default, setter(strip_option, into))]
    category_rules: Option<String>,
    #[builder(default = UNKNOWN_CATEGORY.to_string(), setter(into))]
    default_category: String,
}

fn assignable(columns: &[&str]) -> BTreeSet<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

fn rule_pass(
    rules: Option<&str>,
    compiler: Compiler,
    store: &TransactionStore,
) -> Result<(TransactionStore, PassReport), Error> {
    let text = match rules {
        Some(text) => text,
        None => return Ok((store.clone(), PassReport::default())),
    };
    let compilation = compiler.compile(text);
    let applied = compilation.rules.apply(store)?;
    Ok((
        applied.store,
        PassReport {
            errors: compilation.errors,
            diagnostics: applied.diagnostics,
        },
    ))
}

impl Pipeline {
    pub fn run(&self) -> Result<PipelineOutput, Error> {
        let mut banks = BankAccounts::new();
        let mut stores = Vec::with_capacity(self.sources.len());
        for fetched in &self.sources {
            let name = fetched.source.name();
            let store = fetched.source.parse_transactions(&fetched.raw)?;
            let accounts = fetched.source.parse_accounts(&fetched.raw)?;
            debug!(bank = name, rows = store.len(), accounts = accounts.len(), "ingested source");
            banks.insert(name, accounts);
            stores.push(store);
        }
        let ingested = TransactionStore::concat(ColumnSchema::base(), stores)?;

        let first_pass = Compiler::builder()
            .schema(ColumnSchema::base())
            .assignable(assignable(&[FROM, TO, DESCRIPTION]))
            .build();
        let (rewritten, first_report) = rule_pass(self.first_pass_rules.as_deref(), first_pass, &ingested)?;

        let deduplicated = deduplicate(&rewritten, &banks)?;
        let widened = deduplicated.widen(CATEGORY, Entry::from(self.default_category.as_str()))?;

        let categories = Compiler::builder()
            .schema(ColumnSchema::categorized())
            .assignable(assignable(&[CATEGORY]))
            .build();
        let (categorized, category_report) = rule_pass(self.category_rules.as_deref(), categories, &widened)?;

        info!(
            sources = self.sources.len(),
            ingested = ingested.len(),
            deduplicated = deduplicated.len(),
            rule_errors = first_report.errors.len() + category_report.errors.len(),
            diagnostics = first_report.diagnostics.len() + category_report.diagnostics.len(),
            "pipeline finished"
        );
        Ok(PipelineOutput {
            ingested,
            rewritten,
            deduplicated,
            categorized,
            banks,
            first_pass: first_report,
            categories: category_report,
        })
    }
}
