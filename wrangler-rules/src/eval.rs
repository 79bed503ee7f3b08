use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use tracing::{debug, warn};
use wrangler_core::{ColumnSchema, Entry, Row, SchemaError, TransactionStore};

use super::ast::MatchOp;

#[derive(Clone, Debug)]
pub(crate) enum Test {
    Compare(MatchOp, Entry),
    Search(Regex),
}

/// A match clause resolved to a row position.
#[derive(Clone, Debug)]
pub(crate) struct CompiledCondition {
    pub(crate) index: usize,
    pub(crate) test: Test,
}

impl CompiledCondition {
    fn holds(&self, row: &Row) -> bool {
        let entry = match row.get(self.index) {
            Some(entry) => entry,
            None => return false,
        };
        match &self.test {
            Test::Compare(op, literal) => entry
                .try_cmp(literal)
                .map(|ordering| op.accepts(ordering))
                .unwrap_or(false),
            Test::Search(re) => entry.matches_regex(re).unwrap_or(false),
        }
    }
}

/// A rule that passed checking against a schema.
#[derive(Clone, Debug)]
pub struct CompiledRule {
    pub(crate) line: usize,
    pub(crate) conditions: Vec<CompiledCondition>,
    pub(crate) assignments: Vec<(String, Entry)>,
}

impl CompiledRule {
    /// 1-based line of the rule in its rules text.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.conditions.iter().all(|c| c.holds(row))
    }

    pub fn assignments(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.assignments.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// What the rules decide for one row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Evaluation {
    /// Column index to its single agreed value.
    pub assignments: BTreeMap<usize, Entry>,
    /// Columns given more than one distinct value, with every value in the
    /// order the rules produced them.
    pub conflicts: BTreeMap<String, Vec<Entry>>,
    /// Assigned keys that name no column of the schema.
    pub ignored: Vec<String>,
}

impl Evaluation {
    pub fn is_noop(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// A recoverable problem met while applying rules to a store.
#[derive(Clone, Debug, PartialEq)]
pub enum Diagnostic {
    Conflict {
        /// Position of the row in the store.
        row: usize,
        conflicts: BTreeMap<String, Vec<Entry>>,
    },
    UnknownAssignment {
        row: usize,
        column: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Conflict { conflicts, .. } => {
                f.write_str("rules conflict: {")?;
                for (i, (column, values)) in conflicts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {{", column)?;
                    for (j, value) in values.iter().enumerate() {
                        if j > 0 {
                            f.write_str(", ")?;
                        }
                        match value {
                            Entry::String(s) => write!(f, "{:?}", s)?,
                            other => write!(f, "{}", other)?,
                        }
                    }
                    f.write_str("}")?;
                }
                f.write_str("}")
            }
            Diagnostic::UnknownAssignment { column, .. } => {
                write!(f, "ignoring unknown rule assignment to {}", column)
            }
        }
    }
}

/// Result of [`CompiledRules::apply`].
#[derive(Clone, Debug)]
pub struct Applied {
    pub store: TransactionStore,
    pub diagnostics: Vec<Diagnostic>,
}

/// Every valid rule of a rules text, bound to the schema it was checked
/// against.
#[derive(Clone, Debug)]
pub struct CompiledRules {
    schema: ColumnSchema,
    rules: Vec<CompiledRule>,
}

impl CompiledRules {
    pub fn new(schema: ColumnSchema, rules: Vec<CompiledRule>) -> Self {
        CompiledRules { schema, rules }
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompiledRule> {
        self.rules.iter()
    }

    /// Decides the assignments for one row without touching it.
    pub fn evaluate(&self, row: &Row) -> Evaluation {
        let mut proposed: Vec<(&str, Vec<&Entry>)> = Vec::new();
        for rule in self.rules.iter().filter(|rule| rule.matches(row)) {
            for (column, value) in rule.assignments() {
                match proposed.iter_mut().find(|(c, _)| *c == column) {
                    Some((_, values)) => {
                        if !values.contains(&value) {
                            values.push(value);
                        }
                    }
                    None => proposed.push((column, vec![value])),
                }
            }
        }

        let mut evaluation = Evaluation::default();
        for (column, mut values) in proposed {
            if values.len() > 1 {
                evaluation
                    .conflicts
                    .insert(column.to_string(), values.into_iter().cloned().collect());
                continue;
            }
            match (self.schema.index_of(column), values.pop()) {
                (Some(index), Some(value)) => {
                    evaluation.assignments.insert(index, value.clone());
                }
                (None, _) => evaluation.ignored.push(column.to_string()),
                (Some(_), None) => {}
            }
        }
        evaluation
    }

    /// Rewrites every row of `store`, which must share the rules' schema.
    pub fn apply(&self, store: &TransactionStore) -> Result<Applied, SchemaError> {
        if store.columns() != &self.schema {
            return Err(SchemaError::SchemaMismatch);
        }
        let mut result = TransactionStore::new(self.schema.clone());
        let mut diagnostics = Vec::new();
        let mut changed = 0;
        for (position, row) in store.iter().enumerate() {
            let evaluation = self.evaluate(row);
            if !evaluation.conflicts.is_empty() {
                diagnostics.push(Diagnostic::Conflict {
                    row: position,
                    conflicts: evaluation.conflicts.clone(),
                });
            }
            for column in &evaluation.ignored {
                diagnostics.push(Diagnostic::UnknownAssignment {
                    row: position,
                    column: column.clone(),
                });
            }
            if evaluation.is_noop() {
                result.ingest(row.clone())?;
                continue;
            }
            changed += 1;
            let mut entries = row.entries().to_vec();
            for (index, value) in evaluation.assignments {
                if let Some(slot) = entries.get_mut(index) {
                    *slot = value;
                }
            }
            result.ingest(Row::new(entries))?;
        }
        for diagnostic in &diagnostics {
            warn!("{}", diagnostic);
        }
        debug!(
            rows = store.len(),
            changed,
            diagnostics = diagnostics.len(),
            "applied rules"
        );
        Ok(Applied {
            store: result,
            diagnostics,
        })
    }
}

impl<'a> IntoIterator for &'a CompiledRules {
    type Item = &'a CompiledRule;
    type IntoIter = std::slice::Iter<'a, CompiledRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
