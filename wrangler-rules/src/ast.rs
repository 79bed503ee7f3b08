use std::cmp::Ordering;
use std::fmt;

use typed_builder::TypedBuilder;
use wrangler_core::Entry;

/// Comparison used by a match clause.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum MatchOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
    /// Regex search inside a String entry.
    Contains,
}

impl MatchOp {
    pub fn from_symbol(symbol: &str) -> Option<MatchOp> {
        let op = match symbol {
            "==" => MatchOp::Eq,
            "<" => MatchOp::Lt,
            "<=" => MatchOp::Le,
            ">" => MatchOp::Gt,
            ">=" => MatchOp::Ge,
            "~~" => MatchOp::Contains,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            MatchOp::Eq => "==",
            MatchOp::Lt => "<",
            MatchOp::Le => "<=",
            MatchOp::Gt => ">",
            MatchOp::Ge => ">=",
            MatchOp::Contains => "~~",
        }
    }

    /// Whether `entry <op> literal` holds given `entry.cmp(literal)`.
    pub fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            MatchOp::Eq => ordering == Ordering::Equal,
            MatchOp::Lt => ordering == Ordering::Less,
            MatchOp::Le => ordering != Ordering::Greater,
            MatchOp::Gt => ordering == Ordering::Greater,
            MatchOp::Ge => ordering != Ordering::Less,
            MatchOp::Contains => false,
        }
    }
}

impl fmt::Display for MatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// `column <op> literal`
#[derive(Clone, Debug, PartialEq, TypedBuilder)]
pub struct Condition {
    pub column: String,
    pub op: MatchOp,
    pub literal: Entry,
    /// (line, column) of the column name.
    #[builder(default)]
    pub location: (usize, usize),
}

/// `column = literal`
#[derive(Clone, Debug, PartialEq, TypedBuilder)]
pub struct Assignment {
    pub column: String,
    pub value: Entry,
    /// (line, column) of the column name.
    #[builder(default)]
    pub location: (usize, usize),
}

/// One line of a rules file, before checking it against a schema.
#[derive(Clone, Debug, PartialEq, TypedBuilder)]
pub struct ParsedRule {
    /// 1-based line in the rules text.
    pub line: usize,
    #[builder(default)]
    pub conditions: Vec<Condition>,
    #[builder(default)]
    pub assignments: Vec<Assignment>,
}
