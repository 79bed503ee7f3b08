use std::error::Error;
use std::fmt;

use pest::Span;
use wrangler_core::{EntryKind, ValueError};

use super::Rule;

pub type RuleResult<T> = Result<T, RuleError>;

#[derive(Clone, Debug, PartialEq)]
pub enum RuleErrorKind {
    /// The line does not follow the rule grammar.
    InvalidInput { message: String },
    /// A literal could not be turned into an entry.
    InvalidLiteral { message: String },
    /// A clause names a column the schema does not have.
    UnknownColumn { column: String },
    /// A literal's kind differs from the kind of its column.
    TypeMismatch {
        column: String,
        expected: EntryKind,
        found: EntryKind,
    },
    /// `~~` used on a column that does not hold strings.
    InvalidOperator { column: String, kind: EntryKind },
    /// A `~~` pattern that is not a valid regular expression.
    InvalidPattern { message: String },
    /// An assignment to a column outside the assignable set.
    NotAssignable { column: String },
    /// Parser has reached an invalid state (most likely a bug in the parser).
    InvalidParserState { message: String },
}

/// A problem with one line of a rules file.
///
/// Errors never abort the whole file: the offending line is left out of
/// compilation and every other line is still used.
#[derive(Debug)]
pub struct RuleError {
    /// The type of error.
    pub kind: RuleErrorKind,
    /// The (line, column) location of the error in the rules text.
    pub location: (usize, usize),
    source: Option<Box<dyn Error + 'static + Send + Sync>>,
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RuleErrorKind::InvalidInput { message } => {
                write!(f, "Invalid input: {}", message)?;
            }
            RuleErrorKind::InvalidLiteral { message } => {
                write!(f, "Invalid literal: {}", message)?;
            }
            RuleErrorKind::UnknownColumn { column } => {
                write!(f, "unknown column `{}`", column)?;
            }
            RuleErrorKind::TypeMismatch {
                column,
                expected,
                found,
            } => {
                write!(
                    f,
                    "type mismatch: column `{}` holds {} but the literal is {}",
                    column, expected, found
                )?;
            }
            RuleErrorKind::InvalidOperator { column, kind } => {
                write!(
                    f,
                    "operator `~~` needs a String column, `{}` holds {}",
                    column, kind
                )?;
            }
            RuleErrorKind::InvalidPattern { message } => {
                write!(f, "invalid pattern: {}", message)?;
            }
            RuleErrorKind::NotAssignable { column } => {
                write!(f, "column `{}` cannot be assigned by these rules", column)?;
            }
            RuleErrorKind::InvalidParserState { message } => {
                write!(f, "Parser has reached an invalid state (please report this as a bug): expected {}", message)?;
            }
        }
        write!(f, " at line {} column {}", self.location.0, self.location.1)
    }
}

impl Error for RuleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl PartialEq for RuleError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.location == other.location
    }
}

impl RuleError {
    pub fn new(kind: RuleErrorKind, location: (usize, usize)) -> RuleError {
        RuleError {
            kind,
            location,
            source: None,
        }
    }

    /// True for errors found while parsing, false for errors found while checking.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self.kind,
            RuleErrorKind::InvalidInput { .. }
                | RuleErrorKind::InvalidLiteral { .. }
                | RuleErrorKind::InvalidParserState { .. }
        )
    }

    pub(crate) fn invalid_state_with_span<T: ToString>(msg: T, span: Span, line: usize) -> RuleError {
        RuleError::new(
            RuleErrorKind::InvalidParserState {
                message: msg.to_string(),
            },
            (line, span.start_pos().line_col().1),
        )
    }

    pub(crate) fn literal_error(err: ValueError, span: Span, line: usize) -> RuleError {
        RuleError {
            kind: RuleErrorKind::InvalidLiteral {
                message: err.to_string(),
            },
            location: (line, span.start_pos().line_col().1),
            source: Some(Box::new(err)),
        }
    }

    /// Converts a pest error for a single line into an error positioned in the whole file.
    pub(crate) fn from_pest(err: pest::error::Error<Rule>, line: usize) -> RuleError {
        let err = err.renamed_rules(|rule| {
            match *rule {
                Rule::EOI => "end of line",
                Rule::WHITESPACE => "whitespace",
                Rule::ident => "column name",
                Rule::match_op => "match operator (==, <=, >=, <, >, ~~)",
                Rule::assign_op => "'='",
                Rule::year => "4-digit year",
                Rule::month => "2-digit month",
                Rule::day => "2-digit day",
                Rule::date_literal => "date (YYYY/MM/DD)",
                Rule::dollars_amount => "dollar amount",
                Rule::dollars_literal => "dollars ($12.34)",
                Rule::double_quoted_inner => "inner part of a double-quoted string",
                Rule::single_quoted_inner => "inner part of a single-quoted string",
                Rule::string_literal => "quoted string",
                Rule::literal => "literal (date, dollars or quoted string)",
                Rule::match_clause => "match clause",
                Rule::assign_clause => "assignment",
                Rule::clause => "match clause or assignment",
                Rule::rule_line => "rule",
            }
            .to_string()
        });
        let column = match &err.line_col {
            pest::error::LineColLocation::Pos(ref p) => p.1,
            pest::error::LineColLocation::Span(ref p, _) => p.1,
        };
        RuleError {
            kind: RuleErrorKind::InvalidInput {
                message: format!("{}", err),
            },
            location: (line, column),
            source: Some(Box::new(err)),
        }
    }
}
