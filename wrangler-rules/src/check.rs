use std::collections::BTreeSet;

use regex::Regex;
use tracing::{debug, warn};
use typed_builder::TypedBuilder;
use wrangler_core::{ColumnSchema, Entry, EntryKind};

use super::ast::{Assignment, Condition, MatchOp, ParsedRule};
use super::error::{RuleError, RuleErrorKind};
use super::eval::{CompiledCondition, CompiledRule, CompiledRules, Test};

/// Checks parsed rules against a column schema and compiles the valid ones.
///
/// ```ignore
/// let compiler = Compiler::builder()
///     .schema(ColumnSchema::categorized())
///     .assignable(["category".to_string()].iter().cloned().collect())
///     .build();
/// let compilation = compiler.compile(text);
/// ```
#[derive(Clone, Debug, TypedBuilder)]
pub struct Compiler {
    schema: ColumnSchema,

    /// Columns the rules may write. Every schema column when unset.
    #[builder(default, setter(strip_option))]
    assignable: Option<BTreeSet<String>>,
}

/// Output of [`Compiler::compile`]: the usable rules plus everything wrong
/// with the others, in line order.
#[derive(Debug)]
pub struct Compilation {
    pub rules: CompiledRules,
    pub errors: Vec<RuleError>,
}

impl Compiler {
    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    /// Parses, checks and compiles a whole rules text.
    pub fn compile(&self, text: &str) -> Compilation {
        let (parsed, mut errors) = super::parse(text);
        let mut rules = Vec::with_capacity(parsed.len());
        for rule in &parsed {
            match self.compile_rule(rule) {
                Ok(compiled) => rules.push(compiled),
                Err(rule_errors) => errors.extend(rule_errors),
            }
        }
        errors.sort_by_key(|e| e.location);
        for err in &errors {
            warn!("rejected rule: {}", err);
        }
        debug!(
            valid = rules.len(),
            rejected_lines = parsed.len() - rules.len(),
            "compiled rules"
        );
        Compilation {
            rules: CompiledRules::new(self.schema.clone(), rules),
            errors,
        }
    }

    /// All type errors of one parsed rule; empty when the rule is valid.
    pub fn check(&self, rule: &ParsedRule) -> Vec<RuleError> {
        self.compile_rule(rule).err().unwrap_or_default()
    }

    pub fn compile_rule(&self, rule: &ParsedRule) -> Result<CompiledRule, Vec<RuleError>> {
        let mut errors = Vec::new();
        let mut conditions = Vec::with_capacity(rule.conditions.len());
        for condition in &rule.conditions {
            match self.compile_condition(condition) {
                Ok(compiled) => conditions.push(compiled),
                Err(err) => errors.push(err),
            }
        }
        for assignment in &rule.assignments {
            if let Err(err) = self.check_assignment(assignment) {
                errors.push(err);
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(CompiledRule {
            line: rule.line,
            conditions,
            assignments: rule
                .assignments
                .iter()
                .map(|a| (a.column.clone(), a.value.clone()))
                .collect(),
        })
    }

    fn column_kind(&self, column: &str, location: (usize, usize)) -> Result<(usize, EntryKind), RuleError> {
        match (self.schema.index_of(column), self.schema.kind_of(column)) {
            (Some(index), Some(kind)) => Ok((index, kind)),
            _ => Err(RuleError::new(
                RuleErrorKind::UnknownColumn {
                    column: column.to_string(),
                },
                location,
            )),
        }
    }

    fn compile_condition(&self, condition: &Condition) -> Result<CompiledCondition, RuleError> {
        let (index, kind) = self.column_kind(&condition.column, condition.location)?;
        if condition.op == MatchOp::Contains && kind != EntryKind::String {
            return Err(RuleError::new(
                RuleErrorKind::InvalidOperator {
                    column: condition.column.clone(),
                    kind,
                },
                condition.location,
            ));
        }
        if condition.literal.kind() != kind {
            return Err(RuleError::new(
                RuleErrorKind::TypeMismatch {
                    column: condition.column.clone(),
                    expected: kind,
                    found: condition.literal.kind(),
                },
                condition.location,
            ));
        }
        let test = match (&condition.op, &condition.literal) {
            (MatchOp::Contains, Entry::String(pattern)) => {
                let re = Regex::new(pattern).map_err(|e| {
                    RuleError::new(
                        RuleErrorKind::InvalidPattern {
                            message: e.to_string(),
                        },
                        condition.location,
                    )
                })?;
                Test::Search(re)
            }
            (op, literal) => Test::Compare(*op, literal.clone()),
        };
        Ok(CompiledCondition { index, test })
    }

    // Assignments to columns the schema lacks are let through here and
    // reported when the rules are applied.
    fn check_assignment(&self, assignment: &Assignment) -> Result<(), RuleError> {
        let kind = match self.schema.kind_of(&assignment.column) {
            Some(kind) => kind,
            None => return Ok(()),
        };
        if let Some(assignable) = &self.assignable {
            if !assignable.contains(&assignment.column) {
                return Err(RuleError::new(
                    RuleErrorKind::NotAssignable {
                        column: assignment.column.clone(),
                    },
                    assignment.location,
                ));
            }
        }
        if assignment.value.kind() != kind {
            return Err(RuleError::new(
                RuleErrorKind::TypeMismatch {
                    column: assignment.column.clone(),
                    expected: kind,
                    found: assignment.value.kind(),
                },
                assignment.location,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiler(columns: Vec<(&str, EntryKind)>) -> Compiler {
        Compiler::builder()
            .schema(ColumnSchema::new(columns).unwrap())
            .build()
    }

    fn check_parse(columns: Vec<(&str, EntryKind)>, text: &str, want_lines: usize, want_errs: usize) {
        let compilation = compiler(columns).compile(text);
        assert_eq!(compilation.rules.len(), want_lines, "rules for {:?}", text);
        assert_eq!(compilation.errors.len(), want_errs, "errors for {:?}", text);
    }

    #[test]
    fn compile_counts() {
        check_parse(vec![("mycolumn", EntryKind::Date)], "mycolumn >= 1992/06/25", 1, 0);
        check_parse(vec![("mycolumn", EntryKind::Dollars)], "mycolumn >= $32.49", 1, 0);
        check_parse(
            vec![("strcolumn", EntryKind::String), ("dollarcolumn", EntryKind::Dollars)],
            r#"strcolumn >= "ayyy sup \" fam", dollarcolumn = $30.25"#,
            1,
            0,
        );
        check_parse(vec![("mycolumn", EntryKind::String)], "hello hello hello", 0, 1);
        check_parse(vec![("mycolumn", EntryKind::String)], "HJI^&*()%^&&&", 0, 1);
        check_parse(
            vec![("mycolumn", EntryKind::String)],
            "first == \"match this\", blah blah try to parse me!",
            0,
            1,
        );
    }

    #[test]
    fn unknown_match_column() {
        let compilation = compiler(vec![("first", EntryKind::String)]).compile(r#"second == "x""#);
        assert!(compilation.rules.is_empty());
        assert_eq!(
            compilation.errors[0].kind,
            RuleErrorKind::UnknownColumn {
                column: "second".to_string()
            }
        );
        assert_eq!(compilation.errors[0].location, (1, 1));
    }

    #[test]
    fn literal_kind_must_match_column() {
        let compilation = compiler(vec![("date", EntryKind::Date)]).compile(r#"date == "2017/01/01""#);
        assert_eq!(
            compilation.errors[0].kind,
            RuleErrorKind::TypeMismatch {
                column: "date".to_string(),
                expected: EntryKind::Date,
                found: EntryKind::String,
            }
        );
    }

    #[test]
    fn contains_needs_a_string_column() {
        let compilation = compiler(vec![("amount", EntryKind::Dollars)]).compile(r#"amount ~~ "1""#);
        assert_eq!(
            compilation.errors[0].kind,
            RuleErrorKind::InvalidOperator {
                column: "amount".to_string(),
                kind: EntryKind::Dollars,
            }
        );
    }

    #[test]
    fn contains_needs_a_valid_pattern() {
        let compilation = compiler(vec![("description", EntryKind::String)]).compile(r#"description ~~ "(""#);
        assert!(matches!(
            compilation.errors[0].kind,
            RuleErrorKind::InvalidPattern { .. }
        ));
    }

    #[test]
    fn every_error_of_a_line_is_reported() {
        let compilation = compiler(vec![("first", EntryKind::String)])
            .compile(r#"nope == "x", first == $1.00, first = $2.00"#);
        assert!(compilation.rules.is_empty());
        assert_eq!(compilation.errors.len(), 3);
        assert!(compilation.errors.iter().all(|e| !e.is_parse_error()));
    }

    #[test]
    fn assignment_kind_must_match_column() {
        let compilation = compiler(vec![("amount", EntryKind::Dollars)]).compile(r#"amount = "free""#);
        assert_eq!(compilation.errors.len(), 1);
        assert!(matches!(
            compilation.errors[0].kind,
            RuleErrorKind::TypeMismatch { .. }
        ));
    }

    #[test]
    fn assignable_set_limits_writes() {
        let compiler = Compiler::builder()
            .schema(ColumnSchema::categorized())
            .assignable(vec!["category".to_string()].into_iter().collect())
            .build();
        let text = "description ~~ \"RENT\", category = \"Housing\"\ndescription ~~ \"RENT\", to = \"landlord\"\n";
        let compilation = compiler.compile(text);
        assert_eq!(compilation.rules.len(), 1);
        assert_eq!(
            compilation.errors[0].kind,
            RuleErrorKind::NotAssignable {
                column: "to".to_string()
            }
        );
        assert_eq!(compilation.errors[0].location, (2, 24));
    }

    #[test]
    fn unknown_assignment_is_not_an_error() {
        let compilation = compiler(vec![("first", EntryKind::String)]).compile(r#"first == "x", payee = "someone""#);
        assert_eq!(compilation.rules.len(), 1);
        assert!(compilation.errors.is_empty());
    }

    #[test]
    fn errors_come_back_in_line_order() {
        let text = "nope == \"x\"\nnot a rule\nfirst == $1.00\n";
        let compilation = compiler(vec![("first", EntryKind::String)]).compile(text);
        let lines: Vec<_> = compilation.errors.iter().map(|e| e.location.0).collect();
        assert_eq!(lines, vec![1, 2, 3]);
        assert!(compilation.errors[1].is_parse_error());
    }

    #[test]
    fn check_is_empty_for_valid_rules() {
        let compiler = compiler(vec![("first", EntryKind::String)]);
        let (parsed, _) = crate::parse(r#"first ~~ "^a", first = "b""#);
        assert!(compiler.check(&parsed[0]).is_empty());
    }
}
