//! The rules language of bank-wrangler.
//!
//! A rules file holds one rule per line. Each rule is a comma-separated list
//! of match clauses (`description ~~ "PAYROLL"`, `amount >= $100.00`) and
//! assignments (`category = "Income"`). When every match clause of a rule
//! holds for a transaction, its assignments are written into that
//! transaction.
//!
//! ```text
//! description ~~ "^VENMO", to = "venmo"
//! amount >= $500.00, date < 2018/01/01, category = 'Big purchases'
//! ```
//!
//! Text goes through three steps: [`parse`] turns lines into [`ParsedRule`]s,
//! a [`Compiler`] checks them against a column schema, and the resulting
//! [`CompiledRules`] rewrite a whole store. A broken line is reported and
//! skipped; it never stops the remaining lines from applying.

use pest::iterators::{Pair, Pairs};
use pest::{Parser, Span};
use pest_derive::Parser as PestParser;
use wrangler_core::{Date, Dollars, Entry};

pub use ast::{Assignment, Condition, MatchOp, ParsedRule};
pub use check::{Compilation, Compiler};
pub use error::{RuleError, RuleErrorKind, RuleResult};
pub use eval::{Applied, CompiledRule, CompiledRules, Diagnostic, Evaluation};

pub mod ast;
mod check;
pub mod error;
mod eval;

#[derive(PestParser)]
#[grammar = "rules.pest"]
pub struct RulesParser;

/// Parses every non-blank line of `text`.
///
/// Lines that fail to parse produce an error and no rule; the other lines are
/// unaffected.
pub fn parse(text: &str) -> (Vec<ParsedRule>, Vec<RuleError>) {
    let mut rules = Vec::new();
    let mut errors = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line, i + 1) {
            Ok(rule) => rules.push(rule),
            Err(err) => errors.push(err),
        }
    }
    (rules, errors)
}

/// Parses one line, `number` being its 1-based position in the file.
pub fn parse_line(line: &str, number: usize) -> RuleResult<ParsedRule> {
    let parsed = RulesParser::parse(Rule::rule_line, line)
        .map_err(|e| RuleError::from_pest(e, number))?
        .next()
        .ok_or_else(|| {
            RuleError::new(
                RuleErrorKind::InvalidParserState {
                    message: "non-empty parse result".to_string(),
                },
                (number, 1),
            )
        })?;

    let mut conditions = Vec::new();
    let mut assignments = Vec::new();
    for clause in parsed.into_inner() {
        match clause.as_rule() {
            Rule::match_clause => conditions.push(condition(clause, number)?),
            Rule::assign_clause => assignments.push(assignment(clause, number)?),
            Rule::EOI => break,
            _ => {
                return Err(RuleError::invalid_state_with_span(
                    "match clause or assignment",
                    clause.as_span(),
                    number,
                ))
            }
        }
    }

    Ok(ParsedRule::builder()
        .line(number)
        .conditions(conditions)
        .assignments(assignments)
        .build())
}

fn next_pair<'i>(
    pairs: &mut Pairs<'i, Rule>,
    expected: &str,
    span: &Span<'i>,
    line: usize,
) -> RuleResult<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| RuleError::invalid_state_with_span(expected, span.clone(), line))
}

fn location(pair: &Pair<'_, Rule>, line: usize) -> (usize, usize) {
    (line, pair.as_span().start_pos().line_col().1)
}

fn condition(pair: Pair<'_, Rule>, line: usize) -> RuleResult<Condition> {
    debug_assert!(pair.as_rule() == Rule::match_clause);
    let span = pair.as_span();
    let mut pairs = pair.into_inner();
    let ident = next_pair(&mut pairs, "column name", &span, line)?;
    let op_pair = next_pair(&mut pairs, "match operator", &span, line)?;
    let op = MatchOp::from_symbol(op_pair.as_str()).ok_or_else(|| {
        RuleError::invalid_state_with_span("match operator", op_pair.as_span(), line)
    })?;
    let literal = literal(next_pair(&mut pairs, "literal", &span, line)?, line)?;
    Ok(Condition::builder()
        .column(ident.as_str().to_string())
        .op(op)
        .literal(literal)
        .location(location(&ident, line))
        .build())
}

fn assignment(pair: Pair<'_, Rule>, line: usize) -> RuleResult<Assignment> {
    debug_assert!(pair.as_rule() == Rule::assign_clause);
    let span = pair.as_span();
    let mut pairs = pair.into_inner();
    let ident = next_pair(&mut pairs, "column name", &span, line)?;
    let value = literal(next_pair(&mut pairs, "literal", &span, line)?, line)?;
    Ok(Assignment::builder()
        .column(ident.as_str().to_string())
        .value(value)
        .location(location(&ident, line))
        .build())
}

fn literal(pair: Pair<'_, Rule>, line: usize) -> RuleResult<Entry> {
    let span = pair.as_span();
    match pair.as_rule() {
        Rule::date_literal => {
            let mut parts = pair.into_inner();
            let year = next_pair(&mut parts, "year", &span, line)?;
            let month = next_pair(&mut parts, "month", &span, line)?;
            let day = next_pair(&mut parts, "day", &span, line)?;
            Date::from_parts(year.as_str(), month.as_str(), day.as_str())
                .map(Entry::Date)
                .map_err(|e| RuleError::literal_error(e, span, line))
        }
        Rule::dollars_literal => {
            let amount = next_pair(&mut pair.into_inner(), "dollar amount", &span, line)?;
            amount
                .as_str()
                .parse::<Dollars>()
                .map(Entry::Dollars)
                .map_err(|e| RuleError::literal_error(e, span, line))
        }
        Rule::string_literal => Ok(Entry::String(
            pair.into_inner()
                .next()
                .map(|inner| unescape(inner.as_str()))
                .unwrap_or_default(),
        )),
        _ => Err(RuleError::invalid_state_with_span("literal", span, line)),
    }
}

/// Drops each escaping backslash, keeping the character after it.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! parse_ok {
        ( $rule:ident, $input:expr ) => {
            assert_eq!(RulesParser::parse(Rule::$rule, $input).unwrap().as_str(), $input);
        };
        ( $rule:ident, $input:expr, $output:expr ) => {
            assert_eq!(RulesParser::parse(Rule::$rule, $input).unwrap().as_str(), $output);
        };
    }

    macro_rules! parse_fail {
        ( $rule:ident, $input:expr ) => {
            assert!(RulesParser::parse(Rule::$rule, $input).is_err());
        };
    }

    #[test]
    fn ident() {
        parse_ok!(ident, "description");
        parse_ok!(ident, "from");
        parse_ok!(ident, "col_2");
        parse_ok!(ident, "to ==", "to");

        parse_fail!(ident, "2col");
        parse_fail!(ident, "_col");
        parse_fail!(ident, "\"col\"");
    }

    #[test]
    fn match_op() {
        parse_ok!(match_op, "==");
        parse_ok!(match_op, "<=");
        parse_ok!(match_op, ">=");
        parse_ok!(match_op, "<");
        parse_ok!(match_op, ">");
        parse_ok!(match_op, "~~");
        parse_ok!(match_op, "<= 3", "<=");

        parse_fail!(match_op, "=");
        parse_fail!(match_op, "~");
        parse_fail!(match_op, "!=");
    }

    #[test]
    fn date_literal() {
        parse_ok!(date_literal, "1992/06/25");
        parse_ok!(date_literal, "2017/01/01");

        parse_fail!(date_literal, "17/01/01");
        parse_fail!(date_literal, "2017/1/1");
        parse_fail!(date_literal, "2017-01-01");
        parse_fail!(date_literal, "2017 / 01 / 01");
    }

    #[test]
    fn dollars_literal() {
        parse_ok!(dollars_literal, "$32.49");
        parse_ok!(dollars_literal, "$0.53");
        parse_ok!(dollars_literal, "$100");
        parse_ok!(dollars_literal, "$10.245", "$10.24");
        parse_ok!(dollars_literal, "$10.2", "$10");

        parse_fail!(dollars_literal, "32.49");
        parse_fail!(dollars_literal, "$.49");
        parse_fail!(dollars_literal, "$ 32.49");
        parse_fail!(dollars_literal, "$-32.49");
    }

    #[test]
    fn string_literal() {
        parse_ok!(string_literal, r#""""#);
        parse_ok!(string_literal, r#""foo""#);
        parse_ok!(string_literal, r#""€☃""#);
        parse_ok!(string_literal, r#""ayyy sup \" fam""#);
        parse_ok!(string_literal, r#"'single'"#);
        parse_ok!(string_literal, r#"'it\'s'"#);
        parse_ok!(string_literal, r#"'has "double" inside'"#);

        parse_fail!(string_literal, r#""unterminated"#);
        parse_fail!(string_literal, r#"'mixed""#);
        parse_fail!(string_literal, "bare");
    }

    #[test]
    fn clauses() {
        parse_ok!(match_clause, "mycolumn >= 1992/06/25");
        parse_ok!(match_clause, "mycolumn>=$32.49");
        parse_ok!(match_clause, r#"description ~~ "^VENMO""#);
        parse_ok!(assign_clause, r#"category = "Food""#);
        parse_ok!(assign_clause, "amount=$1.00");

        parse_fail!(assign_clause, r#"category == "Food""#);
        parse_fail!(match_clause, r#"category = "Food""#);
        parse_fail!(match_clause, "category == Food");
    }

    #[test]
    fn rule_line() {
        parse_ok!(rule_line, r#"first == "match this", first = "bucket""#);
        parse_ok!(rule_line, r#"  strcolumn >= "ayyy sup \" fam", dollarcolumn = $30.25  "#);
        parse_ok!(rule_line, r#"category = "Unknown""#);

        parse_fail!(rule_line, "hello hello hello");
        parse_fail!(rule_line, "HJI^&*()%^&&&");
        parse_fail!(rule_line, r#"first == "match this", blah blah try to parse me!"#);
        parse_fail!(rule_line, r#"first == "match this","#);
        parse_fail!(rule_line, "");
    }

    #[test]
    fn parse_builds_conditions_and_assignments() {
        let rule = parse_line(r#"amount >= $10.24, description ~~ 'a\'b', first = "B""#, 7).unwrap();
        assert_eq!(rule.line, 7);
        assert_eq!(rule.conditions.len(), 2);
        assert_eq!(rule.assignments.len(), 1);

        let amount = &rule.conditions[0];
        assert_eq!(amount.column, "amount");
        assert_eq!(amount.op, MatchOp::Ge);
        assert_eq!(amount.literal, Entry::Dollars("10.24".parse().unwrap()));
        assert_eq!(amount.location, (7, 1));

        let description = &rule.conditions[1];
        assert_eq!(description.op, MatchOp::Contains);
        assert_eq!(description.literal, Entry::from("a'b"));
        assert_eq!(description.location, (7, 19));

        let first = &rule.assignments[0];
        assert_eq!(first.column, "first");
        assert_eq!(first.value, Entry::from("B"));
    }

    #[test]
    fn parse_date_literal_value() {
        let rule = parse_line("date < 2018/01/31", 1).unwrap();
        assert_eq!(rule.conditions[0].literal, Entry::Date(Date::new(2018, 1, 31)));
        assert_eq!(rule.conditions[0].op, MatchOp::Lt);
    }

    #[test]
    fn parse_skips_blank_lines_and_isolates_errors() {
        let text = "\n   \nfirst == \"x\", first = \"y\"\nthis is not a rule\n\nsecond = $1.00\n";
        let (rules, errors) = parse(text);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].line, 3);
        assert_eq!(rules[1].line, 6);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].location.0, 4);
        assert!(errors[0].is_parse_error());
    }

    #[test]
    fn parse_error_points_at_trailing_garbage() {
        let err = parse_line(r#"first == "match this", blah"#, 2).unwrap_err();
        assert_eq!(err.location.0, 2);
        assert!(err.location.1 >= 24);
        let suffix = format!("at line 2 column {}", err.location.1);
        assert!(err.to_string().ends_with(&suffix));
    }

    #[test]
    fn unescape_keeps_escaped_characters() {
        assert_eq!(unescape(r#"ayyy sup \" fam"#), "ayyy sup \" fam");
        assert_eq!(unescape(r"back\\slash"), r"back\slash");
        assert_eq!(unescape(r"\x"), "x");
    }
}
