// SPDX-License-Identifier: MIT

//! Simple condition expression parser
//!
//! Parses expressions like:
//! - `field == 'value'`
//! - `score > 0.8`
//! - `a == 'x' and (b > 5 or not c == true)`
//!
//! `or` binds looser than `and`, which binds looser than `not`.

use super::ast::{CompareOp, Expression, Literal};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    #[error("Condition is empty")]
    Empty,

    #[error("Unbalanced parentheses in condition: {0}")]
    Unbalanced(String),

    #[error("Unterminated string literal in condition: {0}")]
    UnterminatedString(String),

    #[error("Could not parse condition: {0}")]
    NoOperator(String),

    #[error("Invalid field reference: '{0}'")]
    InvalidField(String),

    #[error("Could not parse literal: {0}")]
    InvalidLiteral(String),
}

/// Parse a condition expression string into an AST
pub fn parse(input: &str) -> Result<Expression, ConditionError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ConditionError::Empty);
    }

    check_balanced(input)?;

    if let Some(inner) = strip_outer_parens(input) {
        return parse(inner);
    }

    // Handle special cases
    if input == "true" {
        return Ok(Expression::True);
    }
    if input == "false" {
        return Ok(Expression::False);
    }

    if let Some((left, right)) = split_top_level(input, " or ") {
        return Ok(Expression::Or(Box::new(parse(left)?), Box::new(parse(right)?)));
    }
    if let Some((left, right)) = split_top_level(input, " and ") {
        return Ok(Expression::And(Box::new(parse(left)?), Box::new(parse(right)?)));
    }
    if let Some(rest) = input.strip_prefix("not ") {
        return Ok(Expression::Not(Box::new(parse(rest)?)));
    }

    parse_comparison(input)
}

/// Verify quotes are closed and parentheses balance outside of strings
fn check_balanced(input: &str) -> Result<(), ConditionError> {
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth < 0 {
                    return Err(ConditionError::Unbalanced(input.to_string()));
                }
            }
            _ => {}
        }
    }

    if quote.is_some() {
        return Err(ConditionError::UnterminatedString(input.to_string()));
    }
    if depth != 0 {
        return Err(ConditionError::Unbalanced(input.to_string()));
    }
    Ok(())
}

/// Returns the inside of `( ... )` when the first paren closes at the very end
fn strip_outer_parens(input: &str) -> Option<&str> {
    if !input.starts_with('(') {
        return None;
    }

    let mut depth = 0;
    let mut quote: Option<char> = None;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    return (i == input.len() - 1).then(|| &input[1..i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split at the first occurrence of `sep` outside strings and parentheses
fn split_top_level<'a>(input: &'a str, sep: &str) -> Option<(&'a str, &'a str)> {
    find_top_level(input, sep).map(|pos| (&input[..pos], &input[pos + sep.len()..]))
}

fn find_top_level(input: &str, op: &str) -> Option<usize> {
    let mut depth = 0;
    let mut quote: Option<char> = None;

    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth -= 1,
            (None, _) if depth == 0 && input[i..].starts_with(op) => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_comparison(input: &str) -> Result<Expression, ConditionError> {
    // Try operators in order of length (longest first)
    let operators = [
        ("!=", CompareOp::NotEq),
        (">=", CompareOp::Gte),
        ("<=", CompareOp::Lte),
        ("==", CompareOp::Eq),
        (">", CompareOp::Gt),
        ("<", CompareOp::Lt),
        (" contains ", CompareOp::Contains),
    ];

    for (op_str, op) in operators {
        if let Some(pos) = find_top_level(input, op_str) {
            let left = input[..pos].trim();
            if !is_field_path(left) {
                return Err(ConditionError::InvalidField(left.to_string()));
            }
            let right = parse_literal(&input[pos + op_str.len()..])?;
            return Ok(Expression::compare(left, op, right));
        }
    }

    Err(ConditionError::NoOperator(input.to_string()))
}

/// `name` or `name.nested.path`, each segment `[A-Za-z_][A-Za-z0-9_]*`
fn is_field_path(input: &str) -> bool {
    !input.is_empty()
        && input.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

fn parse_literal(input: &str) -> Result<Literal, ConditionError> {
    let input = input.trim();

    // Null
    if input == "null" {
        return Ok(Literal::Null);
    }

    // Boolean
    if input == "true" {
        return Ok(Literal::Boolean(true));
    }
    if input == "false" {
        return Ok(Literal::Boolean(false));
    }

    // String (single or double quotes)
    if input.len() >= 2
        && ((input.starts_with('\'') && input.ends_with('\''))
            || (input.starts_with('"') && input.ends_with('"')))
    {
        let s = &input[1..input.len() - 1];
        return Ok(Literal::String(s.to_string()));
    }

    // Number
    if let Ok(n) = input.parse::<f64>() {
        if n.is_finite() {
            return Ok(Literal::Number(n));
        }
    }

    Err(ConditionError::InvalidLiteral(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(left: &str, op: CompareOp, right: Literal) -> Expression {
        Expression::compare(left, op, right)
    }

    #[test]
    fn test_parse_simple_equality() {
        let expr = parse("intent == 'search'").unwrap();
        assert_eq!(
            expr,
            cmp("intent", CompareOp::Eq, Literal::String("search".to_string()))
        );
    }

    #[test]
    fn test_parse_not_equal() {
        let expr = parse("status != 'done'").unwrap();
        assert_eq!(
            expr,
            cmp("status", CompareOp::NotEq, Literal::String("done".to_string()))
        );
    }

    #[test]
    fn test_parse_numeric_comparisons() {
        assert_eq!(
            parse("confidence > 0.8").unwrap(),
            cmp("confidence", CompareOp::Gt, Literal::Number(0.8))
        );
        assert_eq!(
            parse("score >= 5").unwrap(),
            cmp("score", CompareOp::Gte, Literal::Number(5.0))
        );
        assert_eq!(
            parse("count <= 10").unwrap(),
            cmp("count", CompareOp::Lte, Literal::Number(10.0))
        );
        assert_eq!(
            parse("priority < 3").unwrap(),
            cmp("priority", CompareOp::Lt, Literal::Number(3.0))
        );
    }

    #[test]
    fn test_parse_boolean_and_null_literals() {
        assert_eq!(
            parse("is_draft == false").unwrap(),
            cmp("is_draft", CompareOp::Eq, Literal::Boolean(false))
        );
        assert_eq!(
            parse("error == null").unwrap(),
            cmp("error", CompareOp::Eq, Literal::Null)
        );
    }

    #[test]
    fn test_parse_contains() {
        let expr = parse("tags contains 'bug'").unwrap();
        assert_eq!(
            expr,
            cmp("tags", CompareOp::Contains, Literal::String("bug".to_string()))
        );
    }

    #[test]
    fn test_parse_and() {
        let expr = parse("a == 'x' and b > 5").unwrap();
        assert_eq!(
            expr,
            Expression::And(
                Box::new(cmp("a", CompareOp::Eq, Literal::String("x".to_string()))),
                Box::new(cmp("b", CompareOp::Gt, Literal::Number(5.0))),
            )
        );
    }

    #[test]
    fn test_or_binds_looser_than_and() {
        let expr = parse("a == 1 and b == 2 or c == 3").unwrap();
        match expr {
            Expression::Or(left, right) => {
                assert!(matches!(*left, Expression::And(_, _)));
                assert_eq!(*right, cmp("c", CompareOp::Eq, Literal::Number(3.0)));
            }
            other => panic!("Expected Or expression, got {:?}", other),
        }
    }

    #[test]
    fn test_parentheses_group() {
        let expr = parse("a == 1 and (b == 2 or c == 3)").unwrap();
        match expr {
            Expression::And(_, right) => assert!(matches!(*right, Expression::Or(_, _))),
            other => panic!("Expected And expression, got {:?}", other),
        }
        assert_eq!(parse("(true)").unwrap(), Expression::True);
    }

    #[test]
    fn test_parse_not() {
        let expr = parse("not done == true").unwrap();
        assert_eq!(
            expr,
            Expression::Not(Box::new(cmp("done", CompareOp::Eq, Literal::Boolean(true))))
        );
    }

    #[test]
    fn test_operators_inside_strings_are_ignored() {
        let expr = parse("title == 'a and b'").unwrap();
        assert_eq!(
            expr,
            cmp("title", CompareOp::Eq, Literal::String("a and b".to_string()))
        );
    }

    #[test]
    fn test_non_ascii_literal() {
        let expr = parse("city == 'Zürich' and ok == true").unwrap();
        assert!(matches!(expr, Expression::And(_, _)));
    }

    #[test]
    fn test_nested_field_path() {
        let expr = parse("review.score >= 7").unwrap();
        assert_eq!(expr, cmp("review.score", CompareOp::Gte, Literal::Number(7.0)));
    }

    #[test]
    fn test_parse_true_false() {
        assert_eq!(parse("true").unwrap(), Expression::True);
        assert_eq!(parse("false").unwrap(), Expression::False);
    }

    #[test]
    fn test_parse_double_quotes() {
        let expr = parse(r#"name == "hello""#).unwrap();
        assert_eq!(
            expr,
            cmp("name", CompareOp::Eq, Literal::String("hello".to_string()))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse("   "), Err(ConditionError::Empty));
        assert!(matches!(
            parse("this is not valid"),
            Err(ConditionError::NoOperator(_))
        ));
        assert!(matches!(
            parse("(a == 1"),
            Err(ConditionError::Unbalanced(_))
        ));
        assert!(matches!(
            parse("a == 'open"),
            Err(ConditionError::UnterminatedString(_))
        ));
        assert!(matches!(
            parse("1abc == 2"),
            Err(ConditionError::InvalidField(_))
        ));
        assert!(matches!(
            parse("a == maybe"),
            Err(ConditionError::InvalidLiteral(_))
        ));
    }

    #[test]
    fn test_canonical_form_ignores_spacing() {
        let loose = parse("  a==1  and (b == \"x\" or  c>2.50)").unwrap();
        let tight = parse("a == 1 and (b == 'x' or c > 2.5)").unwrap();
        assert_eq!(loose.to_string(), "a == 1 and (b == 'x' or c > 2.5)");
        assert_eq!(loose.to_string(), tight.to_string());
    }
}
