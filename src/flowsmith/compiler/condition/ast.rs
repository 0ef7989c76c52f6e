// SPDX-License-Identifier: MIT

//! Condition syntax tree
//!
//! `Display` prints the canonical form: single spaces around operators,
//! minimal parentheses and normalised literals. Two conditions with the same
//! canonical form always select the same states.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Compare(Comparison),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),
    True,
    False,
}

/// `field op value`, where `field` is a dot-separated state path
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub field: String,
    pub op: CompareOp,
    pub value: Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Membership in a string or list field
    Contains,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
}

impl Expression {
    pub fn compare(field: impl Into<String>, op: CompareOp, value: Literal) -> Self {
        Expression::Compare(Comparison {
            field: field.into(),
            op,
            value,
        })
    }

    /// State fields referenced by the expression, deduplicated, left to right
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expression::Compare(c) => {
                if !out.contains(&c.field.as_str()) {
                    out.push(&c.field);
                }
            }
            Expression::And(l, r) | Expression::Or(l, r) => {
                l.collect_fields(out);
                r.collect_fields(out);
            }
            Expression::Not(inner) => inner.collect_fields(out),
            Expression::True | Expression::False => {}
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expression::Or(..) => 1,
            Expression::And(..) => 2,
            Expression::Not(_) => 3,
            _ => 4,
        }
    }

    fn write_operand(&self, f: &mut fmt::Formatter<'_>, parent: u8, left: bool) -> fmt::Result {
        let own = self.precedence();
        if own < parent || (left && own == parent && own < 3) {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Contains => "contains",
        }
    }

    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte
        )
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // No escapes in the language, so pick the quote the text lacks.
            Literal::String(s) if s.contains('\'') => write!(f, "\"{}\"", s),
            Literal::String(s) => write!(f, "'{}'", s),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Null => f.write_str("null"),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Compare(c) => write!(f, "{} {} {}", c.field, c.op, c.value),
            Expression::And(l, r) | Expression::Or(l, r) => {
                let prec = self.precedence();
                let keyword = if prec == 1 { "or" } else { "and" };
                l.write_operand(f, prec, true)?;
                write!(f, " {} ", keyword)?;
                r.write_operand(f, prec, false)
            }
            Expression::Not(inner) => {
                f.write_str("not ")?;
                inner.write_operand(f, 3, false)
            }
            Expression::True => f.write_str("true"),
            Expression::False => f.write_str("false"),
        }
    }
}
