// SPDX-License-Identifier: MIT

//! Python rendering helpers
//!
//! Everything here is a pure function of its input so that generated
//! modules are byte-for-byte reproducible.

use serde_json::Value;

use crate::core::state::{FieldType, ReducerType, StateFieldDef};
use crate::flowsmith::compiler::condition::{CompareOp, Comparison, Expression, Literal};

/// Double-quoted Python string literal
pub fn py_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Python literal for a JSON value
pub fn py_value(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => py_str(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(py_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", py_str(k), py_value(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Name usable as a class attribute in generated code
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !KEYWORDS.contains(&name)
}

/// Text safe to place after `#` on a single line
pub fn comment_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Read a (possibly dotted) field from `state`
pub fn state_lookup(path: &str) -> String {
    let mut segments = path.split('.');
    let mut expr = match segments.next() {
        Some(first) => format!("state.get({})", py_str(first)),
        None => return "None".to_string(),
    };
    for segment in segments {
        expr = format!("({} or {{}}).get({})", expr, py_str(segment));
    }
    expr
}

/// Render a parsed condition as a Python boolean expression over `state`
pub fn py_condition(expr: &Expression) -> String {
    match expr {
        Expression::True => "True".to_string(),
        Expression::False => "False".to_string(),
        Expression::Not(inner) => format!("(not {})", py_condition(inner)),
        Expression::And(l, r) => format!("({} and {})", py_condition(l), py_condition(r)),
        Expression::Or(l, r) => format!("({} or {})", py_condition(l), py_condition(r)),
        Expression::Compare(Comparison { field, op, value }) => {
            let field = state_lookup(field);
            let lit = py_literal(value);
            match (op, value) {
                (CompareOp::Eq, Literal::Null) => format!("{} is None", field),
                (CompareOp::NotEq, Literal::Null) => format!("{} is not None", field),
                (CompareOp::Eq, _) => format!("{} == {}", field, lit),
                (CompareOp::NotEq, _) => format!("{} != {}", field, lit),
                (CompareOp::Contains, _) => format!("{} in ({} or [])", lit, field),
                (CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte, _) => {
                    format!("({} is not None and {} {} {})", field, field, op, lit)
                }
            }
        }
    }
}

fn py_literal(lit: &Literal) -> String {
    match lit {
        Literal::String(s) => py_str(s),
        Literal::Number(n) => format!("{}", n),
        Literal::Boolean(true) => "True".to_string(),
        Literal::Boolean(false) => "False".to_string(),
        Literal::Null => "None".to_string(),
    }
}

/// Type annotation for a state field, including its reducer
pub fn py_annotation(field: &StateFieldDef) -> String {
    let base = match field.field_type {
        FieldType::String => "str",
        FieldType::Number => "float",
        FieldType::Integer => "int",
        FieldType::Boolean => "bool",
        FieldType::Array => "list",
        FieldType::Object => "dict",
        FieldType::Any => "Any",
    };
    match field.reducer {
        ReducerType::Overwrite => base.to_string(),
        ReducerType::Append => format!("Annotated[{}, operator.add]", base),
        ReducerType::Max => format!("Annotated[{}, max]", base),
        ReducerType::Min => format!("Annotated[{}, min]", base),
        ReducerType::Merge => format!("Annotated[{}, operator.or_]", base),
    }
}

/// Reducer needs `import operator`
pub fn needs_operator(field: &StateFieldDef) -> bool {
    matches!(field.reducer, ReducerType::Append | ReducerType::Merge)
}
