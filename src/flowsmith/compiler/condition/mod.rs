// SPDX-License-Identifier: MIT

//! Edge condition language
//!
//! This module provides parsing of the conditions carried by routed edges.
//! Conditions are simple expressions like:
//! - `intent == 'search'`
//! - `confidence > 0.8`
//! - `intent == 'bug' and priority > 3`
//!
//! The validator rejects conditions that do not parse and compares the rest
//! by canonical form; the code generator renders them as Python.

mod ast;
mod parser;

pub use ast::{CompareOp, Comparison, Expression, Literal};
pub use parser::{parse, ConditionError};
