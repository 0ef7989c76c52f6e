// SPDX-License-Identifier: MIT

//! Core building blocks shared by the compiler and the node kinds
//!
//! - `error` - typed error hierarchy
//! - `ir` - normalized graph representation
//! - `node_kind` - the `NodeKind` trait every construct implements
//! - `state` - state field declarations

pub mod error;
pub mod ir;
pub mod node_kind;
pub mod state;
