// SPDX-License-Identifier: MIT

//! Built-in node kinds
//!
//! - `flow` - entry, process, parallel and terminal nodes
//! - `control` - router and loop nodes
//! - `calls` - model, tool and sub-agent calls
//! - `human` - human-in-the-loop pauses

mod calls;
mod control;
mod flow;
mod human;

pub use calls::{LlmNode, SubagentNode, ToolNode};
pub use control::{LoopNode, RouterNode};
pub use flow::{EntryNode, ParallelNode, ProcessNode, TerminalNode};
pub use human::HumanNode;

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::core::ir::IrNode;
use crate::core::node_kind::NodeKind;

/// Every construct shipped with the compiler
pub fn builtin_kinds() -> Vec<Arc<dyn NodeKind>> {
    vec![
        Arc::new(EntryNode),
        Arc::new(ProcessNode),
        Arc::new(LlmNode),
        Arc::new(ToolNode),
        Arc::new(RouterNode),
        Arc::new(LoopNode),
        Arc::new(ParallelNode),
        Arc::new(HumanNode),
        Arc::new(SubagentNode),
        Arc::new(TerminalNode),
    ]
}

/// String config value or the schema default
fn key_or(node: &IrNode, field: &str, fallback: &str) -> String {
    node.config_str(field).unwrap_or(fallback).to_string()
}

/// Reject strings made only of whitespace (the schema already rejects "")
fn require_non_blank(config: &Map<String, Value>, field: &str) -> Vec<String> {
    match config.get(field).and_then(Value::as_str) {
        Some(s) if !s.is_empty() && s.trim().is_empty() => {
            vec![format!("{} must not be blank", field)]
        }
        _ => vec![],
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use serde_json::{Map, Value};

    use crate::core::ir::IrNode;
    use crate::core::node_kind::EmitContext;

    pub fn node(type_name: &str, config: Value) -> IrNode {
        IrNode {
            id: "n1".to_string(),
            type_name: type_name.to_string(),
            label: "Node one".to_string(),
            explicit_entry: false,
            config: config.as_object().cloned().unwrap_or_else(Map::new),
            unrecognized: vec![],
        }
    }

    pub fn ctx() -> EmitContext {
        EmitContext {
            identifier: "node_one".to_string(),
            runtime_module: "workflow_runtime".to_string(),
        }
    }
}
