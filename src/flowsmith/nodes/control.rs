// SPDX-License-Identifier: MIT

use once_cell::sync::Lazy;
use serde_json::{json, Value};

use crate::core::error::CompileError;
use crate::core::ir::IrNode;
use crate::core::node_kind::{EmitContext, NodeKind, NodeUnit};

// --- Static schemas ---

static ROUTER_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "max_iterations": {
                "type": "integer",
                "minimum": 1,
                "maximum": 1000,
                "description": "Take the default route once the node has run this many times"
            }
        }
    })
});

static LOOP_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "max_iterations": {
                "type": "integer",
                "minimum": 1,
                "maximum": 1000,
                "description": "Number of passes before the loop exits"
            }
        },
        "required": ["max_iterations"]
    })
});

/// Picks the next step from its outgoing edge conditions
pub struct RouterNode;

impl NodeKind for RouterNode {
    fn type_name(&self) -> &str {
        "router"
    }

    fn description(&self) -> &str {
        "Conditional routing over the outgoing edges"
    }

    fn config_schema(&self) -> &Value {
        &ROUTER_SCHEMA
    }

    fn supports_cycle_exit(&self) -> bool {
        true
    }

    fn iteration_limit_field(&self) -> Option<&str> {
        Some("max_iterations")
    }

    fn emit(&self, _node: &IrNode, _ctx: &EmitContext) -> Result<NodeUnit, CompileError> {
        // Routing lives in the wiring; the node itself does not touch state.
        Ok(NodeUnit::new())
    }
}

/// Head of a bounded loop
pub struct LoopNode;

impl NodeKind for LoopNode {
    fn type_name(&self) -> &str {
        "loop"
    }

    fn description(&self) -> &str {
        "Bounded iteration; exits through its default route after max_iterations passes"
    }

    fn config_schema(&self) -> &Value {
        &LOOP_SCHEMA
    }

    fn supports_cycle_exit(&self) -> bool {
        true
    }

    fn iteration_limit_field(&self) -> Option<&str> {
        Some("max_iterations")
    }

    fn emit(&self, _node: &IrNode, _ctx: &EmitContext) -> Result<NodeUnit, CompileError> {
        Ok(NodeUnit::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flowsmith::compiler::registry::NodeTypeDescriptor;
    use crate::flowsmith::nodes::test_support::node;
    use std::sync::Arc;

    #[test]
    fn test_loop_requires_max_iterations() {
        let descriptor = NodeTypeDescriptor::new(Arc::new(LoopNode)).unwrap();
        let issues = descriptor.validate(&serde_json::Map::new());
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("max_iterations"));
    }

    #[test]
    fn test_router_bound_is_optional_but_ranged() {
        let descriptor = NodeTypeDescriptor::new(Arc::new(RouterNode)).unwrap();
        assert!(descriptor.validate(&serde_json::Map::new()).is_empty());

        let config = json!({"max_iterations": 0});
        let issues = descriptor.validate(config.as_object().unwrap());
        assert_eq!(issues.len(), 1);
        assert!(issues[0].starts_with("max_iterations:"));
    }

    #[test]
    fn test_iteration_limit_read_from_config() {
        let descriptor = NodeTypeDescriptor::new(Arc::new(RouterNode)).unwrap();
        assert_eq!(
            descriptor.iteration_limit(&node("router", json!({"max_iterations": 3}))),
            Some(3)
        );
        assert_eq!(descriptor.iteration_limit(&node("router", json!({}))), None);
    }
}
