// SPDX-License-Identifier: MIT

use once_cell::sync::Lazy;
use serde_json::{json, Value};

use super::key_or;
use crate::core::error::CompileError;
use crate::core::ir::IrNode;
use crate::core::node_kind::{EmitContext, JoinPolicy, NodeKind, NodeUnit};
use crate::core::state::{FieldType, StateAccess};
use crate::flowsmith::compiler::codegen::python::{py_str, state_lookup};

// --- Static schemas ---

static ENTRY_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "input_key": {
                "type": "string",
                "minLength": 1,
                "default": "input",
                "description": "State field holding the workflow input"
            }
        }
    })
});

static PROCESS_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "operation": {
                "type": "string",
                "enum": ["passthrough", "uppercase", "lowercase", "strip"],
                "default": "passthrough",
                "description": "Transformation applied to the input value"
            },
            "input_key": {"type": "string", "minLength": 1, "default": "input"},
            "output_key": {"type": "string", "minLength": 1, "default": "result"}
        }
    })
});

static PARALLEL_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "join": {
                "type": "string",
                "enum": ["all", "any"],
                "default": "all",
                "description": "Whether downstream waits for every branch or the first one"
            }
        }
    })
});

static TERMINAL_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "output_key": {
                "type": "string",
                "minLength": 1,
                "default": "result",
                "description": "State field returned as the workflow output"
            }
        }
    })
});

/// Start of the workflow; seeds the input field
pub struct EntryNode;

impl NodeKind for EntryNode {
    fn type_name(&self) -> &str {
        "entry"
    }

    fn description(&self) -> &str {
        "Workflow entry point"
    }

    fn config_schema(&self) -> &Value {
        &ENTRY_SCHEMA
    }

    fn is_entry_candidate(&self) -> bool {
        true
    }

    fn state_fields(&self, node: &IrNode) -> Vec<StateAccess> {
        vec![StateAccess::write(
            key_or(node, "input_key", "input"),
            FieldType::Any,
        )]
    }

    fn emit(&self, node: &IrNode, _ctx: &EmitContext) -> Result<NodeUnit, CompileError> {
        let key = key_or(node, "input_key", "input");
        Ok(NodeUnit::new().set(
            key.clone(),
            format!("state.get({}, \"\")", py_str(&key)),
        ))
    }
}

/// Deterministic text transformation
pub struct ProcessNode;

impl NodeKind for ProcessNode {
    fn type_name(&self) -> &str {
        "process"
    }

    fn description(&self) -> &str {
        "Deterministic transformation of one state field into another"
    }

    fn config_schema(&self) -> &Value {
        &PROCESS_SCHEMA
    }

    fn state_fields(&self, node: &IrNode) -> Vec<StateAccess> {
        vec![
            StateAccess::read(key_or(node, "input_key", "input"), FieldType::Any),
            StateAccess::write(key_or(node, "output_key", "result"), FieldType::Any),
        ]
    }

    fn emit(&self, node: &IrNode, _ctx: &EmitContext) -> Result<NodeUnit, CompileError> {
        let input = key_or(node, "input_key", "input");
        let output = key_or(node, "output_key", "result");

        let transform = match node.config_str("operation").unwrap_or("passthrough") {
            "passthrough" => None,
            "uppercase" => Some("upper"),
            "lowercase" => Some("lower"),
            "strip" => Some("strip"),
            other => {
                return Err(CompileError::emit(
                    &node.id,
                    format!("unknown operation '{}'", other),
                ))
            }
        };

        let mut unit = NodeUnit::new().statement(format!("value = {}", state_lookup(&input)));
        if let Some(method) = transform {
            unit = unit.statement(format!("value = str(value or \"\").{}()", method));
        }
        Ok(unit.set(output, "value"))
    }
}

/// Fan-out point; the fan-out itself comes from its outgoing edges
pub struct ParallelNode;

impl NodeKind for ParallelNode {
    fn type_name(&self) -> &str {
        "parallel"
    }

    fn description(&self) -> &str {
        "Runs every unconditional successor concurrently"
    }

    fn config_schema(&self) -> &Value {
        &PARALLEL_SCHEMA
    }

    fn join_policy(&self, node: &IrNode) -> Option<JoinPolicy> {
        Some(match node.config_str("join") {
            Some("any") => JoinPolicy::Any,
            _ => JoinPolicy::All,
        })
    }

    fn emit(&self, _node: &IrNode, _ctx: &EmitContext) -> Result<NodeUnit, CompileError> {
        Ok(NodeUnit::new())
    }
}

/// End of the workflow; publishes the final output
pub struct TerminalNode;

impl NodeKind for TerminalNode {
    fn type_name(&self) -> &str {
        "terminal"
    }

    fn description(&self) -> &str {
        "Workflow exit; copies the output field to final_output"
    }

    fn config_schema(&self) -> &Value {
        &TERMINAL_SCHEMA
    }

    fn is_terminal(&self) -> bool {
        true
    }

    fn state_fields(&self, node: &IrNode) -> Vec<StateAccess> {
        vec![
            StateAccess::read(key_or(node, "output_key", "result"), FieldType::Any),
            StateAccess::write("final_output", FieldType::Any),
        ]
    }

    fn emit(&self, node: &IrNode, _ctx: &EmitContext) -> Result<NodeUnit, CompileError> {
        let key = key_or(node, "output_key", "result");
        Ok(NodeUnit::new().set("final_output", state_lookup(&key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::Access;
    use crate::flowsmith::nodes::test_support::{ctx, node};

    #[test]
    fn test_entry_writes_input_key() {
        let n = node("entry", json!({"input_key": "question"}));
        let fields = EntryNode.state_fields(&n);
        assert_eq!(fields[0].name, "question");
        assert_eq!(fields[0].access, Access::Write);

        let unit = EntryNode.emit(&n, &ctx()).unwrap();
        assert_eq!(
            unit.delta,
            vec![("question".to_string(), r#"state.get("question", "")"#.to_string())]
        );
    }

    #[test]
    fn test_process_uppercase() {
        let n = node("process", json!({"operation": "uppercase", "input_key": "input", "output_key": "shout"}));
        let unit = ProcessNode.emit(&n, &ctx()).unwrap();
        assert_eq!(
            unit.statements,
            vec![
                r#"value = state.get("input")"#.to_string(),
                r#"value = str(value or "").upper()"#.to_string(),
            ]
        );
        assert_eq!(unit.delta, vec![("shout".to_string(), "value".to_string())]);
    }

    #[test]
    fn test_process_unknown_operation_is_emit_error() {
        let n = node("process", json!({"operation": "reverse"}));
        let err = ProcessNode.emit(&n, &ctx()).unwrap_err();
        assert!(matches!(err, CompileError::Emit { .. }));
    }

    #[test]
    fn test_terminal_flags() {
        assert!(TerminalNode.is_terminal());
        assert!(TerminalNode.has_mandatory_side_effects());
        assert!(!ParallelNode.is_terminal());
        assert!(!ParallelNode.has_mandatory_side_effects());
    }

    #[test]
    fn test_parallel_join_policy() {
        assert_eq!(ParallelNode.join_policy(&node("parallel", json!({}))), Some(JoinPolicy::All));
        assert_eq!(
            ParallelNode.join_policy(&node("parallel", json!({"join": "any"}))),
            Some(JoinPolicy::Any)
        );
        assert_eq!(TerminalNode.join_policy(&node("terminal", json!({}))), None);
    }

    #[test]
    fn test_terminal_publishes_output() {
        let n = node("terminal", json!({"output_key": "answer"}));
        let unit = TerminalNode.emit(&n, &ctx()).unwrap();
        assert_eq!(
            unit.delta,
            vec![("final_output".to_string(), r#"state.get("answer")"#.to_string())]
        );
    }
}
