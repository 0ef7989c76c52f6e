// SPDX-License-Identifier: MIT

use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};

use super::{key_or, require_non_blank};
use crate::core::error::CompileError;
use crate::core::ir::IrNode;
use crate::core::node_kind::{EmitContext, NodeKind, NodeUnit};
use crate::core::state::{FieldType, ReducerType, StateAccess};
use crate::flowsmith::compiler::codegen::python::{py_str, py_value, state_lookup};

// --- Static schemas ---

static LLM_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "model": {
                "type": "string",
                "minLength": 1,
                "description": "Model name passed to the runtime"
            },
            "system_prompt": {"type": "string", "default": ""},
            "temperature": {"type": "number", "minimum": 0, "maximum": 2, "default": 0.7},
            "max_tokens": {"type": "integer", "minimum": 1},
            "input_key": {"type": "string", "minLength": 1, "default": "input"},
            "output_key": {"type": "string", "minLength": 1, "default": "response"}
        },
        "required": ["model"]
    })
});

static TOOL_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "tool_name": {
                "type": "string",
                "minLength": 1,
                "description": "Registered tool to invoke"
            },
            "arguments": {
                "type": "object",
                "default": {},
                "description": "Static arguments merged with the runtime state"
            },
            "output_key": {"type": "string", "minLength": 1, "default": "tool_result"}
        },
        "required": ["tool_name"]
    })
});

static SUBAGENT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "agent": {
                "type": "string",
                "minLength": 1,
                "description": "Name or path of the composite agent to run"
            },
            "max_iterations": {"type": "integer", "minimum": 1, "maximum": 100},
            "input_key": {"type": "string", "minLength": 1, "default": "input"},
            "output_key": {"type": "string", "minLength": 1, "default": "subagent_result"}
        },
        "required": ["agent"]
    })
});

/// Model call
pub struct LlmNode;

impl NodeKind for LlmNode {
    fn type_name(&self) -> &str {
        "llm"
    }

    fn description(&self) -> &str {
        "Calls a language model with the input field as prompt"
    }

    fn config_schema(&self) -> &Value {
        &LLM_SCHEMA
    }

    fn check(&self, config: &Map<String, Value>) -> Vec<String> {
        require_non_blank(config, "model")
    }

    fn state_fields(&self, node: &IrNode) -> Vec<StateAccess> {
        vec![
            StateAccess::read(key_or(node, "input_key", "input"), FieldType::Any),
            StateAccess::write(key_or(node, "output_key", "response"), FieldType::String),
            StateAccess::write("messages", FieldType::Array).reducer(ReducerType::Append),
        ]
    }

    fn emit(&self, node: &IrNode, ctx: &EmitContext) -> Result<NodeUnit, CompileError> {
        let model = node
            .config_str("model")
            .ok_or_else(|| CompileError::emit(&node.id, "missing model"))?;
        let input = key_or(node, "input_key", "input");
        let output = key_or(node, "output_key", "response");

        let call = format!(
            "response = call_model(model={}, system={}, prompt={}, temperature={}, max_tokens={})",
            py_str(model),
            py_str(node.config_str("system_prompt").unwrap_or("")),
            state_lookup(&input),
            node.config_value("temperature")
                .map(py_value)
                .unwrap_or_else(|| "None".to_string()),
            node.config_value("max_tokens")
                .map(py_value)
                .unwrap_or_else(|| "None".to_string()),
        );

        Ok(NodeUnit::new()
            .import(ctx.runtime_import("call_model"))
            .statement(call)
            .set(output, "response")
            .set(
                "messages",
                format!(
                    "[{{\"role\": \"assistant\", \"node\": {}, \"content\": response}}]",
                    py_str(&ctx.identifier)
                ),
            ))
    }
}

/// Tool invocation
pub struct ToolNode;

impl NodeKind for ToolNode {
    fn type_name(&self) -> &str {
        "tool"
    }

    fn description(&self) -> &str {
        "Invokes a registered tool"
    }

    fn config_schema(&self) -> &Value {
        &TOOL_SCHEMA
    }

    fn check(&self, config: &Map<String, Value>) -> Vec<String> {
        require_non_blank(config, "tool_name")
    }

    fn state_fields(&self, node: &IrNode) -> Vec<StateAccess> {
        vec![StateAccess::write(
            key_or(node, "output_key", "tool_result"),
            FieldType::Any,
        )]
    }

    fn emit(&self, node: &IrNode, ctx: &EmitContext) -> Result<NodeUnit, CompileError> {
        let tool = node
            .config_str("tool_name")
            .ok_or_else(|| CompileError::emit(&node.id, "missing tool_name"))?;
        let arguments = node
            .config_value("arguments")
            .map(py_value)
            .unwrap_or_else(|| "{}".to_string());

        Ok(NodeUnit::new()
            .import(ctx.runtime_import("invoke_tool"))
            .statement(format!(
                "result = invoke_tool({}, {}, state)",
                py_str(tool),
                arguments
            ))
            .set(key_or(node, "output_key", "tool_result"), "result"))
    }
}

/// Composite sub-agent
pub struct SubagentNode;

impl NodeKind for SubagentNode {
    fn type_name(&self) -> &str {
        "subagent"
    }

    fn description(&self) -> &str {
        "Runs a composite agent as a single step"
    }

    fn config_schema(&self) -> &Value {
        &SUBAGENT_SCHEMA
    }

    fn supports_cycle_exit(&self) -> bool {
        true
    }

    fn iteration_limit_field(&self) -> Option<&str> {
        Some("max_iterations")
    }

    fn check(&self, config: &Map<String, Value>) -> Vec<String> {
        require_non_blank(config, "agent")
    }

    fn state_fields(&self, node: &IrNode) -> Vec<StateAccess> {
        vec![
            StateAccess::read(key_or(node, "input_key", "input"), FieldType::Any),
            StateAccess::write(
                key_or(node, "output_key", "subagent_result"),
                FieldType::Any,
            ),
        ]
    }

    fn emit(&self, node: &IrNode, ctx: &EmitContext) -> Result<NodeUnit, CompileError> {
        let agent = node
            .config_str("agent")
            .ok_or_else(|| CompileError::emit(&node.id, "missing agent"))?;
        let input = key_or(node, "input_key", "input");
        let max_iterations = node
            .config_value("max_iterations")
            .map(py_value)
            .unwrap_or_else(|| "None".to_string());

        Ok(NodeUnit::new()
            .import(ctx.runtime_import("run_subagent"))
            .statement(format!(
                "result = run_subagent({}, {}, max_iterations={})",
                py_str(agent),
                state_lookup(&input),
                max_iterations
            ))
            .set(key_or(node, "output_key", "subagent_result"), "result"))
    }
}
