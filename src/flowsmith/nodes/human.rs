// SPDX-License-Identifier: MIT

use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};

use super::{key_or, require_non_blank};
use crate::core::error::CompileError;
use crate::core::ir::IrNode;
use crate::core::node_kind::{EmitContext, Import, NodeKind, NodeUnit};
use crate::core::state::{FieldType, StateAccess};
use crate::flowsmith::compiler::codegen::python::py_str;

static HUMAN_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "prompt": {
                "type": "string",
                "minLength": 1,
                "description": "Question shown to the reviewer"
            },
            "output_key": {"type": "string", "minLength": 1, "default": "human_response"}
        },
        "required": ["prompt"]
    })
});

/// Pauses the workflow until a person answers
pub struct HumanNode;

impl NodeKind for HumanNode {
    fn type_name(&self) -> &str {
        "human"
    }

    fn description(&self) -> &str {
        "Human-in-the-loop pause; resumes with the reviewer's answer"
    }

    fn config_schema(&self) -> &Value {
        &HUMAN_SCHEMA
    }

    fn has_mandatory_side_effects(&self) -> bool {
        true
    }

    fn check(&self, config: &Map<String, Value>) -> Vec<String> {
        require_non_blank(config, "prompt")
    }

    fn state_fields(&self, node: &IrNode) -> Vec<StateAccess> {
        vec![StateAccess::write(
            key_or(node, "output_key", "human_response"),
            FieldType::Any,
        )]
    }

    fn emit(&self, node: &IrNode, ctx: &EmitContext) -> Result<NodeUnit, CompileError> {
        let prompt = node
            .config_str("prompt")
            .ok_or_else(|| CompileError::emit(&node.id, "missing prompt"))?;

        Ok(NodeUnit::new()
            .import(Import {
                module: "langgraph.types".to_string(),
                name: "interrupt".to_string(),
            })
            .statement(format!(
                "answer = interrupt({{\"prompt\": {}, \"node\": {}}})",
                py_str(prompt),
                py_str(&ctx.identifier)
            ))
            .set(key_or(node, "output_key", "human_response"), "answer"))
    }
}
