// SPDX-License-Identifier: MIT

use serde_json::{Map, Value};

use crate::core::error::CompileError;
use crate::core::ir::IrNode;
use crate::core::state::StateAccess;

/// Trait for workflow constructs that can appear as graph nodes.
///
/// The validator and the code generator only ever talk to a node through
/// this trait; adding a construct means adding an implementation and
/// registering it.
///
/// # Optimization Notes
/// - `type_name()`, `description()` and `config_schema()` return references;
///   implementations keep them in statics or struct fields
pub trait NodeKind: Send + Sync {
    /// Returns the type name (must be unique within a registry)
    fn type_name(&self) -> &str;

    /// Returns a human-readable description of the construct
    fn description(&self) -> &str;

    /// Returns the JSON schema for the node's config object.
    ///
    /// Property `default`s become the type's default config.
    fn config_schema(&self) -> &Value;

    fn is_entry_candidate(&self) -> bool {
        false
    }

    /// Node may legitimately have no outgoing edges
    fn is_terminal(&self) -> bool {
        false
    }

    /// Node can bound a cycle it belongs to
    fn supports_cycle_exit(&self) -> bool {
        false
    }

    /// Unreachable instances are errors rather than warnings
    fn has_mandatory_side_effects(&self) -> bool {
        self.is_terminal()
    }

    /// Config field holding an iteration bound, if the kind has one
    fn iteration_limit_field(&self) -> Option<&str> {
        None
    }

    /// How the branches of a fan-out from this node are joined; `None` for
    /// kinds that do not fork
    fn join_policy(&self, _node: &IrNode) -> Option<JoinPolicy> {
        None
    }

    /// Checks beyond what the JSON schema can express
    fn check(&self, _config: &Map<String, Value>) -> Vec<String> {
        Vec::new()
    }

    /// State fields this node reads and writes
    fn state_fields(&self, _node: &IrNode) -> Vec<StateAccess> {
        Vec::new()
    }

    /// Render the node's code unit
    fn emit(&self, node: &IrNode, ctx: &EmitContext) -> Result<NodeUnit, CompileError>;
}

/// When a node downstream of parallel branches runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPolicy {
    /// Once, after every branch has finished
    All,
    /// Each time a branch finishes
    Any,
}

/// What a node template gets to know about its surroundings
#[derive(Debug, Clone)]
pub struct EmitContext {
    /// Resolved identifier of the node being emitted
    pub identifier: String,
    /// Module runtime helpers are imported from
    pub runtime_module: String,
}

/// A name imported by generated code
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Import {
    pub module: String,
    pub name: String,
}

/// One self-contained unit of generated code: statements that compute a
/// state delta, followed by the delta itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeUnit {
    pub statements: Vec<String>,
    /// `(state key, expression)` pairs, in output order
    pub delta: Vec<(String, String)>,
    pub imports: Vec<Import>,
}

impl EmitContext {
    /// Import a helper from the configured runtime module
    pub fn runtime_import(&self, name: &str) -> Import {
        Import {
            module: self.runtime_module.clone(),
            name: name.to_string(),
        }
    }
}

impl NodeUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statement(mut self, line: impl Into<String>) -> Self {
        self.statements.push(line.into());
        self
    }

    pub fn set(mut self, key: impl Into<String>, expr: impl Into<String>) -> Self {
        self.delta.push((key.into(), expr.into()));
        self
    }

    pub fn import(mut self, import: Import) -> Self {
        if !self.imports.contains(&import) {
            self.imports.push(import);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_unit_builder() {
        let ctx = EmitContext {
            identifier: "draft".into(),
            runtime_module: "workflow_runtime".into(),
        };
        let unit = NodeUnit::new()
            .statement("value = 1")
            .set("result", "value")
            .import(ctx.runtime_import("call_model"))
            .import(ctx.runtime_import("call_model"));

        assert_eq!(unit.statements, vec!["value = 1"]);
        assert_eq!(unit.delta, vec![("result".to_string(), "value".to_string())]);
        assert_eq!(unit.imports.len(), 1);
        assert_eq!(unit.imports[0].module, "workflow_runtime");
    }
}
