// SPDX-License-Identifier: MIT

//! Node type registry
//!
//! A flat map from type name to [`NodeTypeDescriptor`]. The registry is built
//! once at startup and then shared read-only.

use jsonschema::JSONSchema;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::core::error::{CompileError, RegistryError};
use crate::core::ir::IrNode;
use crate::core::node_kind::{EmitContext, JoinPolicy, NodeKind, NodeUnit};
use crate::core::state::StateAccess;
use crate::flowsmith::nodes;

/// Registry entry: a node kind plus its compiled config schema
pub struct NodeTypeDescriptor {
    kind: Arc<dyn NodeKind>,
    schema: JSONSchema,
    default_config: Map<String, Value>,
    recognized: BTreeSet<String>,
}

impl NodeTypeDescriptor {
    pub fn new(kind: Arc<dyn NodeKind>) -> Result<Self, RegistryError> {
        let raw = kind.config_schema();
        let schema = JSONSchema::compile(raw).map_err(|e| RegistryError::InvalidSchema {
            type_name: kind.type_name().to_string(),
            message: e.to_string(),
        })?;

        let properties = raw
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let default_config = properties
            .iter()
            .filter_map(|(key, prop)| prop.get("default").map(|d| (key.clone(), d.clone())))
            .collect();
        let recognized = properties.keys().cloned().collect();

        Ok(Self {
            kind,
            schema,
            default_config,
            recognized,
        })
    }

    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }

    pub fn description(&self) -> &str {
        self.kind.description()
    }

    pub fn config_schema(&self) -> &Value {
        self.kind.config_schema()
    }

    pub fn default_config(&self) -> &Map<String, Value> {
        &self.default_config
    }

    /// Key is declared by the type's schema
    pub fn is_recognized(&self, key: &str) -> bool {
        self.recognized.contains(key)
    }

    pub fn is_entry_candidate(&self) -> bool {
        self.kind.is_entry_candidate()
    }

    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }

    pub fn supports_cycle_exit(&self) -> bool {
        self.kind.supports_cycle_exit()
    }

    pub fn has_mandatory_side_effects(&self) -> bool {
        self.kind.has_mandatory_side_effects()
    }

    pub fn iteration_limit_field(&self) -> Option<&str> {
        self.kind.iteration_limit_field()
    }

    /// Configured iteration bound of a node of this type, if any
    pub fn iteration_limit(&self, node: &IrNode) -> Option<u64> {
        self.iteration_limit_field()
            .and_then(|field| node.config_u64(field))
    }

    pub fn join_policy(&self, node: &IrNode) -> Option<JoinPolicy> {
        self.kind.join_policy(node)
    }

    /// Validate a config object: schema violations first, then kind checks
    pub fn validate(&self, config: &Map<String, Value>) -> Vec<String> {
        let instance = Value::Object(config.clone());
        let mut issues: Vec<String> = match self.schema.validate(&instance) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|error| {
                    let path = error.instance_path.to_string();
                    let path = path.trim_start_matches('/');
                    if path.is_empty() {
                        error.to_string()
                    } else {
                        format!("{}: {}", path.replace('/', "."), error)
                    }
                })
                .collect(),
        };
        issues.sort();
        issues.dedup();

        issues.extend(self.kind.check(config));
        issues
    }

    pub fn state_fields(&self, node: &IrNode) -> Vec<StateAccess> {
        self.kind.state_fields(node)
    }

    pub fn emit(&self, node: &IrNode, ctx: &EmitContext) -> Result<NodeUnit, CompileError> {
        self.kind.emit(node, ctx)
    }

    /// Catalog entry handed to editors
    pub fn catalog_entry(&self) -> Value {
        json!({
            "type": self.type_name(),
            "description": self.description(),
            "isEntryCandidate": self.is_entry_candidate(),
            "isTerminal": self.is_terminal(),
            "supportsCycleExit": self.supports_cycle_exit(),
            "hasMandatorySideEffects": self.has_mandatory_side_effects(),
            "iterationLimitField": self.iteration_limit_field(),
            "configSchema": self.config_schema(),
            "defaultConfig": self.default_config(),
        })
    }
}

impl std::fmt::Debug for NodeTypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeTypeDescriptor")
            .field("type_name", &self.type_name())
            .field("recognized", &self.recognized)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct NodeTypeRegistry {
    types: BTreeMap<String, NodeTypeDescriptor>,
}

impl NodeTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in construct
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for kind in nodes::builtin_kinds() {
            registry.register(kind)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, kind: Arc<dyn NodeKind>) -> Result<(), RegistryError> {
        let name = kind.type_name().to_string();
        if self.types.contains_key(&name) {
            return Err(RegistryError::DuplicateType(name));
        }
        let descriptor = NodeTypeDescriptor::new(kind)?;
        log::debug!("Registered node type: {}", name);
        self.types.insert(name, descriptor);
        Ok(())
    }

    pub fn get(&self, type_name: &str) -> Option<&NodeTypeDescriptor> {
        self.types.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Full catalog, sorted by type name
    pub fn catalog(&self) -> Value {
        Value::Array(self.types.values().map(|d| d.catalog_entry()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;

    static MOCK_SCHEMA: Lazy<Value> = Lazy::new(|| {
        json!({
            "type": "object",
            "properties": {
                "retries": {"type": "integer", "minimum": 0, "maximum": 5, "default": 1},
                "label": {"type": "string"}
            },
            "required": ["label"]
        })
    });

    static BROKEN_SCHEMA: Lazy<Value> = Lazy::new(|| json!({"type": "not-a-type"}));

    /// A mock node kind for testing
    struct MockKind {
        name: String,
        schema: &'static Lazy<Value>,
    }

    impl MockKind {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                schema: &MOCK_SCHEMA,
            }
        }
    }

    impl NodeKind for MockKind {
        fn type_name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> &str {
            "Mock node kind"
        }

        fn config_schema(&self) -> &Value {
            self.schema
        }

        fn check(&self, config: &Map<String, Value>) -> Vec<String> {
            match config.get("label").and_then(Value::as_str) {
                Some("forbidden") => vec!["label must not be 'forbidden'".to_string()],
                _ => vec![],
            }
        }

        fn emit(&self, _node: &IrNode, _ctx: &EmitContext) -> Result<NodeUnit, CompileError> {
            Ok(NodeUnit::new())
        }
    }

    fn config(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = NodeTypeRegistry::new();
        registry.register(Arc::new(MockKind::new("mock"))).unwrap();

        let descriptor = registry.get("mock").unwrap();
        assert_eq!(descriptor.type_name(), "mock");
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = NodeTypeRegistry::new();
        registry.register(Arc::new(MockKind::new("same"))).unwrap();
        let err = registry
            .register(Arc::new(MockKind::new("same")))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateType(name) if name == "same"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_schema_rejected() {
        let mut registry = NodeTypeRegistry::new();
        let kind = MockKind {
            name: "broken".to_string(),
            schema: &BROKEN_SCHEMA,
        };
        let err = registry.register(Arc::new(kind)).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidSchema { .. }));
    }

    #[test]
    fn test_default_config_from_schema() {
        let descriptor = NodeTypeDescriptor::new(Arc::new(MockKind::new("mock"))).unwrap();
        assert_eq!(descriptor.default_config().get("retries"), Some(&json!(1)));
        assert!(descriptor.default_config().get("label").is_none());
        assert!(descriptor.is_recognized("label"));
        assert!(!descriptor.is_recognized("colour"));
    }

    #[test]
    fn test_validate_reports_schema_and_kind_issues() {
        let descriptor = NodeTypeDescriptor::new(Arc::new(MockKind::new("mock"))).unwrap();

        assert!(descriptor
            .validate(&config(json!({"label": "ok", "retries": 2})))
            .is_empty());

        let issues = descriptor.validate(&config(json!({"retries": 9})));
        assert_eq!(issues.len(), 2, "{:?}", issues);
        assert!(issues.iter().any(|i| i.contains("label")));
        assert!(issues.iter().any(|i| i.starts_with("retries:")));

        let issues = descriptor.validate(&config(json!({"label": "forbidden"})));
        assert_eq!(issues, vec!["label must not be 'forbidden'".to_string()]);
    }

    #[test]
    fn test_unknown_keys_do_not_fail_schema() {
        let descriptor = NodeTypeDescriptor::new(Arc::new(MockKind::new("mock"))).unwrap();
        assert!(descriptor
            .validate(&config(json!({"label": "x", "colour": "red"})))
            .is_empty());
    }

    #[test]
    fn test_builtins_register() {
        let registry = NodeTypeRegistry::with_builtins().unwrap();
        for name in [
            "entry", "process", "llm", "tool", "router", "loop", "parallel", "human", "subagent",
            "terminal",
        ] {
            assert!(registry.contains(name), "missing built-in '{}'", name);
        }
    }

    #[test]
    fn test_catalog_is_sorted() {
        let registry = NodeTypeRegistry::with_builtins().unwrap();
        let catalog = registry.catalog();
        let names: Vec<&str> = catalog
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["type"].as_str().unwrap())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
