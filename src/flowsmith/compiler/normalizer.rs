// SPDX-License-Identifier: MIT

//! Graph normalization - converts a raw document into [`GraphIr`]
//!
//! Everything that makes a document impossible to analyze is rejected here
//! with [`CompileError::MalformedGraph`]; nothing downstream has to deal with
//! dangling references or unknown types.

use serde_json::{Map, Value};
use std::collections::HashSet;

use super::document::GraphDocument;
use super::registry::NodeTypeRegistry;
use crate::core::error::CompileError;
use crate::core::ir::{GraphIr, IrEdge, IrNode};
use crate::flowsmith::config::Limits;

pub struct Normalizer<'a> {
    registry: &'a NodeTypeRegistry,
    limits: Limits,
}

impl<'a> Normalizer<'a> {
    pub fn new(registry: &'a NodeTypeRegistry, limits: Limits) -> Self {
        Self { registry, limits }
    }

    /// Normalize a raw JSON document
    pub fn normalize(&self, raw: &Value) -> Result<GraphIr, CompileError> {
        let object = raw
            .as_object()
            .ok_or_else(|| CompileError::malformed("document must be an object"))?;

        self.check_collection(object, "nodes", self.limits.max_nodes)?;
        self.check_collection(object, "edges", self.limits.max_edges)?;

        let doc: GraphDocument = serde_json::from_value(raw.clone())
            .map_err(|e| CompileError::malformed(format!("invalid document: {}", e)))?;

        self.normalize_document(doc)
    }

    /// Normalize an already deserialized document
    pub fn normalize_document(&self, doc: GraphDocument) -> Result<GraphIr, CompileError> {
        self.check_size("nodes", doc.nodes.len(), self.limits.max_nodes)?;
        self.check_size("edges", doc.edges.len(), self.limits.max_edges)?;

        let mut node_ids: HashSet<&str> = HashSet::with_capacity(doc.nodes.len());
        let mut nodes = Vec::with_capacity(doc.nodes.len());

        for spec in &doc.nodes {
            if spec.id.trim().is_empty() {
                return Err(CompileError::malformed("node with an empty id"));
            }
            if !node_ids.insert(spec.id.as_str()) {
                return Err(CompileError::malformed(format!(
                    "duplicate node id '{}'",
                    spec.id
                )));
            }
            let descriptor = self.registry.get(&spec.node_type).ok_or_else(|| {
                CompileError::malformed(format!(
                    "node '{}' has unregistered type '{}'",
                    spec.id, spec.node_type
                ))
            })?;

            let mut config: Map<String, Value> = descriptor.default_config().clone();
            let mut unrecognized = Vec::new();
            for (key, value) in &spec.config {
                if !descriptor.is_recognized(key) {
                    unrecognized.push(key.clone());
                }
                // null means "not set": keep the default, if any
                if !value.is_null() {
                    config.insert(key.clone(), value.clone());
                }
            }
            unrecognized.sort();

            nodes.push(IrNode {
                id: spec.id.clone(),
                type_name: spec.node_type.clone(),
                label: spec.display_label().to_string(),
                explicit_entry: spec.entry,
                config,
                unrecognized,
            });
        }

        let mut edge_ids: HashSet<&str> = HashSet::with_capacity(doc.edges.len());
        let mut edges = Vec::with_capacity(doc.edges.len());

        for spec in &doc.edges {
            if spec.id.trim().is_empty() {
                return Err(CompileError::malformed("edge with an empty id"));
            }
            if !edge_ids.insert(spec.id.as_str()) {
                return Err(CompileError::malformed(format!(
                    "duplicate edge id '{}'",
                    spec.id
                )));
            }
            for (end, node_id) in [
                ("source", &spec.source_node_id),
                ("target", &spec.target_node_id),
            ] {
                if !node_ids.contains(node_id.as_str()) {
                    return Err(CompileError::malformed(format!(
                        "edge '{}' references unknown {} node '{}'",
                        spec.id, end, node_id
                    )));
                }
            }

            edges.push(IrEdge {
                id: spec.id.clone(),
                source: spec.source_node_id.clone(),
                target: spec.target_node_id.clone(),
                condition: spec.normalized_condition(),
                is_default: spec.is_default,
            });
        }

        let entry_node_id = match doc.entry_node_id.as_deref().map(str::trim) {
            Some(id) if id.is_empty() => None,
            Some(id) if !node_ids.contains(id) => {
                return Err(CompileError::malformed(format!(
                    "entryNodeId references unknown node '{}'",
                    id
                )))
            }
            Some(id) => Some(id.to_string()),
            None => None,
        };

        let name = if doc.name.trim().is_empty() {
            doc.id.clone()
        } else {
            doc.name.clone()
        };

        log::debug!(
            "Normalized graph '{}': {} nodes, {} edges",
            name,
            nodes.len(),
            edges.len()
        );

        Ok(GraphIr::new(
            doc.id,
            name,
            entry_node_id,
            doc.state.unwrap_or_default(),
            nodes,
            edges,
        ))
    }

    fn check_collection(
        &self,
        object: &Map<String, Value>,
        key: &'static str,
        limit: usize,
    ) -> Result<(), CompileError> {
        match object.get(key) {
            Some(Value::Array(items)) => self.check_size(key, items.len(), limit),
            Some(_) => Err(CompileError::malformed(format!("'{}' must be an array", key))),
            None => Err(CompileError::malformed(format!(
                "missing '{}' collection",
                key
            ))),
        }
    }

    fn check_size(&self, kind: &'static str, count: usize, limit: usize) -> Result<(), CompileError> {
        if count > limit {
            return Err(CompileError::GraphTooLarge { kind, count, limit });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> NodeTypeRegistry {
        NodeTypeRegistry::with_builtins().unwrap()
    }

    fn normalize(raw: Value) -> Result<GraphIr, CompileError> {
        let registry = registry();
        Normalizer::new(&registry, Limits::default()).normalize(&raw)
    }

    #[test]
    fn test_defaults_applied_and_presentation_ignored() {
        let ir = normalize(json!({
            "id": "wf",
            "nodes": [
                {"id": "a", "type": "entry", "position": {"x": 1, "y": 2}},
                {"id": "b", "type": "llm", "label": "Classify", "config": {"model": "gpt-4o", "temperature": null}}
            ],
            "edges": [{"id": "e1", "sourceNodeId": "a", "targetNodeId": "b"}]
        }))
        .unwrap();

        assert_eq!(ir.name, "wf");
        assert_eq!(ir.nodes[0].config["input_key"], "input");
        assert_eq!(ir.nodes[0].label, "a");
        let llm = ir.node("b").unwrap();
        assert_eq!(llm.label, "Classify");
        assert_eq!(llm.config["model"], "gpt-4o");
        assert_eq!(llm.config["temperature"], json!(0.7));
        assert_eq!(llm.config["output_key"], "response");
    }

    #[test]
    fn test_unrecognized_keys_kept_and_listed() {
        let ir = normalize(json!({
            "nodes": [{"id": "a", "type": "entry", "config": {"zeta": 1, "alpha": true}}],
            "edges": []
        }))
        .unwrap();
        let node = &ir.nodes[0];
        assert_eq!(node.unrecognized, vec!["alpha".to_string(), "zeta".to_string()]);
        assert_eq!(node.config["zeta"], 1);
    }

    #[test]
    fn test_dangling_edge_is_malformed() {
        let err = normalize(json!({
            "nodes": [{"id": "a", "type": "entry"}],
            "edges": [{"id": "e1", "sourceNodeId": "a", "targetNodeId": "ghost"}]
        }))
        .unwrap_err();
        assert!(matches!(err, CompileError::MalformedGraph(ref m) if m.contains("ghost")));
    }

    #[test]
    fn test_structural_defects_are_malformed() {
        let cases = vec![
            json!([]),
            json!({"edges": []}),
            json!({"nodes": {}, "edges": []}),
            json!({"nodes": [{"id": "a"}], "edges": []}),
            json!({"nodes": [{"id": "a", "type": "warp_drive"}], "edges": []}),
            json!({"nodes": [{"id": "a", "type": "entry"}, {"id": "a", "type": "terminal"}], "edges": []}),
            json!({"nodes": [{"id": " ", "type": "entry"}], "edges": []}),
            json!({
                "nodes": [{"id": "a", "type": "entry"}],
                "edges": [
                    {"id": "e", "sourceNodeId": "a", "targetNodeId": "a"},
                    {"id": "e", "sourceNodeId": "a", "targetNodeId": "a"}
                ]
            }),
            json!({"entryNodeId": "nope", "nodes": [{"id": "a", "type": "entry"}], "edges": []}),
        ];
        for raw in cases {
            let result = normalize(raw.clone());
            assert!(
                matches!(result, Err(CompileError::MalformedGraph(_))),
                "expected malformed for {}",
                raw
            );
        }
    }

    #[test]
    fn test_graph_too_large() {
        let registry = registry();
        let limits = Limits {
            max_nodes: 2,
            max_edges: 10,
        };
        let raw = json!({
            "nodes": [
                {"id": "a", "type": "entry"},
                {"id": "b", "type": "process"},
                {"id": "c", "type": "terminal"}
            ],
            "edges": []
        });
        let err = Normalizer::new(&registry, limits).normalize(&raw).unwrap_err();
        assert!(matches!(
            err,
            CompileError::GraphTooLarge { kind: "nodes", count: 3, limit: 2 }
        ));
    }

    #[test]
    fn test_size_checked_before_entries_are_parsed() {
        let registry = registry();
        let limits = Limits {
            max_nodes: 10,
            max_edges: 1,
        };
        // The edges are garbage, but there are too many of them.
        let raw = json!({"nodes": [], "edges": [1, 2]});
        let err = Normalizer::new(&registry, limits).normalize(&raw).unwrap_err();
        assert!(matches!(err, CompileError::GraphTooLarge { kind: "edges", .. }));
    }

    #[test]
    fn test_conditions_trimmed_and_entry_designation_kept() {
        let ir = normalize(json!({
            "entryNodeId": "a",
            "nodes": [
                {"id": "a", "type": "entry"},
                {"id": "b", "type": "terminal"}
            ],
            "edges": [
                {"id": "e1", "source": "a", "target": "b", "condition": "  x == 1 "},
                {"id": "e2", "source": "a", "target": "b", "condition": "", "isDefault": true}
            ]
        }))
        .unwrap();
        assert_eq!(ir.entry_node_id.as_deref(), Some("a"));
        assert_eq!(ir.edges[0].condition.as_deref(), Some("x == 1"));
        assert_eq!(ir.edges[1].condition, None);
        assert!(ir.edges[1].is_default);
    }
}
