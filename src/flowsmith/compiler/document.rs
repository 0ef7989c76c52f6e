// SPDX-License-Identifier: MIT

//! Input document types
//!
//! This module contains the data structures the editor sends us. Anything
//! not declared here (canvas positions, viewport, styling) is ignored by
//! deserialization.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::core::state::StateFieldDef;

/// Top-level graph document
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GraphDocument {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Nodes in the graph
    pub nodes: Vec<NodeSpec>,
    /// Edges in the graph
    pub edges: Vec<EdgeSpec>,
    /// Explicit single entry designation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_node_id: Option<String>,
    /// Extra state fields; these take precedence over node-derived fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<BTreeMap<String, StateFieldDef>>,
}

/// A node in the graph
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct NodeSpec {
    /// Unique node identifier
    pub id: String,
    /// Registered node type name
    #[serde(rename = "type")]
    pub node_type: String,
    /// User-facing label; defaults to the id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Node configuration, validated against the type's schema
    #[serde(default)]
    pub config: Map<String, Value>,
    /// Flags the node as an entry candidate
    #[serde(default)]
    pub entry: bool,
}

/// A directed edge between two nodes
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EdgeSpec {
    pub id: String,
    #[serde(alias = "source")]
    pub source_node_id: String,
    #[serde(alias = "target")]
    pub target_node_id: String,
    /// Guard expression, e.g. `intent == 'search'`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Fallback arm among the source node's conditional edges
    #[serde(default)]
    pub is_default: bool,
}

impl NodeSpec {
    /// Label to show and to derive identifiers from
    pub fn display_label(&self) -> &str {
        match self.label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label,
            _ => &self.id,
        }
    }
}

impl EdgeSpec {
    /// Condition with surrounding whitespace removed; blank counts as absent
    pub fn normalized_condition(&self) -> Option<String> {
        self.condition
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    }
}

/// JSON Schema of the input document, for editors and API consumers
pub fn document_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(GraphDocument)
}
