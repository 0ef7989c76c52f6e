// SPDX-License-Identifier: MIT

//! Canonical graph intermediate representation
//!
//! A [`GraphIr`] is produced by the normalizer and consumed read-only by the
//! validator and the code generator. Nodes and edges keep their declaration
//! order, which is what every deterministic pass iterates in.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use crate::core::state::StateFieldDef;

/// Normalized workflow graph
#[derive(Debug, Clone, Serialize)]
pub struct GraphIr {
    pub id: String,
    pub name: String,
    /// Explicit single entry designation from the document
    pub entry_node_id: Option<String>,
    /// State fields declared on the document itself
    pub state: BTreeMap<String, StateFieldDef>,
    pub nodes: Vec<IrNode>,
    pub edges: Vec<IrEdge>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    #[serde(skip)]
    outgoing: Vec<Vec<usize>>,
}

/// A node after defaulting and type-checking against the registry
#[derive(Debug, Clone, Serialize)]
pub struct IrNode {
    pub id: String,
    pub type_name: String,
    pub label: String,
    /// Node was flagged as an entry candidate in the document
    pub explicit_entry: bool,
    /// Config with the type's defaults applied; unknown keys are kept
    pub config: Map<String, Value>,
    /// Config keys the type's schema does not declare, sorted
    pub unrecognized: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub condition: Option<String>,
    pub is_default: bool,
}

impl IrEdge {
    /// Edge takes part in a branch table (guarded or marked default)
    pub fn is_routed(&self) -> bool {
        self.condition.is_some() || self.is_default
    }
}

impl IrNode {
    /// Config value for `key`, treating JSON null as absent
    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.config.get(key).filter(|v| !v.is_null())
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config_value(key).and_then(Value::as_str)
    }

    pub fn config_u64(&self, key: &str) -> Option<u64> {
        self.config_value(key).and_then(Value::as_u64)
    }
}

impl GraphIr {
    /// Build the IR and its adjacency index.
    ///
    /// Edges whose endpoints are unknown are kept in `edges` but left out of
    /// the adjacency; the normalizer rejects such documents before this point.
    pub fn new(
        id: String,
        name: String,
        entry_node_id: Option<String>,
        state: BTreeMap<String, StateFieldDef>,
        nodes: Vec<IrNode>,
        edges: Vec<IrEdge>,
    ) -> Self {
        let index: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();

        let mut outgoing = vec![Vec::new(); nodes.len()];
        for (edge_idx, edge) in edges.iter().enumerate() {
            if let (Some(&src), true) = (index.get(&edge.source), index.contains_key(&edge.target))
            {
                outgoing[src].push(edge_idx);
            }
        }

        Self {
            id,
            name,
            entry_node_id,
            state,
            nodes,
            edges,
            index,
            outgoing,
        }
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&IrNode> {
        self.node_index(id).map(|i| &self.nodes[i])
    }

    /// Outgoing edges of a node, in declaration order
    pub fn outgoing(&self, node_idx: usize) -> impl Iterator<Item = &IrEdge> + '_ {
        self.outgoing
            .get(node_idx)
            .into_iter()
            .flatten()
            .map(move |&e| &self.edges[e])
    }

    pub fn out_degree(&self, node_idx: usize) -> usize {
        self.outgoing.get(node_idx).map_or(0, Vec::len)
    }

    /// Successor node indices, in edge declaration order
    pub fn successors(&self, node_idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.outgoing(node_idx)
            .filter_map(move |edge| self.node_index(&edge.target))
    }

    /// Node has a guarded edge and so picks its successors at run time
    pub fn is_branching(&self, node_idx: usize) -> bool {
        self.outgoing(node_idx).any(|e| e.condition.is_some())
    }

    /// Successors taken when no guarded edge of the node holds, deduplicated.
    ///
    /// Unconditional default edges come first, then plain edges in declaration
    /// order. A guarded default edge is the fallback only when the node has
    /// neither. Empty means the branch ends the run.
    pub fn fallback_targets(&self, node_idx: usize) -> Vec<usize> {
        let unguarded: Vec<&IrEdge> = self
            .outgoing(node_idx)
            .filter(|e| e.condition.is_none())
            .collect();

        let mut targets = Vec::new();
        let ordered = unguarded
            .iter()
            .filter(|e| e.is_default)
            .chain(unguarded.iter().filter(|e| !e.is_default));
        for edge in ordered {
            if let Some(target) = self.node_index(&edge.target) {
                if !targets.contains(&target) {
                    targets.push(target);
                }
            }
        }

        if targets.is_empty() {
            if let Some(target) = self
                .outgoing(node_idx)
                .find(|e| e.is_default)
                .and_then(|e| self.node_index(&e.target))
            {
                targets.push(target);
            }
        }
        targets
    }
}
