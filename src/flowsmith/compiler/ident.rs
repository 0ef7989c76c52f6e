// SPDX-License-Identifier: MIT

//! Identifier resolution
//!
//! Turns user-facing node labels into code-safe identifiers. Collisions get a
//! numeric suffix (`_2`, `_3`, ...) in node declaration order. A resolver that
//! is kept across compiles remembers what it handed out, so a node keeps its
//! identifier for as long as its label stays the same.

use std::collections::{HashMap, HashSet};

use crate::core::error::CompileError;
use crate::core::ir::IrNode;

/// Candidates tried per node before giving up
pub const DEFAULT_MAX_ATTEMPTS: usize = 10_000;

/// Identifier assigned to each node id
pub type IdentifierMap = HashMap<String, String>;

/// Lowercase slug made of ASCII alphanumerics and single underscores
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut pending_underscore = false;

    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_underscore && !slug.is_empty() {
                slug.push('_');
            }
            pending_underscore = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_underscore = true;
        }
    }

    if slug.is_empty() {
        return "node".to_string();
    }
    if slug.starts_with(|c: char| c.is_ascii_digit()) {
        slug.insert_str(0, "n_");
    }
    slug
}

#[derive(Debug, Clone)]
struct Assigned {
    label: String,
    identifier: String,
}

/// Resolves identifiers for the nodes of one document
#[derive(Debug, Clone)]
pub struct IdentifierResolver {
    memo: HashMap<String, Assigned>,
    max_attempts: usize,
}

impl IdentifierResolver {
    pub fn new() -> Self {
        Self {
            memo: HashMap::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Number of remembered assignments
    pub fn len(&self) -> usize {
        self.memo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }

    /// Assign an identifier to every node.
    pub fn resolve(&mut self, nodes: &[IrNode]) -> Result<IdentifierMap, CompileError> {
        self.resolve_reserving(nodes, &HashSet::new())
    }

    /// Assign identifiers that avoid every name in `reserved`.
    ///
    /// Remembered identifiers whose node still exists with the same label are
    /// kept first, unless they are now reserved; everything else is resolved
    /// from its label afterwards.
    pub fn resolve_reserving(
        &mut self,
        nodes: &[IrNode],
        reserved: &HashSet<String>,
    ) -> Result<IdentifierMap, CompileError> {
        let present: HashMap<&str, &str> = nodes
            .iter()
            .map(|n| (n.id.as_str(), n.label.as_str()))
            .collect();
        self.memo.retain(|id, assigned| {
            present.get(id.as_str()) == Some(&assigned.label.as_str())
                && !reserved.contains(&assigned.identifier)
        });

        let mut taken: HashSet<String> = reserved.clone();
        let mut resolved = IdentifierMap::with_capacity(nodes.len());

        for node in nodes {
            if let Some(assigned) = self.memo.get(&node.id) {
                if taken.insert(assigned.identifier.clone()) {
                    resolved.insert(node.id.clone(), assigned.identifier.clone());
                }
            }
        }

        for node in nodes {
            if resolved.contains_key(&node.id) {
                continue;
            }
            let identifier = self.disambiguate(node, &taken)?;
            taken.insert(identifier.clone());
            self.memo.insert(
                node.id.clone(),
                Assigned {
                    label: node.label.clone(),
                    identifier: identifier.clone(),
                },
            );
            resolved.insert(node.id.clone(), identifier);
        }

        log::debug!("Resolved {} identifiers", resolved.len());
        Ok(resolved)
    }

    fn disambiguate(&self, node: &IrNode, taken: &HashSet<String>) -> Result<String, CompileError> {
        let base = slugify(&node.label);
        if !taken.contains(&base) {
            return Ok(base);
        }
        for suffix in 2..=self.max_attempts {
            let candidate = format!("{}_{}", base, suffix);
            if !taken.contains(&candidate) {
                return Ok(candidate);
            }
        }
        Err(CompileError::IdentifierResolution {
            node_id: node.id.clone(),
            base,
            attempts: self.max_attempts,
        })
    }
}

impl Default for IdentifierResolver {
    fn default() -> Self {
        Self::new()
    }
}
