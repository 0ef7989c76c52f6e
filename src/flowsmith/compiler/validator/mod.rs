// SPDX-License-Identifier: MIT

//! Structural and semantic validation of a [`GraphIr`]
//!
//! Every check runs to completion; problems are collected as diagnostics and
//! never returned as errors.

mod cycles;
mod diagnostic;

pub use cycles::{find_cycles, Cycle};
pub use diagnostic::{Diagnostic, DiagnosticCode, Severity, ValidationReport};

use std::collections::{HashMap, HashSet, VecDeque};

use super::condition;
use super::registry::{NodeTypeDescriptor, NodeTypeRegistry};
use crate::core::ir::GraphIr;
use crate::core::state::FieldType;

pub struct Validator<'a> {
    registry: &'a NodeTypeRegistry,
}

impl<'a> Validator<'a> {
    pub fn new(registry: &'a NodeTypeRegistry) -> Self {
        Self { registry }
    }

    pub fn validate(&self, ir: &GraphIr) -> ValidationReport {
        let descriptors: Vec<Option<&NodeTypeDescriptor>> = ir
            .nodes
            .iter()
            .map(|n| self.registry.get(&n.type_name))
            .collect();

        let mut diagnostics = Vec::new();

        let (entry, starts) = self.detect_entry(ir, &descriptors, &mut diagnostics);
        self.check_reachability(ir, &descriptors, &starts, &mut diagnostics);
        self.check_cycles(ir, &descriptors, &mut diagnostics);
        self.check_dead_ends(ir, &descriptors, &mut diagnostics);
        self.check_configs(ir, &descriptors, &mut diagnostics);
        self.check_routes(ir, &mut diagnostics);
        self.check_conditions(ir, &mut diagnostics);
        self.check_state(ir, &descriptors, &mut diagnostics);

        let entry_node_id = entry.map(|idx| ir.nodes[idx].id.clone());
        let report = ValidationReport::new(diagnostics, entry_node_id);
        log::debug!(
            "Validated graph '{}': {} error(s), {} warning(s)",
            ir.name,
            report.errors().count(),
            report.warnings().count()
        );
        report
    }

    /// Returns the single entry, if any, and the nodes reachability starts from
    fn detect_entry(
        &self,
        ir: &GraphIr,
        descriptors: &[Option<&NodeTypeDescriptor>],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> (Option<usize>, Vec<usize>) {
        if let Some(idx) = ir.entry_node_id.as_deref().and_then(|id| ir.node_index(id)) {
            return (Some(idx), vec![idx]);
        }

        let candidates: Vec<usize> = ir
            .nodes
            .iter()
            .enumerate()
            .filter(|(i, n)| n.explicit_entry || descriptors[*i].is_some_and(|d| d.is_entry_candidate()))
            .map(|(i, _)| i)
            .collect();

        let flagged: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&i| ir.nodes[i].explicit_entry)
            .collect();

        match (candidates.len(), flagged.as_slice()) {
            (0, _) => {
                diagnostics.push(Diagnostic::error(
                    DiagnosticCode::NoEntryPoint,
                    "Graph has no entry node",
                ));
                (None, Vec::new())
            }
            (1, _) => (Some(candidates[0]), candidates),
            (_, [single]) => (Some(*single), vec![*single]),
            _ => {
                let ids: Vec<String> = candidates.iter().map(|&i| ir.nodes[i].id.clone()).collect();
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::MultipleEntryPoints,
                        format!(
                            "Graph has {} entry candidates ({}) and no single designation",
                            ids.len(),
                            ids.join(", ")
                        ),
                    )
                    .related(ids),
                );
                (None, candidates)
            }
        }
    }

    fn check_reachability(
        &self,
        ir: &GraphIr,
        descriptors: &[Option<&NodeTypeDescriptor>],
        starts: &[usize],
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        if starts.is_empty() {
            return;
        }

        let mut reached = vec![false; ir.nodes.len()];
        let mut queue: VecDeque<usize> = VecDeque::new();
        for &start in starts {
            reached[start] = true;
            queue.push_back(start);
        }
        while let Some(idx) = queue.pop_front() {
            for succ in ir.successors(idx) {
                if !reached[succ] {
                    reached[succ] = true;
                    queue.push_back(succ);
                }
            }
        }

        for (idx, node) in ir.nodes.iter().enumerate() {
            if reached[idx] {
                continue;
            }
            let message = format!("Node '{}' cannot be reached from the entry", node.label);
            let diagnostic = if descriptors[idx].is_some_and(|d| d.has_mandatory_side_effects()) {
                Diagnostic::error(DiagnosticCode::UnreachableNode, message)
            } else {
                Diagnostic::warning(DiagnosticCode::UnreachableNode, message)
            };
            diagnostics.push(diagnostic.on_node(&node.id));
        }
    }

    fn check_cycles(
        &self,
        ir: &GraphIr,
        descriptors: &[Option<&NodeTypeDescriptor>],
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        for cycle in find_cycles(ir) {
            let leaves = |target: usize| !cycle.contains(target);
            let bounded = cycle.members.iter().any(|&idx| {
                let Some(descriptor) = descriptors[idx] else {
                    return false;
                };
                if !descriptor.supports_cycle_exit() {
                    return false;
                }
                if !ir.is_branching(idx) {
                    return descriptor.iteration_limit(&ir.nodes[idx]).is_some();
                }
                // A spent limit takes the fallback, so only an arm or a
                // fallback that leaves the component ends the loop.
                ir.fallback_targets(idx).into_iter().all(leaves)
                    || ir
                        .outgoing(idx)
                        .filter(|edge| edge.condition.is_some())
                        .filter_map(|edge| ir.node_index(&edge.target))
                        .any(leaves)
            });

            let members: Vec<String> = cycle
                .members
                .iter()
                .map(|&i| ir.nodes[i].id.clone())
                .collect();
            let listed = members.join(", ");

            let diagnostic = if bounded {
                Diagnostic::warning(
                    DiagnosticCode::FeedbackLoopDetected,
                    format!("Feedback loop through {} has a bounded exit", listed),
                )
            } else {
                Diagnostic::error(
                    DiagnosticCode::UnboundedCycle,
                    format!(
                        "Cycle through {} has no member with an iteration limit or a conditional exit",
                        listed
                    ),
                )
            };
            diagnostics.push(diagnostic.on_node(members[0].clone()).related(members));
        }
    }

    fn check_dead_ends(
        &self,
        ir: &GraphIr,
        descriptors: &[Option<&NodeTypeDescriptor>],
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        for (idx, node) in ir.nodes.iter().enumerate() {
            if ir.out_degree(idx) == 0 && !descriptors[idx].is_some_and(|d| d.is_terminal()) {
                diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticCode::DeadEnd,
                        format!(
                            "Node '{}' has no outgoing edges and is not a terminal",
                            node.label
                        ),
                    )
                    .on_node(&node.id),
                );
            }
        }
    }

    fn check_configs(
        &self,
        ir: &GraphIr,
        descriptors: &[Option<&NodeTypeDescriptor>],
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        for (idx, node) in ir.nodes.iter().enumerate() {
            let Some(descriptor) = descriptors[idx] else {
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::InvalidNodeConfig,
                        format!("Node type '{}' is not registered", node.type_name),
                    )
                    .on_node(&node.id),
                );
                continue;
            };

            for issue in descriptor.validate(&node.config) {
                diagnostics.push(
                    Diagnostic::error(DiagnosticCode::InvalidNodeConfig, issue).on_node(&node.id),
                );
            }
            for key in &node.unrecognized {
                diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticCode::UnrecognizedConfigKey,
                        format!(
                            "Config key '{}' is not recognized by node type '{}'",
                            key, node.type_name
                        ),
                    )
                    .on_node(&node.id),
                );
            }
        }
    }

    fn check_routes(&self, ir: &GraphIr, diagnostics: &mut Vec<Diagnostic>) {
        for (idx, node) in ir.nodes.iter().enumerate() {
            if ir.out_degree(idx) < 2 || !ir.is_branching(idx) {
                continue;
            }
            let defaults: Vec<String> = ir
                .outgoing(idx)
                .filter(|e| e.is_default)
                .map(|e| e.id.clone())
                .collect();
            match defaults.len() {
                1 => {}
                0 => diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::MissingDefaultRoute,
                        format!(
                            "Node '{}' has conditional edges but none is marked default",
                            node.label
                        ),
                    )
                    .on_node(&node.id),
                ),
                n => diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::AmbiguousDefaultRoute,
                        format!(
                            "Node '{}' has {} default edges ({})",
                            node.label,
                            n,
                            defaults.join(", ")
                        ),
                    )
                    .on_node(&node.id),
                ),
            }
        }
    }

    fn check_conditions(&self, ir: &GraphIr, diagnostics: &mut Vec<Diagnostic>) {
        let mut arms: HashMap<&str, HashSet<String>> = HashMap::new();

        for edge in &ir.edges {
            let Some(text) = edge.condition.as_deref() else {
                continue;
            };
            let canonical = match condition::parse(text) {
                Ok(expression) => expression.to_string(),
                Err(e) => {
                    diagnostics.push(
                        Diagnostic::error(
                            DiagnosticCode::InvalidCondition,
                            format!("Condition '{}' is invalid: {}", text, e),
                        )
                        .on_node(&edge.source)
                        .on_edge(&edge.id),
                    );
                    continue;
                }
            };
            if !arms.entry(edge.source.as_str()).or_default().insert(canonical) {
                diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticCode::ShadowedCondition,
                        format!(
                            "Condition '{}' is equivalent to an earlier edge of this node",
                            text
                        ),
                    )
                    .on_node(&edge.source)
                    .on_edge(&edge.id),
                );
            }
        }
    }

    fn check_state(
        &self,
        ir: &GraphIr,
        descriptors: &[Option<&NodeTypeDescriptor>],
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let mut declared: HashMap<String, (FieldType, &str)> = HashMap::new();

        for (idx, node) in ir.nodes.iter().enumerate() {
            let Some(descriptor) = descriptors[idx] else {
                continue;
            };
            for access in descriptor.state_fields(node) {
                // Document-level declarations override node-derived ones.
                if ir.state.contains_key(&access.name) {
                    continue;
                }
                let field_type = access.field.field_type;
                match declared.get(&access.name) {
                    None => {
                        declared.insert(access.name, (field_type, node.id.as_str()));
                    }
                    Some(&(first, owner)) => {
                        if first != field_type
                            && first != FieldType::Any
                            && field_type != FieldType::Any
                        {
                            diagnostics.push(
                                Diagnostic::warning(
                                    DiagnosticCode::StateTypeConflict,
                                    format!(
                                        "State field '{}' is {} here but {} on node '{}'",
                                        access.name, field_type, first, owner
                                    ),
                                )
                                .on_node(&node.id)
                                .related(vec![owner.to_string(), node.id.clone()]),
                            );
                        }
                    }
                }
            }
        }
    }
}
