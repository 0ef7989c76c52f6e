// SPDX-License-Identifier: MIT

//! Code generation
//!
//! Emits one Python module per graph: a `TypedDict` state declaration, one
//! function per node, one route function per branching node and a builder
//! that assembles a `StateGraph`. Output depends only on the IR, so the same
//! graph always produces byte-identical source.

pub mod python;
mod wiring;

pub use wiring::{Arm, Wiring, DEFAULT_KEY};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::ident::IdentifierResolver;
use super::registry::{NodeTypeDescriptor, NodeTypeRegistry};
use super::validator::{Diagnostic, ValidationReport};
use crate::core::error::CompileError;
use crate::core::ir::GraphIr;
use crate::core::node_kind::{EmitContext, JoinPolicy, NodeUnit};
use crate::core::state::{FieldType, ReducerType, StateFieldDef};
use crate::flowsmith::config::CodegenOptions;
use python::{comment_text, is_identifier, needs_operator, py_annotation, py_str, py_value};

/// Output of a successful generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledArtifact {
    pub source_text: String,
    pub entry_identifier: String,
    /// Warnings carried over from validation
    pub diagnostics: Vec<Diagnostic>,
}

pub struct CodeGenerator<'a> {
    registry: &'a NodeTypeRegistry,
    options: CodegenOptions,
}

/// Per-node facts gathered before rendering
struct NodePlan<'a> {
    identifier: String,
    descriptor: &'a NodeTypeDescriptor,
    counter: Option<String>,
    wiring: Wiring,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(registry: &'a NodeTypeRegistry, options: CodegenOptions) -> Self {
        Self { registry, options }
    }

    /// Generate with a fresh identifier resolver
    pub fn generate(
        &self,
        ir: &GraphIr,
        report: &ValidationReport,
    ) -> Result<CompiledArtifact, CompileError> {
        self.generate_with(ir, report, &mut IdentifierResolver::new())
    }

    /// Generate, resolving identifiers through a resolver kept by the caller
    pub fn generate_with(
        &self,
        ir: &GraphIr,
        report: &ValidationReport,
        resolver: &mut IdentifierResolver,
    ) -> Result<CompiledArtifact, CompileError> {
        if !report.is_valid {
            return Err(CompileError::InvalidGraph {
                errors: report.errors().count(),
            });
        }

        let entry_idx = report
            .entry_node_id
            .as_deref()
            .and_then(|id| ir.node_index(id))
            .ok_or_else(|| CompileError::emit(&ir.id, "validation resolved no entry node"))?;

        let mut descriptors = Vec::with_capacity(ir.nodes.len());
        let mut limits = Vec::with_capacity(ir.nodes.len());
        let mut wirings = Vec::with_capacity(ir.nodes.len());
        for (idx, node) in ir.nodes.iter().enumerate() {
            let descriptor = self.registry.get(&node.type_name).ok_or_else(|| {
                CompileError::UnsupportedNodeType {
                    node_id: node.id.clone(),
                    type_name: node.type_name.clone(),
                }
            })?;
            let limit = descriptor.iteration_limit(node);
            wirings.push(wiring::plan(ir, idx, descriptor.is_terminal(), limit)?);
            descriptors.push(descriptor);
            limits.push(limit);
        }
        for (idx, node) in ir.nodes.iter().enumerate() {
            if descriptors[idx].join_policy(node) == Some(JoinPolicy::All) {
                wiring::join_fan_in(ir, idx, &mut wirings);
            }
        }

        // StateGraph rejects a node named like a state key.
        let mut state = self.state_fields(ir, &descriptors, &wirings);
        let reserved: HashSet<String> = state.keys().cloned().collect();
        let identifiers = resolver.resolve_reserving(&ir.nodes, &reserved)?;
        let names: Vec<String> = ir
            .nodes
            .iter()
            .map(|n| identifiers.get(&n.id).cloned().unwrap_or_default())
            .collect();

        let mut taken = reserved;
        taken.extend(names.iter().cloned());
        let mut plans = Vec::with_capacity(ir.nodes.len());
        for (idx, ((descriptor, limit), wiring)) in
            descriptors.into_iter().zip(limits).zip(wirings).enumerate()
        {
            let counter = limit.map(|_| unclaimed(format!("{}_iterations", names[idx]), &mut taken));
            if let Some(counter) = &counter {
                state.insert(counter.clone(), StateFieldDef::new(FieldType::Integer));
            }
            plans.push(NodePlan {
                identifier: names[idx].clone(),
                descriptor,
                counter,
                wiring,
            });
        }

        let mut units = Vec::with_capacity(plans.len());
        for (node, plan) in ir.nodes.iter().zip(&plans) {
            let ctx = EmitContext {
                identifier: plan.identifier.clone(),
                runtime_module: self.options.runtime_module.clone(),
            };
            units.push(plan.descriptor.emit(node, &ctx)?);
        }

        let seeds_defaults = state.values().any(|f| f.default.is_some());
        let mut out = String::new();
        self.render_header(&mut out, ir, &state, &units);
        self.render_state(&mut out, &state);
        for (idx, ((node, plan), unit)) in ir.nodes.iter().zip(&plans).zip(&units).enumerate() {
            let seeds = seeds_defaults && idx == entry_idx;
            self.render_node(&mut out, node.label.as_str(), plan, unit, seeds);
        }
        for plan in &plans {
            if let Some(route) = wiring::route_function(
                &plan.identifier,
                plan.counter.as_deref(),
                &plan.wiring,
                &self.options.state_class,
                &names,
            ) {
                out.push_str("\n\n");
                out.push_str(&route);
            }
        }
        self.render_builder(&mut out, &plans, &names, entry_idx);

        log::debug!(
            "Generated {} bytes for graph '{}' ({} node units)",
            out.len(),
            ir.name,
            units.len()
        );

        Ok(CompiledArtifact {
            source_text: out,
            entry_identifier: names[entry_idx].clone(),
            diagnostics: report.diagnostics.clone(),
        })
    }

    /// Document declarations first, then node declarations in node order;
    /// the first declaration of a name wins. Fields only read by edge
    /// conditions are declared as `Any`. Iteration counters are added later,
    /// once node identifiers are known.
    fn state_fields(
        &self,
        ir: &GraphIr,
        descriptors: &[&NodeTypeDescriptor],
        wirings: &[Wiring],
    ) -> BTreeMap<String, StateFieldDef> {
        let mut fields = ir.state.clone();
        for ((node, descriptor), wiring) in ir.nodes.iter().zip(descriptors).zip(wirings) {
            for access in descriptor.state_fields(node) {
                fields.entry(access.name).or_insert(access.field);
            }
            if let Wiring::Branch { arms, .. } = wiring {
                for path in arms.iter().flat_map(|arm| arm.expression.fields()) {
                    let root = path.split('.').next().unwrap_or(path);
                    fields
                        .entry(root.to_string())
                        .or_insert_with(|| StateFieldDef::new(FieldType::Any));
                }
            }
        }
        fields
    }

    fn render_header(
        &self,
        out: &mut String,
        ir: &GraphIr,
        state: &BTreeMap<String, StateFieldDef>,
        units: &[NodeUnit],
    ) {
        out.push_str(&format!(
            "# Generated by flowsmith-rs from workflow \"{}\".\n",
            comment_text(&ir.name)
        ));
        out.push_str("# Do not edit by hand: regenerate from the graph document instead.\n");
        out.push_str("from __future__ import annotations\n\n");

        if state.values().any(needs_operator) {
            out.push_str("import operator\n");
        }
        let annotated = state.values().any(|f| f.reducer != ReducerType::Overwrite);
        out.push_str(if annotated {
            "from typing import Annotated, Any, TypedDict\n\n"
        } else {
            "from typing import Any, TypedDict\n\n"
        });

        let mut imports: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        imports
            .entry("langgraph.graph")
            .or_default()
            .extend(["END", "StateGraph"]);
        for import in units.iter().flat_map(|u| &u.imports) {
            imports
                .entry(import.module.as_str())
                .or_default()
                .insert(import.name.as_str());
        }
        for (module, names) in imports {
            let names: Vec<&str> = names.into_iter().collect();
            out.push_str(&format!("from {} import {}\n", module, names.join(", ")));
        }
    }

    fn render_state(&self, out: &mut String, state: &BTreeMap<String, StateFieldDef>) {
        let class = &self.options.state_class;
        // Field names that are not plain identifiers need the functional form.
        if !state.keys().all(|name| is_identifier(name)) {
            out.push_str(&format!(
                "\n\n{} = TypedDict(\n    {},\n    {{\n",
                class,
                py_str(class)
            ));
            for (name, field) in state {
                out.push_str(&format!("        {}: {},\n", py_str(name), py_annotation(field)));
            }
            out.push_str("    },\n    total=False,\n)\n");
            self.render_defaults(out, state);
            return;
        }

        out.push_str(&format!("\n\nclass {}(TypedDict, total=False):\n", class));
        if state.is_empty() {
            out.push_str("    pass\n");
        }
        for (name, field) in state {
            out.push_str(&format!("    {}: {}\n", name, py_annotation(field)));
        }
        self.render_defaults(out, state);
    }

    /// Declared defaults, seeded by the entry node for keys the caller left out
    fn render_defaults(&self, out: &mut String, state: &BTreeMap<String, StateFieldDef>) {
        let defaults: Vec<(&String, &serde_json::Value)> = state
            .iter()
            .filter_map(|(name, field)| field.default.as_ref().map(|value| (name, value)))
            .collect();
        if defaults.is_empty() {
            return;
        }
        out.push_str("\n\nSTATE_DEFAULTS: dict[str, Any] = {\n");
        for (name, value) in defaults {
            out.push_str(&format!("    {}: {},\n", py_str(name), py_value(value)));
        }
        out.push_str("}\n");
    }

    fn render_node(
        &self,
        out: &mut String,
        label: &str,
        plan: &NodePlan<'_>,
        unit: &NodeUnit,
        seeds_defaults: bool,
    ) {
        out.push_str(&format!(
            "\n\ndef node_{}(state: {}) -> dict[str, Any]:\n",
            plan.identifier, self.options.state_class
        ));
        out.push_str(&format!(
            "    {}\n",
            py_str(&format!("{} ({})", label, plan.descriptor.type_name()))
        ));
        for statement in &unit.statements {
            out.push_str(&format!("    {}\n", statement));
        }

        let mut delta: Vec<String> = unit
            .delta
            .iter()
            .map(|(key, expr)| format!("{}: {}", py_str(key), expr))
            .collect();
        if let Some(counter) = &plan.counter {
            delta.push(format!(
                "{}: state.get({}, 0) + 1",
                py_str(counter),
                py_str(counter)
            ));
        }
        if seeds_defaults {
            delta.push(
                "**{key: value for key, value in STATE_DEFAULTS.items() if key not in state}"
                    .to_string(),
            );
        }

        if delta.is_empty() {
            out.push_str("    return {}\n");
        } else {
            out.push_str("    return {\n");
            for entry in delta {
                out.push_str(&format!("        {},\n", entry));
            }
            out.push_str("    }\n");
        }
    }

    fn render_builder(
        &self,
        out: &mut String,
        plans: &[NodePlan<'_>],
        names: &[String],
        entry_idx: usize,
    ) {
        out.push_str(&format!("\n\ndef {}():\n", self.options.builder_function));
        out.push_str(&format!(
            "    graph = StateGraph({})\n",
            self.options.state_class
        ));
        for plan in plans {
            out.push_str(&format!(
                "    graph.add_node({}, node_{})\n",
                py_str(&plan.identifier),
                plan.identifier
            ));
        }
        out.push_str(&format!(
            "    graph.set_entry_point({})\n",
            py_str(&names[entry_idx])
        ));
        for plan in plans {
            for line in wiring::wiring_statements(&plan.identifier, &plan.wiring, names) {
                out.push_str(&format!("    {}\n", line));
            }
        }
        out.push_str("    return graph.compile()\n");
    }
}

/// `base`, or `base_2`, `base_3`, ... if taken; the result is marked taken
fn unclaimed(base: String, taken: &mut HashSet<String>) -> String {
    let mut candidate = base.clone();
    let mut suffix = 2;
    while !taken.insert(candidate.clone()) {
        candidate = format!("{}_{}", base, suffix);
        suffix += 1;
    }
    candidate
}
