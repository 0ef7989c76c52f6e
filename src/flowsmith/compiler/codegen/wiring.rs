// SPDX-License-Identifier: MIT

//! Edge wiring
//!
//! Each node's outgoing edges are classified into one [`Wiring`] and then
//! rendered as `StateGraph` calls. Conditional arms are tested in edge
//! declaration order, so the first-declared condition that holds wins. On a
//! branching node every unguarded edge belongs to the fallback; nothing is
//! wired alongside the branch table.

use std::collections::HashSet;

use super::python::{py_condition, py_str};
use crate::core::error::CompileError;
use crate::core::ir::GraphIr;
use crate::flowsmith::compiler::condition::{self, Expression};

/// Path-map key of the first fallback target
pub const DEFAULT_KEY: &str = "__default__";

/// One arm of a branch table
#[derive(Debug, Clone)]
pub struct Arm {
    /// Canonical condition text; also the path-map key
    pub key: String,
    pub expression: Expression,
    pub target: usize,
}

#[derive(Debug, Clone)]
pub enum Wiring {
    /// Terminal with no outgoing edges
    Finish,
    /// Non-terminal with no outgoing edges; routed to END
    DeadEnd,
    Direct(usize),
    /// Several unconditional successors run in parallel, optionally
    /// meeting again at `join` once all of them are done
    FanOut {
        targets: Vec<usize>,
        join: Option<usize>,
    },
    /// Branch of a fan-out whose edge is the fork's fan-in
    Joined,
    Branch {
        arms: Vec<Arm>,
        /// Taken together when no arm holds; END when empty
        fallback: Vec<usize>,
        limit: Option<u64>,
    },
    /// Unconditional successors that stop once the iteration limit is hit
    Guarded { targets: Vec<usize>, limit: u64 },
}

/// Path-map key of the fallback target at `position`
pub fn fallback_key(position: usize) -> String {
    if position == 0 {
        DEFAULT_KEY.to_string()
    } else {
        format!("__default_{}__", position + 1)
    }
}

/// Classify the outgoing edges of one node
pub fn plan(
    ir: &GraphIr,
    node_idx: usize,
    is_terminal: bool,
    limit: Option<u64>,
) -> Result<Wiring, CompileError> {
    let node = &ir.nodes[node_idx];
    let mut arms: Vec<Arm> = Vec::new();
    let mut keys: HashSet<String> = HashSet::new();

    for edge in ir.outgoing(node_idx) {
        let (Some(text), Some(target)) = (&edge.condition, ir.node_index(&edge.target)) else {
            continue;
        };
        let expression = condition::parse(text).map_err(|e| {
            CompileError::emit(
                &node.id,
                format!("edge '{}' has an invalid condition: {}", edge.id, e),
            )
        })?;
        // Equivalent conditions can never fire twice; the first one wins.
        let key = expression.to_string();
        if keys.insert(key.clone()) {
            arms.push(Arm {
                key,
                expression,
                target,
            });
        }
    }

    let targets = ir.fallback_targets(node_idx);
    if !arms.is_empty() {
        return Ok(Wiring::Branch {
            arms,
            fallback: targets,
            limit,
        });
    }

    Ok(match (targets.len(), limit) {
        (0, _) if is_terminal => Wiring::Finish,
        (0, _) => Wiring::DeadEnd,
        (_, Some(limit)) => Wiring::Guarded { targets, limit },
        (1, None) => Wiring::Direct(targets[0]),
        (_, None) => Wiring::FanOut {
            targets,
            join: None,
        },
    })
}

/// Collapse the fan-out at `fork` into one fan-in edge.
///
/// Applies when every branch is reached only from the fork and leads straight
/// to the same node; any other shape keeps its per-branch edges.
pub fn join_fan_in(ir: &GraphIr, fork: usize, wirings: &mut [Wiring]) {
    let Wiring::FanOut { targets, join: None } = &wirings[fork] else {
        return;
    };

    let mut join = None;
    for &branch in targets {
        let incoming = ir
            .edges
            .iter()
            .filter(|e| ir.node_index(&e.target) == Some(branch))
            .count();
        match wirings[branch] {
            Wiring::Direct(next) if incoming == 1 && join.map_or(true, |j| j == next) => {
                join = Some(next)
            }
            _ => return,
        }
    }
    let Some(next) = join else {
        return;
    };
    if targets.contains(&next) {
        return;
    }

    let targets = targets.clone();
    for &branch in &targets {
        wirings[branch] = Wiring::Joined;
    }
    wirings[fork] = Wiring::FanOut {
        targets,
        join: Some(next),
    };
}

/// Python for the route function this wiring needs, if any
pub fn route_function(
    identifier: &str,
    counter: Option<&str>,
    wiring: &Wiring,
    state_class: &str,
    names: &[String],
) -> Option<String> {
    let guard = |limit: u64, value: &str| -> Option<String> {
        counter.map(|c| {
            format!(
                "    if state.get({}, 0) >= {}:\n        return {}\n",
                py_str(c),
                limit,
                value
            )
        })
    };

    match wiring {
        Wiring::Branch {
            arms,
            fallback,
            limit,
        } => {
            // Several fallback targets are returned together as a list.
            let (returns, otherwise) = if fallback.len() > 1 {
                let keys: Vec<String> = (0..fallback.len())
                    .map(|i| py_str(&fallback_key(i)))
                    .collect();
                ("str | list[str]", format!("[{}]", keys.join(", ")))
            } else {
                ("str", py_str(DEFAULT_KEY))
            };

            let mut out = format!(
                "def route_{}(state: {}) -> {}:\n",
                identifier, state_class, returns
            );
            if let Some(guard) = limit.and_then(|l| guard(l, &otherwise)) {
                out.push_str(&guard);
            }
            for arm in arms {
                out.push_str(&format!(
                    "    if {}:\n        return {}\n",
                    py_condition(&arm.expression),
                    py_str(&arm.key)
                ));
            }
            out.push_str(&format!("    return {}\n", otherwise));
            Some(out)
        }
        Wiring::Guarded { targets, limit } => {
            let mut out = format!(
                "def route_{}(state: {}) -> list[str]:\n",
                identifier, state_class
            );
            if let Some(guard) = guard(*limit, "[END]") {
                out.push_str(&guard);
            }
            out.push_str(&format!("    return {}\n", name_list(targets, names)));
            Some(out)
        }
        _ => None,
    }
}

/// `graph.*` statements wiring one node, indented for the builder body
pub fn wiring_statements(identifier: &str, wiring: &Wiring, names: &[String]) -> Vec<String> {
    let source = py_str(identifier);
    match wiring {
        Wiring::Finish => vec![format!("graph.set_finish_point({})", source)],
        Wiring::DeadEnd => vec![
            format!("# {} has no outgoing edges", identifier),
            format!("graph.add_edge({}, END)", source),
        ],
        Wiring::Direct(target) => vec![format!(
            "graph.add_edge({}, {})",
            source,
            py_str(&names[*target])
        )],
        Wiring::FanOut { targets, join } => {
            let mut lines = vec![
                format!("for branch in {}:", name_list(targets, names)),
                format!("    graph.add_edge({}, branch)", source),
            ];
            if let Some(join) = join {
                lines.push(format!(
                    "graph.add_edge({}, {})",
                    name_list(targets, names),
                    py_str(&names[*join])
                ));
            }
            lines
        }
        Wiring::Joined => Vec::new(),
        Wiring::Branch { arms, fallback, .. } => {
            let mut lines = vec![
                "graph.add_conditional_edges(".to_string(),
                format!("    {},", source),
                format!("    route_{},", identifier),
                "    {".to_string(),
            ];
            for arm in arms {
                lines.push(format!(
                    "        {}: {},",
                    py_str(&arm.key),
                    py_str(&names[arm.target])
                ));
            }
            if fallback.is_empty() {
                lines.push(format!("        {}: END,", py_str(DEFAULT_KEY)));
            }
            for (position, target) in fallback.iter().enumerate() {
                lines.push(format!(
                    "        {}: {},",
                    py_str(&fallback_key(position)),
                    py_str(&names[*target])
                ));
            }
            lines.push("    },".to_string());
            lines.push(")".to_string());
            lines
        }
        Wiring::Guarded { targets, .. } => {
            let mut destinations: Vec<String> = targets.iter().map(|&t| py_str(&names[t])).collect();
            destinations.push("END".to_string());
            vec![format!(
                "graph.add_conditional_edges({}, route_{}, [{}])",
                source,
                identifier,
                destinations.join(", ")
            )]
        }
    }
}

fn name_list(targets: &[usize], names: &[String]) -> String {
    let items: Vec<String> = targets.iter().map(|&t| py_str(&names[t])).collect();
    format!("[{}]", items.join(", "))
}
