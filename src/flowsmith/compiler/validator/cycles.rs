// SPDX-License-Identifier: MIT

//! Cycle detection
//!
//! Cycles are reported as strongly connected components, found with an
//! iterative Tarjan search. A component is cyclic when it has more than one
//! member or its only member has a self-loop. Judging exits against the whole
//! component catches loops that share nodes with an earlier one.

use crate::core::ir::GraphIr;

/// One cyclic component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    /// Member indices in declaration order
    pub members: Vec<usize>,
}

impl Cycle {
    pub fn contains(&self, node_idx: usize) -> bool {
        self.members.binary_search(&node_idx).is_ok()
    }
}

/// Find cyclic components, ordered by their first member.
pub fn find_cycles(ir: &GraphIr) -> Vec<Cycle> {
    let n = ir.nodes.len();
    let mut order: Vec<Option<usize>> = vec![None; n];
    let mut low = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut counter = 0usize;
    let mut cycles = Vec::new();

    // (node, its successors, next successor to visit)
    let mut frames: Vec<(usize, Vec<usize>, usize)> = Vec::new();

    for root in 0..n {
        if order[root].is_some() {
            continue;
        }
        order[root] = Some(counter);
        low[root] = counter;
        counter += 1;
        stack.push(root);
        on_stack[root] = true;
        frames.push((root, ir.successors(root).collect(), 0));

        while let Some(frame) = frames.last_mut() {
            let node = frame.0;
            if frame.2 < frame.1.len() {
                let succ = frame.1[frame.2];
                frame.2 += 1;
                match order[succ] {
                    None => {
                        order[succ] = Some(counter);
                        low[succ] = counter;
                        counter += 1;
                        stack.push(succ);
                        on_stack[succ] = true;
                        frames.push((succ, ir.successors(succ).collect(), 0));
                    }
                    Some(seen) if on_stack[succ] => low[node] = low[node].min(seen),
                    Some(_) => {}
                }
                continue;
            }

            frames.pop();
            if let Some(parent) = frames.last() {
                low[parent.0] = low[parent.0].min(low[node]);
            }
            if Some(low[node]) != order[node] {
                continue;
            }

            let mut members = Vec::new();
            while let Some(member) = stack.pop() {
                on_stack[member] = false;
                members.push(member);
                if member == node {
                    break;
                }
            }
            if members.len() > 1 || ir.successors(node).any(|s| s == node) {
                members.sort_unstable();
                cycles.push(Cycle { members });
            }
        }
    }

    cycles.sort_by_key(|c| c.members[0]);
    log::debug!("Cycle detection found {} cyclic component(s)", cycles.len());
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ir::{IrEdge, IrNode};
    use serde_json::Map;
    use std::collections::BTreeMap;

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> GraphIr {
        GraphIr::new(
            "g".into(),
            "g".into(),
            None,
            BTreeMap::new(),
            nodes
                .iter()
                .map(|id| IrNode {
                    id: id.to_string(),
                    type_name: "process".into(),
                    label: id.to_string(),
                    explicit_entry: false,
                    config: Map::new(),
                    unrecognized: vec![],
                })
                .collect(),
            edges
                .iter()
                .enumerate()
                .map(|(i, (s, t))| IrEdge {
                    id: format!("e{}", i),
                    source: s.to_string(),
                    target: t.to_string(),
                    condition: None,
                    is_default: false,
                })
                .collect(),
        )
    }

    fn ids(ir: &GraphIr, cycle: &Cycle) -> Vec<String> {
        cycle.members.iter().map(|&i| ir.nodes[i].id.clone()).collect()
    }

    #[test]
    fn test_acyclic() {
        let ir = graph(&["a", "b", "c", "d"], &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        assert!(find_cycles(&ir).is_empty());
    }

    #[test]
    fn test_two_node_cycle() {
        let ir = graph(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "b"), ("c", "d")]);
        let cycles = find_cycles(&ir);
        assert_eq!(cycles.len(), 1);
        assert_eq!(ids(&ir, &cycles[0]), vec!["b", "c"]);
        assert!(cycles[0].contains(2));
        assert!(!cycles[0].contains(3));
    }

    #[test]
    fn test_self_loop() {
        let ir = graph(&["a", "b"], &[("a", "a"), ("a", "b")]);
        let cycles = find_cycles(&ir);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].members, vec![0]);
    }

    #[test]
    fn test_parallel_back_edges_reported_once() {
        let ir = graph(&["a", "b"], &[("a", "b"), ("b", "a"), ("b", "a")]);
        assert_eq!(find_cycles(&ir).len(), 1);
    }

    #[test]
    fn test_distinct_cycles() {
        let ir = graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("b", "a"), ("b", "c"), ("c", "d"), ("d", "c")],
        );
        let cycles = find_cycles(&ir);
        assert_eq!(cycles.len(), 2);
        assert_eq!(ids(&ir, &cycles[0]), vec!["a", "b"]);
        assert_eq!(ids(&ir, &cycles[1]), vec!["c", "d"]);
    }

    #[test]
    fn test_loops_through_finished_nodes_share_a_component() {
        // a -> b -> a is found first; c -> b re-enters through b.
        let ir = graph(
            &["s", "a", "b", "c"],
            &[("s", "a"), ("a", "b"), ("a", "c"), ("b", "a"), ("c", "b")],
        );
        let cycles = find_cycles(&ir);
        assert_eq!(cycles.len(), 1);
        assert_eq!(ids(&ir, &cycles[0]), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_long_chain_does_not_overflow() {
        let names: Vec<String> = (0..20_000).map(|i| format!("n{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut edges: Vec<(&str, &str)> = refs.windows(2).map(|w| (w[0], w[1])).collect();
        edges.push((refs[refs.len() - 1], refs[0]));
        let ir = graph(&refs, &edges);
        let cycles = find_cycles(&ir);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].members.len(), 20_000);
    }
}
