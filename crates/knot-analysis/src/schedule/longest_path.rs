//! Longest weighted path through a DAG.
//!
//! Memoized depth-first search: the best path starting at a node is the node's
//! own duration plus the best path among its dependents. The walk uses an
//! explicit stack and detects back edges, returning `None` for cyclic input.
//!
//! On the same graph and durations, [`LongestPath::duration`] equals the
//! project duration computed by the forward/backward CPM passes.

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::graph::DependencyGraph;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongestPath {
    /// Item ids from the first prerequisite to the final dependent.
    pub path: Vec<String>,
    /// Sum of durations along `path`.
    pub duration: u64,
}

/// Find the single longest path, weighting each node by `duration_of`.
///
/// Ties go to the node that appears first in graph order, both for the start
/// of the path and at every branch. Returns `None` if the graph is cyclic.
pub fn find_longest_path<F>(graph: &DependencyGraph, duration_of: F) -> Option<LongestPath>
where
    F: Fn(&str) -> u64,
{
    let g = graph.graph();
    // node → (best total from here, next hop on that path)
    let mut memo: Vec<Option<(u64, Option<NodeIndex>)>> = vec![None; g.node_count()];
    let mut on_stack = vec![false; g.node_count()];

    for root in g.node_indices() {
        if memo[root.index()].is_some() {
            continue;
        }

        let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> =
            vec![(root, graph.dependents_of(root), 0)];
        on_stack[root.index()] = true;

        while let Some(frame) = stack.last_mut() {
            let (node, dependents, next) = (frame.0, &frame.1, &mut frame.2);

            if let Some(&child) = dependents.get(*next) {
                *next += 1;
                if on_stack[child.index()] {
                    return None;
                }
                if memo[child.index()].is_none() {
                    on_stack[child.index()] = true;
                    stack.push((child, graph.dependents_of(child), 0));
                }
                continue;
            }

            // All dependents are memoized; settle this node.
            let mut best: Option<(u64, NodeIndex)> = None;
            for &child in dependents {
                if let Some((total, _)) = memo[child.index()] {
                    if best.is_none_or(|(b, _)| total > b) {
                        best = Some((total, child));
                    }
                }
            }
            let own = duration_of(&g[node]);
            memo[node.index()] = Some(match best {
                Some((total, child)) => (own.saturating_add(total), Some(child)),
                None => (own, None),
            });
            on_stack[node.index()] = false;
            stack.pop();
        }
    }

    let mut start: Option<(NodeIndex, u64)> = None;
    for idx in g.node_indices() {
        let total = memo[idx.index()].map_or(0, |(t, _)| t);
        if start.is_none_or(|(_, b)| total > b) {
            start = Some((idx, total));
        }
    }

    let Some((first, duration)) = start else {
        return Some(LongestPath {
            path: Vec::new(),
            duration: 0,
        });
    };

    let mut path = vec![g[first].clone()];
    let mut cursor = first;
    while let Some((_, Some(next))) = memo[cursor.index()] {
        path.push(g[next].clone());
        cursor = next;
    }

    Some(LongestPath { path, duration })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn graph(nodes: &[&str], deps: &[(&str, &str)]) -> DependencyGraph {
        DependencyGraph::from_dependency_pairs(
            nodes.iter().map(|n| (*n).to_string()),
            deps.iter().map(|(s, t)| ((*s).to_string(), (*t).to_string())),
        )
    }

    fn weights(pairs: &[(&str, u64)]) -> impl Fn(&str) -> u64 {
        let map: HashMap<String, u64> = pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect();
        move |id| map.get(id).copied().unwrap_or(0)
    }

    #[test]
    fn empty_graph_is_zero() {
        let lp = find_longest_path(&graph(&[], &[]), |_| 1).unwrap();
        assert!(lp.path.is_empty());
        assert_eq!(lp.duration, 0);
    }

    #[test]
    fn chain_sums_durations() {
        let g = graph(&["a", "b", "c"], &[("b", "a"), ("c", "b")]);
        let lp = find_longest_path(&g, weights(&[("a", 2), ("b", 3), ("c", 1)])).unwrap();
        assert_eq!(lp.path, vec!["a", "b", "c"]);
        assert_eq!(lp.duration, 6);
    }

    #[test]
    fn diamond_takes_heavier_branch() {
        let g = graph(
            &["a", "b", "c", "d"],
            &[("b", "a"), ("c", "a"), ("d", "b"), ("d", "c")],
        );
        let lp = find_longest_path(&g, weights(&[("a", 1), ("b", 5), ("c", 2), ("d", 1)])).unwrap();
        assert_eq!(lp.path, vec!["a", "b", "d"]);
        assert_eq!(lp.duration, 7);
    }

    #[test]
    fn isolated_heavy_node_can_win() {
        let g = graph(&["a", "b", "solo"], &[("b", "a")]);
        let lp = find_longest_path(&g, weights(&[("a", 1), ("b", 1), ("solo", 9)])).unwrap();
        assert_eq!(lp.path, vec!["solo"]);
        assert_eq!(lp.duration, 9);
    }

    #[test]
    fn cyclic_graph_returns_none() {
        let g = graph(&["a", "b"], &[("a", "b"), ("b", "a")]);
        assert!(find_longest_path(&g, |_| 1).is_none());
    }
}
