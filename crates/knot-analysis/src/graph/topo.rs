//! Kahn's algorithm over the scheduling graph.

use std::collections::VecDeque;

use petgraph::Direction;
use petgraph::graph::NodeIndex;

use super::build::DependencyGraph;

/// Topological order of `graph` (prerequisites first), or `None` if the graph
/// has a cycle.
///
/// In-degree counts incoming scheduling edges, i.e. each node's
/// prerequisites. Zero in-degree nodes seed the queue in node order, so the
/// result is deterministic for a given input order.
#[must_use]
pub fn topological_order(graph: &DependencyGraph) -> Option<Vec<NodeIndex>> {
    let g = graph.graph();
    let mut in_degree: Vec<usize> = g
        .node_indices()
        .map(|idx| g.neighbors_directed(idx, Direction::Incoming).count())
        .collect();

    let mut queue: VecDeque<NodeIndex> = g
        .node_indices()
        .filter(|idx| in_degree[idx.index()] == 0)
        .collect();
    let mut order: Vec<NodeIndex> = Vec::with_capacity(g.node_count());

    while let Some(idx) = queue.pop_front() {
        order.push(idx);
        for dependent in graph.dependents_of(idx) {
            let deg = &mut in_degree[dependent.index()];
            *deg -= 1;
            if *deg == 0 {
                queue.push_back(dependent);
            }
        }
    }

    (order.len() == g.node_count()).then_some(order)
}

/// [`topological_order`] as item ids.
#[must_use]
pub fn topological_ids(graph: &DependencyGraph) -> Option<Vec<String>> {
    topological_order(graph).map(|order| {
        order
            .into_iter()
            .map(|idx| graph.graph()[idx].clone())
            .collect()
    })
}
