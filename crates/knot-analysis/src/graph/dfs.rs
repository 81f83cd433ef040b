//! Explicit-stack depth-first traversal over the scheduling graph.
//!
//! The walk keeps the current DFS path plus a `node → position` index for
//! every node on it. Reaching a node that is on the path closes a cycle:
//! `path[position..] + [node]`. Each stack frame stores the node, its
//! dependents and the index of the next one to visit, so memory is bounded
//! by the graph size rather than the thread's call stack.

use std::collections::HashMap;
use std::ops::ControlFlow;

use petgraph::graph::NodeIndex;

use super::build::DependencyGraph;

/// Visit every back edge reachable by DFS from each unvisited node, in node
/// order, passing the closed cycle path to `on_cycle`.
///
/// Paths follow scheduling direction (prerequisite first) and repeat their
/// first id at the end. Returning [`ControlFlow::Break`] stops the walk.
pub fn walk_cycles<F>(graph: &DependencyGraph, mut on_cycle: F)
where
    F: FnMut(Vec<String>) -> ControlFlow<()>,
{
    let mut visited = vec![false; graph.node_count()];
    let mut path: Vec<NodeIndex> = Vec::new();
    let mut on_path: HashMap<NodeIndex, usize> = HashMap::new();
    // Each stack entry: (node, its dependents, index of the next one to visit).
    let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();

    for start in graph.graph().node_indices() {
        if visited[start.index()] {
            continue;
        }
        visited[start.index()] = true;
        on_path.insert(start, path.len());
        path.push(start);
        stack.push((start, graph.dependents_of(start), 0));

        while let Some(frame) = stack.last_mut() {
            let (node, dependents, next) = (frame.0, &frame.1, &mut frame.2);
            let Some(&neighbor) = dependents.get(*next) else {
                stack.pop();
                path.pop();
                on_path.remove(&node);
                continue;
            };
            *next += 1;

            if let Some(&position) = on_path.get(&neighbor) {
                let mut cycle: Vec<String> = path[position..]
                    .iter()
                    .map(|&idx| graph.graph()[idx].clone())
                    .collect();
                cycle.push(graph.graph()[neighbor].clone());
                if on_cycle(cycle).is_break() {
                    return;
                }
            } else if !visited[neighbor.index()] {
                visited[neighbor.index()] = true;
                on_path.insert(neighbor, path.len());
                path.push(neighbor);
                stack.push((neighbor, graph.dependents_of(neighbor), 0));
            }
        }
    }
}

/// First cycle found by [`walk_cycles`], if any.
#[must_use]
pub fn find_cycle(graph: &DependencyGraph) -> Option<Vec<String>> {
    let mut found = None;
    walk_cycles(graph, |cycle| {
        found = Some(cycle);
        ControlFlow::Break(())
    });
    found
}

/// `true` if the graph contains at least one cycle. Stops at the first one.
#[must_use]
pub fn has_cycle(graph: &DependencyGraph) -> bool {
    find_cycle(graph).is_some()
}
