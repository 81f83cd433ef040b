//! Scheduling graph construction from work items and connections.
//!
//! # Edge Direction
//!
//! A connection `(source, target)` of an ordering type reads "source depends
//! on target": the target must finish before the source can start. The
//! petgraph graph therefore stores the edge as `target → source`:
//!
//! - outgoing neighbors of a node are the items waiting on it (dependents).
//! - incoming neighbors are the items it waits on (dependencies).
//!
//! ## Only Ordering Edges
//!
//! Only `active` connections of type `dependency` or `blocks` become edges.
//! `complements` and `relates_to` links are informational and excluded.
//!
//! ## Stale References
//!
//! Connections that mention an id missing from the item list are dropped.
//! Persistence layers routinely hand us links to deleted items; that is a
//! recoverable condition, not an error.
//!
//! ## Cache Invalidation
//!
//! [`DependencyGraph::content_hash`] is a BLAKE3 hash of the sorted edge set.
//! It changes only when edges change.

#![allow(clippy::module_name_repetitions)]

use std::collections::{HashMap, HashSet};

use knot_core::model::connection::Connection;
use knot_core::model::item::WorkItem;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::{debug, instrument};

// ---------------------------------------------------------------------------
// DependencyGraph
// ---------------------------------------------------------------------------

/// Directed scheduling graph over item ids.
///
/// Node indices follow item input order, and neighbor lists are returned in
/// edge insertion order, so every traversal is deterministic for a given
/// input. The graph is immutable once built.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Nodes = item ids, edges = `prerequisite → dependent`.
    graph: DiGraph<String, ()>,
    /// Mapping from item id to petgraph `NodeIndex`.
    node_map: HashMap<String, NodeIndex>,
    /// BLAKE3 content hash of the edge set.
    content_hash: String,
}

impl DependencyGraph {
    /// Build the scheduling graph for `items` from `connections`.
    ///
    /// Duplicate item ids keep their first occurrence. Parallel ordering
    /// connections over the same pair collapse into one edge.
    #[instrument(skip_all, fields(items = items.len(), connections = connections.len()))]
    pub fn build(items: &[WorkItem], connections: &[Connection]) -> Self {
        let nodes = items.iter().map(|item| item.id.clone());
        let known: HashSet<&str> = items.iter().map(|item| item.id.as_str()).collect();

        let mut dropped = 0_usize;
        let edges: Vec<(String, String)> = connections
            .iter()
            .filter(|c| c.is_ordering())
            .filter_map(|c| {
                if known.contains(c.source_id.as_str()) && known.contains(c.target_id.as_str()) {
                    Some((c.source_id.clone(), c.target_id.clone()))
                } else {
                    dropped += 1;
                    debug!(
                        connection = %c.id,
                        source = %c.source_id,
                        target = %c.target_id,
                        "dropping connection with unknown endpoint"
                    );
                    None
                }
            })
            .collect();

        let graph = Self::from_dependency_pairs(nodes, edges);
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            dropped,
            "built dependency graph"
        );
        graph
    }

    /// Build a graph directly from `(dependent, prerequisite)` pairs, the
    /// same orientation as a connection's `(source, target)`.
    ///
    /// Pairs naming an id outside `nodes` are ignored.
    pub fn from_dependency_pairs<I, E>(nodes: I, pairs: E) -> Self
    where
        I: IntoIterator<Item = String>,
        E: IntoIterator<Item = (String, String)>,
    {
        let mut graph = DiGraph::<String, ()>::new();
        let mut node_map: HashMap<String, NodeIndex> = HashMap::new();

        for id in nodes {
            if node_map.contains_key(&id) {
                continue;
            }
            let idx = graph.add_node(id.clone());
            node_map.insert(id, idx);
        }

        for (source, target) in pairs {
            let (Some(&dependent), Some(&prerequisite)) =
                (node_map.get(&source), node_map.get(&target))
            else {
                continue;
            };
            // Avoid duplicate edges (petgraph allows them by default).
            if !graph.contains_edge(prerequisite, dependent) {
                graph.add_edge(prerequisite, dependent, ());
            }
        }

        let content_hash = compute_edge_hash(&graph);
        Self {
            graph,
            node_map,
            content_hash,
        }
    }

    /// Return a copy of this graph with one extra proposed connection
    /// `(source_id, target_id)` ("source depends on target").
    ///
    /// `self` is left untouched. Unknown endpoints are ignored, matching
    /// [`DependencyGraph::build`].
    #[must_use]
    pub fn with_edge(&self, source_id: &str, target_id: &str) -> Self {
        let mut extended = self.clone();
        if let (Some(dependent), Some(prerequisite)) =
            (self.node_index(source_id), self.node_index(target_id))
        {
            if !extended.graph.contains_edge(prerequisite, dependent) {
                extended.graph.add_edge(prerequisite, dependent, ());
                extended.content_hash = compute_edge_hash(&extended.graph);
            }
        }
        extended
    }

    /// The underlying petgraph graph.
    #[must_use]
    pub const fn graph(&self) -> &DiGraph<String, ()> {
        &self.graph
    }

    /// Item ids in input order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(|idx| self.graph[idx].as_str())
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.node_map.contains_key(id)
    }

    /// Look up the `NodeIndex` for an item id.
    #[must_use]
    pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.node_map.get(id).copied()
    }

    /// Return the item id label for a node.
    #[must_use]
    pub fn item_id(&self, idx: NodeIndex) -> Option<&str> {
        self.graph.node_weight(idx).map(String::as_str)
    }

    /// Items that cannot start until `id` finishes.
    #[must_use]
    pub fn dependents(&self, id: &str) -> Vec<&str> {
        self.labels(id, Direction::Outgoing)
    }

    /// Items that must finish before `id` starts.
    #[must_use]
    pub fn dependencies(&self, id: &str) -> Vec<&str> {
        self.labels(id, Direction::Incoming)
    }

    /// Dependents of `idx`, in edge insertion order.
    pub(crate) fn dependents_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors(idx, Direction::Outgoing)
    }

    /// Dependencies of `idx`, in edge insertion order.
    pub(crate) fn dependencies_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors(idx, Direction::Incoming)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// BLAKE3 hash of the edge set, prefixed with `blake3:`.
    #[must_use]
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    fn neighbors(&self, idx: NodeIndex, dir: Direction) -> Vec<NodeIndex> {
        // petgraph walks adjacency newest-first.
        let mut out: Vec<NodeIndex> = self.graph.neighbors_directed(idx, dir).collect();
        out.reverse();
        out
    }

    fn labels(&self, id: &str, dir: Direction) -> Vec<&str> {
        self.node_index(id).map_or_else(Vec::new, |idx| {
            self.neighbors(idx, dir)
                .into_iter()
                .map(|n| self.graph[n].as_str())
                .collect()
        })
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Hash the sorted `(prerequisite, dependent)` list so the value does not
/// depend on input order.
fn compute_edge_hash(graph: &DiGraph<String, ()>) -> String {
    let mut sorted: Vec<(&str, &str)> = graph
        .edge_references()
        .map(|e| (graph[e.source()].as_str(), graph[e.target()].as_str()))
        .collect();
    sorted.sort_unstable();

    let mut hasher = blake3::Hasher::new();
    for (prerequisite, dependent) in sorted {
        hasher.update(prerequisite.as_bytes());
        hasher.update(b"\x00");
        hasher.update(dependent.as_bytes());
        hasher.update(b"\x00");
    }
    format!("blake3:{}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
