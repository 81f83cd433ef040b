//! Cycle detection, severity scoring and fix suggestions.
//!
//! # Edge Direction
//!
//! Cycle paths follow scheduling direction: for consecutive ids `x, y` in a
//! path, `y` depends on `x`, so the connection realizing that hop has
//! `source = y` and `target = x`.
//!
//! # Deduplication
//!
//! The DFS can report the same loop more than once (entered from different
//! nodes). Cycles are keyed by their sorted member set and only the first
//! occurrence is kept. Two different loops over the *same* members are
//! therefore reported once; this is not an exhaustive simple-cycle
//! enumeration.
//!
//! # Fix Suggestions
//!
//! Each cycle carries independent, ranked candidates. They are not meant to be
//! applied together; the caller picks one:
//!
//! 1. remove the weakest connection,
//! 2. remove an AI-suggested connection,
//! 3. downgrade a `blocks` connection to `relates_to`,
//! 4. reverse the newest connection.
//!
//! Only a connection that is the sole ordering link for its hop is a
//! candidate: acting on one of two parallel links leaves the loop intact.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::ops::ControlFlow;

use knot_core::config::CycleConfig;
use knot_core::model::connection::{Connection, ConnectionType, DiscoveredBy};
use knot_core::model::item::{Priority, WorkItem};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use super::build::DependencyGraph;
use super::dfs::{has_cycle, walk_cycles};
use crate::health::cycle_health_score;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// How urgently a cycle needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixAction {
    RemoveConnection,
    ReverseConnection,
    ChangeType,
}

impl fmt::Display for FixAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RemoveConnection => "remove_connection",
            Self::ReverseConnection => "reverse_connection",
            Self::ChangeType => "change_type",
        })
    }
}

/// One candidate remediation for a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleFix {
    pub action: FixAction,
    pub connection_id: String,
    pub source_id: String,
    pub target_id: String,
    /// Replacement type, set only for [`FixAction::ChangeType`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_type: Option<ConnectionType>,
    pub reason: String,
    pub impact: String,
}

/// A detected dependency loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    /// Closed id path in scheduling order; the first id is repeated last.
    pub path: Vec<String>,
    /// Ordering connections realizing each hop of `path`.
    pub connections: Vec<Connection>,
    pub severity: Severity,
    pub fixes: Vec<CycleFix>,
}

impl Cycle {
    /// Number of distinct items in the loop.
    #[must_use]
    pub fn len(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct member ids, in path order.
    #[must_use]
    pub fn members(&self) -> &[String] {
        &self.path[..self.len()]
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cycle ({} items): {}",
            self.severity,
            self.len(),
            self.path.join(" → ")
        )
    }
}

/// Aggregate output of [`detect_cycles`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleDetectionResult {
    pub has_cycles: bool,
    pub cycles: Vec<Cycle>,
    pub total_cycles: usize,
    /// Sorted union of every id that appears in a cycle.
    pub affected_work_items: Vec<String>,
    pub health_score: u8,
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Detect cycles with the stock [`CycleConfig`].
#[must_use]
pub fn detect_cycles(items: &[WorkItem], connections: &[Connection]) -> CycleDetectionResult {
    detect_cycles_with(items, connections, &CycleConfig::default())
}

/// Detect every distinct dependency cycle among `items`.
#[instrument(skip_all, fields(items = items.len(), connections = connections.len()))]
pub fn detect_cycles_with(
    items: &[WorkItem],
    connections: &[Connection],
    config: &CycleConfig,
) -> CycleDetectionResult {
    let graph = DependencyGraph::build(items, connections);
    let item_index = index_items(items);
    let hop_index = index_hops(connections);

    let mut signatures: HashSet<Vec<String>> = HashSet::new();
    let mut cycles: Vec<Cycle> = Vec::new();

    walk_cycles(&graph, |path| {
        let mut signature: Vec<String> = path[..path.len() - 1].to_vec();
        signature.sort_unstable();
        signature.dedup();

        if signatures.insert(signature) {
            trace!(path = ?path, "found cycle");
            cycles.push(describe_cycle(path, &item_index, &hop_index, config));
        }
        ControlFlow::Continue(())
    });

    let affected: BTreeSet<&str> = cycles
        .iter()
        .flat_map(|c| c.members().iter().map(String::as_str))
        .collect();
    let affected_work_items: Vec<String> = affected.into_iter().map(str::to_string).collect();

    let total_cycles = cycles.len();
    let health_score =
        cycle_health_score(total_cycles, graph.node_count(), config.health_penalty_per_cycle);

    debug!(
        total_cycles,
        affected = affected_work_items.len(),
        health_score,
        "cycle detection complete"
    );

    CycleDetectionResult {
        has_cycles: total_cycles > 0,
        cycles,
        total_cycles,
        affected_work_items,
        health_score,
    }
}

/// Check whether persisting the connection "`source_id` depends on
/// `target_id`" would leave the graph cyclic.
///
/// Builds the graph from `existing_connections`, adds the proposed edge to a
/// copy and runs the DFS check. Caller data is never modified. An endpoint
/// that is not among `items` is ignored, exactly as in graph construction, so
/// such a proposal only reports pre-existing cycles.
#[instrument(skip(existing_connections, items))]
pub fn would_create_cycle(
    source_id: &str,
    target_id: &str,
    existing_connections: &[Connection],
    items: &[WorkItem],
) -> bool {
    let graph = DependencyGraph::build(items, existing_connections);
    has_cycle(&graph.with_edge(source_id, target_id))
}

/// Return the loop that the proposed connection "`source_id` depends on
/// `target_id`" would close, if any.
///
/// The path is in scheduling order and starts and ends at `source_id`:
/// `source → … → target → source`. Unlike [`would_create_cycle`] this ignores
/// cycles that already exist elsewhere in the graph.
#[must_use]
pub fn cycle_if_added(
    source_id: &str,
    target_id: &str,
    existing_connections: &[Connection],
    items: &[WorkItem],
) -> Option<Vec<String>> {
    let graph = DependencyGraph::build(items, existing_connections);
    let (Some(source), Some(target)) = (graph.node_index(source_id), graph.node_index(target_id))
    else {
        return None;
    };

    if source == target {
        return Some(vec![source_id.to_string(), source_id.to_string()]);
    }

    // The new edge runs target → source. It closes a loop if target is
    // already reachable from source.
    let mut stack: Vec<NodeIndex> = vec![source];
    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut visited: HashSet<NodeIndex> = HashSet::from([source]);

    while let Some(current) = stack.pop() {
        if current == target {
            return Some(reconstruct_path(&graph, source, target, &parent));
        }
        for next in graph.dependents_of(current) {
            if visited.insert(next) {
                parent.insert(next, current);
                stack.push(next);
            }
        }
    }

    None
}

fn reconstruct_path(
    graph: &DependencyGraph,
    source: NodeIndex,
    target: NodeIndex,
    parent: &HashMap<NodeIndex, NodeIndex>,
) -> Vec<String> {
    // Parent links run target → … → source; walk them back and flip.
    let mut reversed: Vec<NodeIndex> = vec![target];
    let mut cursor = target;
    while cursor != source {
        let Some(&prev) = parent.get(&cursor) else {
            break;
        };
        cursor = prev;
        reversed.push(cursor);
    }
    reversed.reverse();
    reversed.push(source);
    reversed
        .into_iter()
        .map(|idx| graph.graph()[idx].clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Cycle description
// ---------------------------------------------------------------------------

type HopIndex<'a> = HashMap<(&'a str, &'a str), Vec<&'a Connection>>;

fn index_items(items: &[WorkItem]) -> HashMap<&str, &WorkItem> {
    let mut index = HashMap::with_capacity(items.len());
    for item in items {
        index.entry(item.id.as_str()).or_insert(item);
    }
    index
}

/// Ordering connections keyed by `(source, target)`.
fn index_hops(connections: &[Connection]) -> HopIndex<'_> {
    let mut index: HopIndex<'_> = HashMap::new();
    for c in connections.iter().filter(|c| c.is_ordering()) {
        index
            .entry((c.source_id.as_str(), c.target_id.as_str()))
            .or_default()
            .push(c);
    }
    index
}

fn describe_cycle(
    path: Vec<String>,
    items: &HashMap<&str, &WorkItem>,
    hops: &HopIndex<'_>,
    config: &CycleConfig,
) -> Cycle {
    let hop_links: Vec<&[&Connection]> = path
        .windows(2)
        .map(|pair| {
            hops.get(&(pair[1].as_str(), pair[0].as_str()))
                .map_or(&[][..], Vec::as_slice)
        })
        .collect();

    // A link backed by a parallel one cannot break the loop on its own.
    let sole_links: Vec<&Connection> = hop_links
        .iter()
        .filter_map(|links| match links {
            [only] => Some(*only),
            _ => None,
        })
        .collect();
    let fixes = propose_fixes(&sole_links, items);

    let connections: Vec<Connection> = hop_links
        .iter()
        .flat_map(|links| links.iter().map(|c| (*c).clone()))
        .collect();

    let members: Vec<&WorkItem> = path[..path.len() - 1]
        .iter()
        .filter_map(|id| items.get(id.as_str()).copied())
        .collect();
    let severity = classify_severity(&members, path.len() - 1, config);

    Cycle {
        path,
        connections,
        severity,
        fixes,
    }
}

/// First matching rule wins: critical or blocked-while-active work is high,
/// any blocked/active work or a long loop is medium.
fn classify_severity(members: &[&WorkItem], len: usize, config: &CycleConfig) -> Severity {
    let any_critical = members.iter().any(|m| m.priority == Priority::Critical);
    let any_blocked = members.iter().any(|m| m.phase.is_blocked());
    let any_active = members.iter().any(|m| m.phase.is_active());

    if any_critical || (any_blocked && any_active) {
        Severity::High
    } else if any_blocked || any_active || len > config.long_cycle_len {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// `candidates` are the links that alone realize their hop; a loop whose every
/// hop is doubled gets no fixes.
fn propose_fixes(candidates: &[&Connection], items: &HashMap<&str, &WorkItem>) -> Vec<CycleFix> {
    let name = |id: &str| -> String {
        items
            .get(id)
            .map_or_else(|| id.to_string(), |item| item.name.clone())
    };
    let by_strength = |a: &&Connection, b: &&Connection| {
        a.effective_strength().total_cmp(&b.effective_strength())
    };

    let mut fixes: Vec<CycleFix> = Vec::new();
    let mut push = |fix: CycleFix| {
        let duplicate = fixes
            .iter()
            .any(|f| f.action == fix.action && f.connection_id == fix.connection_id);
        if !duplicate {
            fixes.push(fix);
        }
    };

    if let Some(weakest) = candidates.iter().copied().min_by(by_strength) {
        push(CycleFix {
            action: FixAction::RemoveConnection,
            connection_id: weakest.id.clone(),
            source_id: weakest.source_id.clone(),
            target_id: weakest.target_id.clone(),
            new_type: None,
            reason: format!(
                "Weakest link in the cycle (strength {:.2})",
                weakest.effective_strength()
            ),
            impact: format!(
                "'{}' will no longer wait on '{}'",
                name(&weakest.source_id),
                name(&weakest.target_id)
            ),
        });
    }

    if let Some(suggested) = candidates
        .iter()
        .copied()
        .filter(|c| c.discovered_by == DiscoveredBy::Ai)
        .min_by(by_strength)
    {
        push(CycleFix {
            action: FixAction::RemoveConnection,
            connection_id: suggested.id.clone(),
            source_id: suggested.source_id.clone(),
            target_id: suggested.target_id.clone(),
            new_type: None,
            reason: "Inferred by AI rather than authored by a user".to_string(),
            impact: format!(
                "'{}' will no longer wait on '{}'",
                name(&suggested.source_id),
                name(&suggested.target_id)
            ),
        });
    }

    if let Some(blocking) = candidates
        .iter()
        .copied()
        .filter(|c| c.connection_type == ConnectionType::Blocks)
        .min_by(by_strength)
    {
        push(CycleFix {
            action: FixAction::ChangeType,
            connection_id: blocking.id.clone(),
            source_id: blocking.source_id.clone(),
            target_id: blocking.target_id.clone(),
            new_type: Some(ConnectionType::RelatesTo),
            reason: "A 'relates_to' link keeps the relationship without enforcing order"
                .to_string(),
            impact: format!(
                "'{}' stays linked to '{}' but can start independently",
                name(&blocking.source_id),
                name(&blocking.target_id)
            ),
        });
    }

    if let Some(newest) = candidates.iter().copied().max_by_key(|c| c.created_at) {
        push(CycleFix {
            action: FixAction::ReverseConnection,
            connection_id: newest.id.clone(),
            source_id: newest.source_id.clone(),
            target_id: newest.target_id.clone(),
            new_type: None,
            reason: format!(
                "Most recently added link in the cycle (created {})",
                newest.created_at.format("%Y-%m-%d")
            ),
            impact: format!(
                "'{}' will wait on '{}' instead",
                name(&newest.target_id),
                name(&newest.source_id)
            ),
        });
    }

    fixes
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
