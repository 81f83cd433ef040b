//! Critical path analysis for the dependency graph.
//!
//! # Overview
//!
//! The critical path is the *longest* dependency chain in the project. Items
//! on it have **zero slack**: any delay on them delays the whole project.
//!
//! # Definitions
//!
//! Durations are whole days supplied by a [`DurationEstimator`].
//!
//! | Term              | Definition |
//! |-------------------|------------|
//! | `earliest_start`  | Latest finish among the item's prerequisites (0 if none). |
//! | `earliest_finish` | `earliest_start + duration`. |
//! | `latest_start`    | Latest start that does not delay the project. |
//! | `slack`           | `latest_start - earliest_start`; zero on the critical path. |
//!
//! # Algorithm
//!
//! 1. Run an independent DFS cycle check. Cyclic input short-circuits with
//!    `has_cycles = true` and no schedule.
//! 2. Order nodes with Kahn's algorithm.
//! 3. **Forward pass** in topological order for `earliest_start`.
//! 4. **Backward pass** in reverse topological order for `latest_start`.
//! 5. Derive slack, risk, bottlenecks, health and warnings.

#![allow(clippy::module_name_repetitions)]

use std::cmp::Reverse;
use std::collections::HashMap;

use knot_core::config::CriticalPathConfig;
use knot_core::model::connection::Connection;
use knot_core::model::item::WorkItem;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::duration::{DurationEstimator, TableEstimator};
use crate::graph::{DependencyGraph, has_cycle, topological_order};
use crate::health::{ScheduleMetrics, schedule_health_score};

/// Warning returned in place of a schedule when the graph is cyclic.
pub const CYCLE_WARNING: &str =
    "Dependency cycles detected: resolve them before computing the critical path";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Per-item schedule computed by critical path analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalPathNode {
    pub id: String,
    pub name: String,
    pub duration: u64,
    pub earliest_start: u64,
    pub earliest_finish: u64,
    pub latest_start: u64,
    /// `latest_start - earliest_start`.
    pub slack: u64,
    pub is_on_critical_path: bool,
    /// Number of items this one waits on.
    pub dependency_count: usize,
    /// Number of items waiting on this one.
    pub dependent_count: usize,
    /// In `[0, 1]`; low slack and high connectivity raise it.
    pub risk_score: f64,
}

impl CriticalPathNode {
    #[must_use]
    pub const fn degree(&self) -> usize {
        self.dependency_count + self.dependent_count
    }
}

/// Result of critical path analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalPathResult {
    /// Every item's schedule, in topological order.
    pub nodes: Vec<CriticalPathNode>,
    /// Zero-slack item ids ordered by `earliest_start`.
    pub critical_path: Vec<String>,
    pub project_duration: u64,
    /// Most connected items, most connected first.
    pub bottlenecks: Vec<String>,
    pub health_score: u8,
    pub has_cycles: bool,
    pub warnings: Vec<String>,
}

impl CriticalPathResult {
    /// Result for an empty item list.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            critical_path: Vec::new(),
            project_duration: 0,
            bottlenecks: Vec::new(),
            health_score: 100,
            has_cycles: false,
            warnings: Vec::new(),
        }
    }

    /// Degraded result for a cyclic graph.
    #[must_use]
    pub fn cyclic() -> Self {
        Self {
            nodes: Vec::new(),
            critical_path: Vec::new(),
            project_duration: 0,
            bottlenecks: Vec::new(),
            health_score: 0,
            has_cycles: true,
            warnings: vec![CYCLE_WARNING.to_string()],
        }
    }

    /// Look up one item's schedule.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&CriticalPathNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Critical path with the stock duration table and thresholds.
#[must_use]
pub fn compute_critical_path(items: &[WorkItem], connections: &[Connection]) -> CriticalPathResult {
    compute_critical_path_with(
        items,
        connections,
        &TableEstimator::default(),
        &CriticalPathConfig::default(),
    )
}

/// Compute the CPM schedule for `items`.
///
/// Never fails: empty input yields [`CriticalPathResult::empty`], cyclic input
/// yields [`CriticalPathResult::cyclic`].
#[instrument(skip_all, fields(items = items.len(), connections = connections.len()))]
pub fn compute_critical_path_with(
    items: &[WorkItem],
    connections: &[Connection],
    estimator: &dyn DurationEstimator,
    config: &CriticalPathConfig,
) -> CriticalPathResult {
    let graph = DependencyGraph::build(items, connections);

    if has_cycle(&graph) {
        debug!("graph is cyclic, skipping schedule");
        return CriticalPathResult::cyclic();
    }
    if graph.is_empty() {
        return CriticalPathResult::empty();
    }

    let Some(order) = topological_order(&graph) else {
        return CriticalPathResult::cyclic();
    };

    let g = graph.graph();
    let item_index = index_items(items);
    let durations: Vec<u64> = g
        .node_indices()
        .map(|idx| {
            item_index
                .get(g[idx].as_str())
                .map_or(0, |item| u64::from(estimator.estimate(item)))
        })
        .collect();

    // --- Forward pass: earliest_start ---
    let mut earliest_start = vec![0_u64; g.node_count()];
    for &idx in &order {
        let es = graph
            .dependencies_of(idx)
            .into_iter()
            .map(|d| earliest_start[d.index()] + durations[d.index()])
            .max()
            .unwrap_or(0);
        earliest_start[idx.index()] = es;
    }

    let project_duration = order
        .iter()
        .map(|idx| earliest_start[idx.index()] + durations[idx.index()])
        .max()
        .unwrap_or(0);

    // --- Backward pass: latest_start ---
    let mut latest_start = vec![project_duration; g.node_count()];
    for &idx in order.iter().rev() {
        let latest_finish = graph
            .dependents_of(idx)
            .into_iter()
            .map(|p| latest_start[p.index()])
            .min()
            .unwrap_or(project_duration);
        latest_start[idx.index()] = latest_finish.saturating_sub(durations[idx.index()]);
    }

    // --- Per-node schedule ---
    let nodes: Vec<CriticalPathNode> = order
        .iter()
        .map(|&idx| {
            let id = &g[idx];
            let i = idx.index();
            let slack = latest_start[i].saturating_sub(earliest_start[i]);
            let dependency_count = graph.dependencies_of(idx).len();
            let dependent_count = graph.dependents_of(idx).len();
            CriticalPathNode {
                id: id.clone(),
                name: item_index
                    .get(id.as_str())
                    .map_or_else(|| id.clone(), |item| item.name.clone()),
                duration: durations[i],
                earliest_start: earliest_start[i],
                earliest_finish: earliest_start[i] + durations[i],
                latest_start: latest_start[i],
                slack,
                is_on_critical_path: slack == 0,
                dependency_count,
                dependent_count,
                risk_score: risk_score(slack, dependency_count + dependent_count, config),
            }
        })
        .collect();

    // Stable sort keeps topological order among equal starts.
    let mut critical: Vec<&CriticalPathNode> =
        nodes.iter().filter(|n| n.is_on_critical_path).collect();
    critical.sort_by_key(|n| n.earliest_start);
    let critical_path: Vec<String> = critical.iter().map(|n| n.id.clone()).collect();

    let mut candidates: Vec<&CriticalPathNode> = nodes
        .iter()
        .filter(|n| n.degree() > config.bottleneck_degree)
        .collect();
    candidates.sort_by_key(|n| Reverse(n.degree()));
    let bottleneck_candidates = candidates.len();
    let bottlenecks: Vec<String> = candidates
        .iter()
        .take(config.max_bottlenecks)
        .map(|n| n.id.clone())
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let average_slack =
        nodes.iter().map(|n| n.slack as f64).sum::<f64>() / nodes.len() as f64;

    let health_score = schedule_health_score(ScheduleMetrics {
        node_count: nodes.len(),
        critical_count: critical_path.len(),
        bottleneck_count: bottlenecks.len(),
        average_slack,
    });

    let warnings = collect_warnings(
        nodes.len(),
        critical_path.len(),
        bottleneck_candidates,
        average_slack,
        config,
    );

    debug!(
        project_duration,
        critical = critical_path.len(),
        bottlenecks = bottlenecks.len(),
        health_score,
        "critical path computed"
    );

    CriticalPathResult {
        nodes,
        critical_path,
        project_duration,
        bottlenecks,
        health_score,
        has_cycles: false,
        warnings,
    }
}

/// Durations for every graph node as the estimator sees them, for use with
/// [`crate::schedule::find_longest_path`].
#[must_use]
pub fn estimate_durations(
    items: &[WorkItem],
    estimator: &dyn DurationEstimator,
) -> HashMap<String, u64> {
    let mut out = HashMap::with_capacity(items.len());
    for item in items {
        out.entry(item.id.clone())
            .or_insert_with(|| u64::from(estimator.estimate(item)));
    }
    out
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn index_items(items: &[WorkItem]) -> HashMap<&str, &WorkItem> {
    let mut index = HashMap::with_capacity(items.len());
    for item in items {
        index.entry(item.id.as_str()).or_insert(item);
    }
    index
}

/// `w_s * max(0, 1 - slack/h_s) + w_d * min(1, degree/h_d)`, clamped to `[0, 1]`.
#[allow(clippy::cast_precision_loss)]
fn risk_score(slack: u64, degree: usize, config: &CriticalPathConfig) -> f64 {
    let slack_pressure = (1.0 - ratio(slack as f64, config.risk_slack_horizon)).max(0.0);
    let connectivity = ratio(degree as f64, config.risk_degree_horizon).min(1.0);
    let raw = config.risk_slack_weight * slack_pressure + config.risk_degree_weight * connectivity;
    if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) }
}

/// `value / horizon`, saturating to 1 for a non-positive horizon.
fn ratio(value: f64, horizon: f64) -> f64 {
    if horizon > 0.0 { value / horizon } else { 1.0 }
}

fn collect_warnings(
    node_count: usize,
    critical_count: usize,
    bottleneck_candidates: usize,
    average_slack: f64,
    config: &CriticalPathConfig,
) -> Vec<String> {
    let mut warnings = Vec::new();

    #[allow(clippy::cast_precision_loss)]
    let critical_share = critical_count as f64 / node_count.max(1) as f64;
    if critical_share > config.overconstrained_ratio {
        warnings.push(format!(
            "{critical_count} of {node_count} items are on the critical path; the plan is \
             over-constrained, consider parallelizing work"
        ));
    }

    if bottleneck_candidates > config.bottleneck_warning_count {
        warnings.push(format!(
            "{bottleneck_candidates} bottleneck items detected; consider splitting or decoupling \
             heavily connected work"
        ));
    }

    if average_slack < config.tight_slack_days {
        warnings.push(format!(
            "Average slack is {average_slack:.1} days; the timeline is tight"
        ));
    }

    warnings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use knot_core::model::connection::ConnectionType;
    use knot_core::model::item::ItemType;

    // -----------------------------------------------------------------------
    // Test helpers
    // -----------------------------------------------------------------------

    /// Items with explicit estimates, so durations are exact.
    fn sized(durations: &[(&str, u32)]) -> Vec<WorkItem> {
        durations
            .iter()
            .map(|(id, days)| {
                WorkItem::new(*id, id.to_uppercase(), ItemType::Task).with_estimate(*days)
            })
            .collect()
    }

    /// `source` depends on `target`.
    fn dep(source: &str, target: &str) -> Connection {
        let at = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
        Connection::new(
            format!("{source}->{target}"),
            source,
            target,
            ConnectionType::Dependency,
            at,
        )
    }

    fn explicit(item: &WorkItem) -> u32 {
        item.estimate_days.unwrap_or(1)
    }

    fn run(items: &[WorkItem], conns: &[Connection]) -> CriticalPathResult {
        compute_critical_path_with(items, conns, &explicit, &CriticalPathConfig::default())
    }

    // -----------------------------------------------------------------------
    // Empty / trivial graphs
    // -----------------------------------------------------------------------

    #[test]
    fn empty_input_returns_empty_result() {
        let result = run(&[], &[]);
        assert_eq!(result, CriticalPathResult::empty());
        assert_eq!(result.health_score, 100);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn single_item_is_critical() {
        let result = run(&sized(&[("a", 4)]), &[]);
        assert_eq!(result.project_duration, 4);
        assert_eq!(result.critical_path, vec!["a"]);

        let a = result.node("a").unwrap();
        assert_eq!(a.earliest_start, 0);
        assert_eq!(a.earliest_finish, 4);
        assert_eq!(a.latest_start, 0);
        assert_eq!(a.slack, 0);
        assert_eq!(a.name, "A");
    }

    // -----------------------------------------------------------------------
    // Linear chain
    // -----------------------------------------------------------------------

    #[test]
    fn linear_chain_all_items_critical() {
        let result = run(
            &sized(&[("a", 2), ("b", 3), ("c", 1)]),
            &[dep("b", "a"), dep("c", "b")],
        );

        assert_eq!(result.project_duration, 6);
        assert_eq!(result.critical_path, vec!["a", "b", "c"]);
        for id in ["a", "b", "c"] {
            assert_eq!(result.node(id).unwrap().slack, 0, "slack({id}) should be 0");
        }
        assert_eq!(result.node("b").unwrap().earliest_start, 2);
        assert_eq!(result.node("c").unwrap().earliest_start, 5);
    }

    // -----------------------------------------------------------------------
    // Diamond topology
    // -----------------------------------------------------------------------

    #[test]
    fn diamond_longer_branch_is_critical() {
        let result = run(
            &sized(&[("a", 1), ("b", 5), ("c", 2), ("d", 1)]),
            &[dep("b", "a"), dep("c", "a"), dep("d", "b"), dep("d", "c")],
        );

        assert_eq!(result.node("d").unwrap().earliest_start, 6);
        assert_eq!(result.project_duration, 7);
        assert_eq!(result.critical_path, vec!["a", "b", "d"]);

        let c = result.node("c").unwrap();
        assert!(!c.is_on_critical_path);
        assert_eq!(c.slack, 3);
        assert_eq!(c.latest_start, 3);
    }

    #[test]
    fn disjoint_chains_shorter_one_has_slack() {
        let result = run(
            &sized(&[("a", 2), ("b", 2), ("x", 1)]),
            &[dep("b", "a")],
        );
        assert_eq!(result.project_duration, 4);
        assert_eq!(result.node("x").unwrap().slack, 3);
        assert_eq!(result.critical_path, vec!["a", "b"]);
    }

    // -----------------------------------------------------------------------
    // Cycles
    // -----------------------------------------------------------------------

    #[test]
    fn cyclic_graph_short_circuits() {
        let result = run(
            &sized(&[("a", 1), ("b", 1), ("c", 1)]),
            &[dep("b", "a"), dep("c", "b"), dep("a", "c")],
        );
        assert!(result.has_cycles);
        assert!(result.nodes.is_empty());
        assert!(result.critical_path.is_empty());
        assert_eq!(result.project_duration, 0);
        assert_eq!(result.health_score, 0);
        assert_eq!(result.warnings, vec![CYCLE_WARNING.to_string()]);
    }

    // -----------------------------------------------------------------------
    // Risk, bottlenecks, warnings
    // -----------------------------------------------------------------------

    #[test]
    fn risk_score_weights_slack_and_degree() {
        let config = CriticalPathConfig::default();
        assert!((risk_score(0, 0, &config) - 0.6).abs() < 1e-9);
        assert!((risk_score(5, 5, &config) - 0.5).abs() < 1e-9);
        assert!((risk_score(20, 30, &config) - 0.4).abs() < 1e-9);
        assert!((risk_score(0, 10, &config) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn hub_is_reported_as_bottleneck() {
        // hub depends on a, b; c, d, e depend on hub.
        let items = sized(&[("a", 1), ("b", 1), ("hub", 1), ("c", 1), ("d", 1), ("e", 1)]);
        let conns = vec![
            dep("hub", "a"),
            dep("hub", "b"),
            dep("c", "hub"),
            dep("d", "hub"),
            dep("e", "hub"),
        ];
        let result = run(&items, &conns);

        assert_eq!(result.bottlenecks, vec!["hub"]);
        let hub = result.node("hub").unwrap();
        assert_eq!(hub.dependency_count, 2);
        assert_eq!(hub.dependent_count, 3);
        // slack 0, degree 5: 0.6 + 0.2
        assert!((hub.risk_score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn bottlenecks_are_capped_and_warned() {
        // Six hubs, each with four dependents.
        let mut items = Vec::new();
        let mut conns = Vec::new();
        for h in 0..6 {
            let hub = format!("h{h}");
            items.push(WorkItem::new(&hub, &hub, ItemType::Task).with_estimate(1));
            for leaf in 0..(4 + h) {
                let id = format!("h{h}-l{leaf}");
                items.push(WorkItem::new(&id, &id, ItemType::Task).with_estimate(1));
                conns.push(dep(&id, &hub));
            }
        }
        let result = run(&items, &conns);

        // Most connected first: h5 (9 dependents) down to h1 (5).
        assert_eq!(result.bottlenecks, vec!["h5", "h4", "h3", "h2", "h1"]);
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w.starts_with("6 bottleneck items"))
        );
    }

    #[test]
    fn fully_critical_chain_warns_and_scores() {
        let result = run(
            &sized(&[("a", 2), ("b", 3), ("c", 1)]),
            &[dep("b", "a"), dep("c", "b")],
        );
        // 100 - 1.0 * 30 - 0 + 0
        assert_eq!(result.health_score, 70);
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings[0].contains("over-constrained"));
        assert!(result.warnings[1].contains("tight"));
    }

    #[test]
    fn roomy_schedule_has_no_warnings() {
        // One long item and three short independent ones.
        let result = run(
            &sized(&[("long", 20), ("x", 1), ("y", 1), ("z", 1)]),
            &[],
        );
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        // avg slack = 57 / 4 = 14.25 → capped at 100
        assert_eq!(result.health_score, 100);
    }

    #[test]
    fn stock_estimator_drives_durations() {
        let items = vec![
            WorkItem::new("e", "Epic", ItemType::Epic),
            WorkItem::new("t", "Task", ItemType::Task),
        ];
        let result = compute_critical_path(&items, &[dep("t", "e")]);
        // epic 30 * 1.2 = 36, task 3 * 1.2 = 3.6 → 4
        assert_eq!(result.project_duration, 40);
    }

    #[test]
    fn estimate_durations_matches_estimator() {
        let items = sized(&[("a", 2), ("b", 9)]);
        let durations = estimate_durations(&items, &explicit);
        assert_eq!(durations["a"], 2);
        assert_eq!(durations["b"], 9);
    }
}
