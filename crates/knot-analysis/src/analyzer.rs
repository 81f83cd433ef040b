//! Configured entry point bundling tunables and a duration policy.

use std::fmt;

use knot_core::config::AnalysisConfig;
use knot_core::model::connection::Connection;
use knot_core::model::item::WorkItem;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::duration::{DurationEstimator, TableEstimator};
use crate::graph::{self, CycleDetectionResult, DependencyGraph};
use crate::schedule::{self, CriticalPathResult, LongestPath};

/// Combined output of [`Analyzer::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectAnalysis {
    pub cycles: CycleDetectionResult,
    pub schedule: CriticalPathResult,
}

impl ProjectAnalysis {
    /// Average of the cycle and schedule health scores.
    #[must_use]
    pub fn overall_health(&self) -> u8 {
        let sum = u16::from(self.cycles.health_score) + u16::from(self.schedule.health_score);
        u8::try_from(sum.div_ceil(2)).unwrap_or(u8::MAX)
    }
}

/// Runs every analysis with one [`AnalysisConfig`] and one estimator.
///
/// Holds no mutable state, so a single instance can be shared across threads.
pub struct Analyzer {
    config: AnalysisConfig,
    estimator: Box<dyn DurationEstimator>,
}

impl Analyzer {
    /// Analyzer using the duration table from `config`.
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        let estimator = TableEstimator::new(config.durations.clone());
        Self {
            config,
            estimator: Box::new(estimator),
        }
    }

    /// Replace the duration policy.
    #[must_use]
    pub fn with_estimator(mut self, estimator: impl DurationEstimator + 'static) -> Self {
        self.estimator = Box::new(estimator);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    #[must_use]
    pub fn detect_cycles(
        &self,
        items: &[WorkItem],
        connections: &[Connection],
    ) -> CycleDetectionResult {
        graph::detect_cycles_with(items, connections, &self.config.cycles)
    }

    #[must_use]
    pub fn critical_path(
        &self,
        items: &[WorkItem],
        connections: &[Connection],
    ) -> CriticalPathResult {
        schedule::compute_critical_path_with(
            items,
            connections,
            self.estimator.as_ref(),
            &self.config.critical_path,
        )
    }

    /// See [`graph::would_create_cycle`].
    #[must_use]
    pub fn would_create_cycle(
        &self,
        source_id: &str,
        target_id: &str,
        connections: &[Connection],
        items: &[WorkItem],
    ) -> bool {
        graph::would_create_cycle(source_id, target_id, connections, items)
    }

    /// See [`graph::cycle_if_added`].
    #[must_use]
    pub fn cycle_if_added(
        &self,
        source_id: &str,
        target_id: &str,
        connections: &[Connection],
        items: &[WorkItem],
    ) -> Option<Vec<String>> {
        graph::cycle_if_added(source_id, target_id, connections, items)
    }

    /// Longest chain weighted by this analyzer's estimator. `None` if cyclic.
    #[must_use]
    pub fn longest_path(
        &self,
        items: &[WorkItem],
        connections: &[Connection],
    ) -> Option<LongestPath> {
        let graph = DependencyGraph::build(items, connections);
        let durations = schedule::estimate_durations(items, self.estimator.as_ref());
        schedule::find_longest_path(&graph, |id| durations.get(id).copied().unwrap_or(0))
    }

    /// Cycle report plus schedule in one call.
    #[instrument(skip_all, fields(items = items.len(), connections = connections.len()))]
    #[must_use]
    pub fn analyze(&self, items: &[WorkItem], connections: &[Connection]) -> ProjectAnalysis {
        ProjectAnalysis {
            cycles: self.detect_cycles(items, connections),
            schedule: self.critical_path(items, connections),
        }
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use knot_core::model::connection::ConnectionType;
    use knot_core::model::item::{ItemType, Priority};

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

    fn tasks(ids: &[&str]) -> Vec<WorkItem> {
        ids.iter()
            .map(|id| WorkItem::new(*id, *id, ItemType::Task).with_priority(Priority::High))
            .collect()
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn analyzer_is_send_and_sync() {
        assert_send_sync::<Analyzer>();
    }

    #[test]
    fn analyze_on_acyclic_graph() {
        let analyzer = Analyzer::default();
        let items = tasks(&["a", "b", "c"]);
        let conns = vec![dep("b", "a"), dep("c", "b")];

        let report = analyzer.analyze(&items, &conns);
        assert!(!report.cycles.has_cycles);
        assert_eq!(report.cycles.health_score, 100);
        // high-priority task: 3 days each
        assert_eq!(report.schedule.project_duration, 9);
        assert_eq!(report.overall_health(), 85);
    }

    #[test]
    fn analyze_on_cyclic_graph() {
        let analyzer = Analyzer::default();
        let items = tasks(&["a", "b"]);
        let conns = vec![dep("a", "b"), dep("b", "a")];

        let report = analyzer.analyze(&items, &conns);
        assert!(report.cycles.has_cycles);
        assert!(report.schedule.has_cycles);
        assert!(analyzer.longest_path(&items, &conns).is_none());
    }

    #[test]
    fn custom_estimator_is_used() {
        let analyzer = Analyzer::default().with_estimator(|_: &WorkItem| 10);
        let items = tasks(&["a", "b"]);
        let conns = vec![dep("b", "a")];

        assert_eq!(analyzer.critical_path(&items, &conns).project_duration, 20);
        let longest = analyzer.longest_path(&items, &conns).unwrap();
        assert_eq!(longest.path, vec!["a", "b"]);
        assert_eq!(longest.duration, 20);
    }

    #[test]
    fn config_thresholds_flow_through() {
        let config = AnalysisConfig::from_toml_str(
            "[durations]\ntask = 1.0\nhigh_factor = 1.0\n[critical_path]\ntight_slack_days = 0.0\n",
        )
        .unwrap();
        let analyzer = Analyzer::new(config);
        let items = tasks(&["a"]);

        let schedule = analyzer.critical_path(&items, &[]);
        assert_eq!(schedule.project_duration, 1);
        // single critical item: only the over-constrained warning remains
        assert_eq!(schedule.warnings.len(), 1);
    }

    #[test]
    fn proposal_checks_delegate() {
        let analyzer = Analyzer::default();
        let items = tasks(&["a", "b"]);
        let conns = vec![dep("b", "a")];

        assert!(analyzer.would_create_cycle("a", "b", &conns, &items));
        assert_eq!(
            analyzer.cycle_if_added("a", "b", &conns, &items),
            Some(vec!["a".to_string(), "b".to_string(), "a".to_string()])
        );
    }
}
