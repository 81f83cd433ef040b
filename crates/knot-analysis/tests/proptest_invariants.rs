use knot_analysis::graph::{DependencyGraph, cycle_if_added, detect_cycles, would_create_cycle};
use knot_analysis::schedule::{compute_critical_path_with, estimate_durations, find_longest_path};
use knot_analysis::{ExplicitEstimate, FixAction, TableEstimator};
use knot_core::config::CriticalPathConfig;
use knot_core::model::connection::Connection;
use petgraph::graph::DiGraph;
use proptest::prelude::*;

use generators::*;

fn schedule(project: &Project) -> knot_analysis::CriticalPathResult {
    compute_critical_path_with(
        &project.items,
        &project.connections,
        &ExplicitEstimate::new(TableEstimator::default()),
        &CriticalPathConfig::default(),
    )
}

/// Independent cyclicity check.
fn petgraph_is_cyclic(project: &Project) -> bool {
    let mut g: DiGraph<(), ()> = DiGraph::new();
    let nodes: Vec<_> = project.items.iter().map(|_| g.add_node(())).collect();
    let index = |id: &str| {
        project
            .items
            .iter()
            .position(|item| item.id == id)
            .map(|i| nodes[i])
    };
    for c in project.connections.iter().filter(|c| c.is_ordering()) {
        if let (Some(s), Some(t)) = (index(&c.source_id), index(&c.target_id)) {
            g.add_edge(t, s, ());
        }
    }
    petgraph::algo::is_cyclic_directed(&g)
}

fn apply_fix(connections: &[Connection], fix: &knot_analysis::CycleFix) -> Vec<Connection> {
    connections
        .iter()
        .filter(|c| !(fix.action == FixAction::RemoveConnection && c.id == fix.connection_id))
        .cloned()
        .map(|mut c| {
            if c.id == fix.connection_id {
                match fix.action {
                    FixAction::ReverseConnection => {
                        std::mem::swap(&mut c.source_id, &mut c.target_id);
                    }
                    FixAction::ChangeType => {
                        if let Some(ty) = fix.new_type {
                            c.connection_type = ty;
                        }
                    }
                    FixAction::RemoveConnection => {}
                }
            }
            c
        })
        .collect()
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(256))]

    // Schedule invariants
    #[test]
    fn dag_slack_marks_critical_items(project in arb_dag(24)) {
        let result = schedule(&project);
        prop_assert!(!result.has_cycles);
        prop_assert_eq!(result.nodes.len(), project.items.len());

        for node in &result.nodes {
            prop_assert!(node.latest_start >= node.earliest_start);
            prop_assert_eq!(node.slack, node.latest_start - node.earliest_start);
            prop_assert_eq!(node.is_on_critical_path, node.slack == 0);
            prop_assert!(node.earliest_finish <= result.project_duration);
            prop_assert!((0.0..=1.0).contains(&node.risk_score));
        }
        prop_assert!(!result.critical_path.is_empty());
    }

    #[test]
    fn dag_respects_every_dependency(project in arb_dag(24)) {
        let result = schedule(&project);
        for c in &project.connections {
            let dependent = result.node(&c.source_id).unwrap();
            let prerequisite = result.node(&c.target_id).unwrap();
            prop_assert!(dependent.earliest_start >= prerequisite.earliest_finish);
        }
    }

    #[test]
    fn project_duration_equals_longest_path(project in arb_dag(24)) {
        let result = schedule(&project);
        let graph = DependencyGraph::build(&project.items, &project.connections);
        let durations = estimate_durations(
            &project.items,
            &ExplicitEstimate::new(TableEstimator::default()),
        );
        let longest = find_longest_path(&graph, |id| durations[id]).unwrap();

        prop_assert_eq!(longest.duration, result.project_duration);
        let along: u64 = longest.path.iter().map(|id| durations[id.as_str()]).sum();
        prop_assert_eq!(along, longest.duration);
    }

    // Health scores
    #[test]
    fn health_scores_stay_in_range(project in arb_project(16)) {
        prop_assert!(detect_cycles(&project.items, &project.connections).health_score <= 100);
        prop_assert!(schedule(&project).health_score <= 100);
    }

    // Cycle detection
    #[test]
    fn cycle_detection_agrees_with_petgraph(project in arb_project(16)) {
        let expected = petgraph_is_cyclic(&project);
        let report = detect_cycles(&project.items, &project.connections);
        prop_assert_eq!(report.has_cycles, expected);
        prop_assert_eq!(report.total_cycles, report.cycles.len());
        prop_assert_eq!(schedule(&project).has_cycles, expected);

        let members: usize = report.cycles.iter().map(|c| c.len()).sum();
        prop_assert!(report.affected_work_items.len() <= members);
    }

    #[test]
    fn reversing_an_edge_closes_a_loop(project in arb_dag(16)) {
        for c in &project.connections {
            prop_assert!(would_create_cycle(
                &c.target_id,
                &c.source_id,
                &project.connections,
                &project.items,
            ));
        }
    }

    #[test]
    fn proposal_check_matches_oracle(project in arb_dag(16), a in 0usize..16, b in 0usize..16) {
        let n = project.items.len();
        let (source, target) = (item_id(a % n), item_id(b % n));

        let mut extended = project.clone();
        extended.connections.push(dependency(project.connections.len(), a % n, b % n));
        let expected = petgraph_is_cyclic(&extended);

        prop_assert_eq!(
            would_create_cycle(&source, &target, &project.connections, &project.items),
            expected
        );
        let path = cycle_if_added(&source, &target, &project.connections, &project.items);
        prop_assert_eq!(path.is_some(), expected);
        if let Some(path) = path {
            prop_assert_eq!(path.first(), Some(&source));
            prop_assert_eq!(path.last(), Some(&source));
        }
    }

    // Fix suggestions
    #[test]
    fn any_single_fix_resolves_a_lone_cycle(project in arb_ring(8)) {
        let report = detect_cycles(&project.items, &project.connections);
        prop_assert_eq!(report.total_cycles, 1);
        prop_assert_eq!(report.cycles[0].len(), project.items.len());

        let cycle = &report.cycles[0];
        prop_assert!(cycle.fixes.iter().any(|f| f.action == FixAction::RemoveConnection));
        for fix in &cycle.fixes {
            let repaired = apply_fix(&project.connections, fix);
            prop_assert!(
                !detect_cycles(&project.items, &repaired).has_cycles,
                "fix {:?} left a cycle", fix.action
            );
        }
    }
}
