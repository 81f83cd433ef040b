//! Scheduling over an acyclic dependency graph.
//!
//! - [`critical_path`]: forward/backward CPM passes, slack, risk, bottlenecks.
//! - [`longest_path`]: single longest weighted chain via memoized DFS.

pub mod critical_path;
pub mod longest_path;

pub use critical_path::{
    CYCLE_WARNING, CriticalPathNode, CriticalPathResult, compute_critical_path,
    compute_critical_path_with, estimate_durations,
};
pub use longest_path::{LongestPath, find_longest_path};
