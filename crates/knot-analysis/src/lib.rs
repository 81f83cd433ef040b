#![forbid(unsafe_code)]
//! knot-analysis library.
//!
//! Graph analysis over work items and their connections: cycle detection with
//! fix suggestions, proposal checks for new links, and critical path
//! scheduling with health scoring.
//!
//! # Conventions
//!
//! - **Errors**: analysis never fails; degenerate input yields a degraded
//!   result (empty schedule, `has_cycles = true`) instead of an error.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).
//!   The library never installs a subscriber.
//!
//! # Modules
//!
//! - [`graph`]: adjacency construction, cycle detection, topological order.
//! - [`schedule`]: critical path method and longest path.
//! - [`duration`]: pluggable duration estimation.
//! - [`health`]: 0–100 scores for both analyses.
//! - [`analyzer`]: configured facade over all of the above.

pub mod analyzer;
pub mod duration;
pub mod graph;
pub mod health;
pub mod schedule;

pub use analyzer::{Analyzer, ProjectAnalysis};
pub use duration::{DurationEstimator, ExplicitEstimate, TableEstimator};
pub use graph::{
    Cycle, CycleDetectionResult, CycleFix, DependencyGraph, FixAction, Severity, cycle_if_added,
    detect_cycles, would_create_cycle,
};
pub use schedule::{
    CriticalPathNode, CriticalPathResult, LongestPath, compute_critical_path, find_longest_path,
};
