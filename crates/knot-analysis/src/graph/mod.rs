//! Dependency graph module.
//!
//! # Pipeline
//!
//! ```text
//! &[WorkItem] + &[Connection]
//!        ↓  build::DependencyGraph::build()
//! DependencyGraph (petgraph DiGraph, prerequisite → dependent, may contain cycles)
//!        ├─ cycles::detect_cycles()      → CycleDetectionResult
//!        ├─ dfs::walk_cycles()           → closed paths via explicit-stack DFS
//!        └─ topo::topological_order()    → Kahn order (None if cyclic)
//! ```
//!
//! ## Typical Usage
//!
//! ```rust,ignore
//! use knot_analysis::graph::{detect_cycles, would_create_cycle};
//!
//! let report = detect_cycles(&items, &connections);
//! for cycle in &report.cycles {
//!     println!("{cycle}");
//! }
//!
//! if would_create_cycle("w-12", "w-7", &connections, &items) {
//!     println!("rejecting link: it would close a loop");
//! }
//! ```

pub mod build;
pub mod cycles;
pub mod dfs;
pub mod topo;

pub use build::DependencyGraph;
pub use cycles::{
    Cycle, CycleDetectionResult, CycleFix, FixAction, Severity, cycle_if_added, detect_cycles,
    detect_cycles_with, would_create_cycle,
};
pub use dfs::has_cycle;
pub use topo::{topological_ids, topological_order};
