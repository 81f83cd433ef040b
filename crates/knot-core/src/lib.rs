#![forbid(unsafe_code)]
//! knot-core library.
//!
//! Holds the value types the analysis engine consumes ([`WorkItem`],
//! [`Connection`]) and the tunables it reads ([`AnalysisConfig`]).
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums for typed failures, `anyhow::Result` for
//!   configuration loading.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod error;
pub mod model;

pub use config::{AnalysisConfig, CriticalPathConfig, CycleConfig, DurationConfig};
pub use error::ParseEnumError;
pub use model::connection::{Connection, ConnectionStatus, ConnectionType, DiscoveredBy};
pub use model::item::{ItemType, Phase, Priority, WorkItem};
