//! Tunables for the analysis engine.
//!
//! Every field has a default, so an empty (or missing) config file yields the
//! stock policy. Project overrides live in `.knot/analysis.toml`:
//!
//! ```toml
//! [durations]
//! epic = 40.0
//!
//! [critical_path]
//! max_bottlenecks = 10
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::model::item::{ItemType, Priority};

/// Location of the project config, relative to the project root.
pub const CONFIG_RELATIVE_PATH: &str = ".knot/analysis.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub durations: DurationConfig,
    #[serde(default)]
    pub critical_path: CriticalPathConfig,
    #[serde(default)]
    pub cycles: CycleConfig,
}

impl AnalysisConfig {
    /// Parse a TOML document. Missing tables and keys fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or a value has the
    /// wrong type.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content).context("Failed to parse analysis config")
    }
}

/// Base durations (days) per item type and multipliers per priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationConfig {
    #[serde(default = "default_epic_days")]
    pub epic: f64,
    #[serde(default = "default_feature_days")]
    pub feature: f64,
    #[serde(default = "default_user_story_days")]
    pub user_story: f64,
    #[serde(default = "default_task_days")]
    pub task: f64,
    #[serde(default = "default_bug_days")]
    pub bug: f64,
    /// Used for [`ItemType::Other`].
    #[serde(default = "default_other_days")]
    pub default_days: f64,
    #[serde(default = "default_critical_factor")]
    pub critical_factor: f64,
    #[serde(default = "default_high_factor")]
    pub high_factor: f64,
    #[serde(default = "default_medium_factor")]
    pub medium_factor: f64,
    #[serde(default = "default_low_factor")]
    pub low_factor: f64,
}

impl DurationConfig {
    #[must_use]
    pub const fn base_days(&self, item_type: ItemType) -> f64 {
        match item_type {
            ItemType::Epic => self.epic,
            ItemType::Feature => self.feature,
            ItemType::UserStory => self.user_story,
            ItemType::Task => self.task,
            ItemType::Bug => self.bug,
            ItemType::Other => self.default_days,
        }
    }

    /// Multiplier applied to the base duration.
    #[must_use]
    pub const fn priority_factor(&self, priority: Priority) -> f64 {
        match priority {
            Priority::Critical => self.critical_factor,
            Priority::High => self.high_factor,
            Priority::Medium => self.medium_factor,
            Priority::Low => self.low_factor,
        }
    }
}

impl Default for DurationConfig {
    fn default() -> Self {
        Self {
            epic: default_epic_days(),
            feature: default_feature_days(),
            user_story: default_user_story_days(),
            task: default_task_days(),
            bug: default_bug_days(),
            default_days: default_other_days(),
            critical_factor: default_critical_factor(),
            high_factor: default_high_factor(),
            medium_factor: default_medium_factor(),
            low_factor: default_low_factor(),
        }
    }
}

/// Thresholds and weights for schedule scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalPathConfig {
    /// A node is a bottleneck when `dependencies + dependents` exceeds this.
    #[serde(default = "default_bottleneck_degree")]
    pub bottleneck_degree: usize,
    #[serde(default = "default_max_bottlenecks")]
    pub max_bottlenecks: usize,
    /// Slack (days) at which the slack component of risk reaches zero.
    #[serde(default = "default_risk_horizon")]
    pub risk_slack_horizon: f64,
    /// Connection count at which the degree component of risk saturates.
    #[serde(default = "default_risk_horizon")]
    pub risk_degree_horizon: f64,
    #[serde(default = "default_risk_slack_weight")]
    pub risk_slack_weight: f64,
    #[serde(default = "default_risk_degree_weight")]
    pub risk_degree_weight: f64,
    /// Warn when the critical path covers more than this share of items.
    #[serde(default = "default_overconstrained_ratio")]
    pub overconstrained_ratio: f64,
    /// Warn when more bottleneck candidates than this are found.
    #[serde(default = "default_max_bottlenecks")]
    pub bottleneck_warning_count: usize,
    /// Warn when average slack (days) drops below this.
    #[serde(default = "default_tight_slack_days")]
    pub tight_slack_days: f64,
}

impl Default for CriticalPathConfig {
    fn default() -> Self {
        Self {
            bottleneck_degree: default_bottleneck_degree(),
            max_bottlenecks: default_max_bottlenecks(),
            risk_slack_horizon: default_risk_horizon(),
            risk_degree_horizon: default_risk_horizon(),
            risk_slack_weight: default_risk_slack_weight(),
            risk_degree_weight: default_risk_degree_weight(),
            overconstrained_ratio: default_overconstrained_ratio(),
            bottleneck_warning_count: default_max_bottlenecks(),
            tight_slack_days: default_tight_slack_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Cycles with more distinct items than this are at least medium severity.
    #[serde(default = "default_long_cycle_len")]
    pub long_cycle_len: usize,
    /// Health points deducted per detected cycle.
    #[serde(default = "default_cycle_penalty")]
    pub health_penalty_per_cycle: f64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            long_cycle_len: default_long_cycle_len(),
            health_penalty_per_cycle: default_cycle_penalty(),
        }
    }
}

/// Load `.knot/analysis.toml` under `project_root`.
///
/// A missing file is not an error: the stock configuration is returned.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_analysis_config(project_root: &Path) -> Result<AnalysisConfig> {
    let path = project_root.join(CONFIG_RELATIVE_PATH);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no analysis config, using defaults");
        return Ok(AnalysisConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<AnalysisConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

const fn default_epic_days() -> f64 {
    30.0
}

const fn default_feature_days() -> f64 {
    14.0
}

const fn default_user_story_days() -> f64 {
    5.0
}

const fn default_task_days() -> f64 {
    3.0
}

const fn default_bug_days() -> f64 {
    2.0
}

const fn default_other_days() -> f64 {
    5.0
}

const fn default_critical_factor() -> f64 {
    0.8
}

const fn default_high_factor() -> f64 {
    1.0
}

const fn default_medium_factor() -> f64 {
    1.2
}

const fn default_low_factor() -> f64 {
    1.5
}

const fn default_bottleneck_degree() -> usize {
    3
}

const fn default_max_bottlenecks() -> usize {
    5
}

const fn default_risk_horizon() -> f64 {
    10.0
}

const fn default_risk_slack_weight() -> f64 {
    0.6
}

const fn default_risk_degree_weight() -> f64 {
    0.4
}

const fn default_overconstrained_ratio() -> f64 {
    0.5
}

const fn default_tight_slack_days() -> f64 {
    2.0
}

const fn default_long_cycle_len() -> usize {
    4
}

const fn default_cycle_penalty() -> f64 {
    20.0
}
