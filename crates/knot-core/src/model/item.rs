use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::{ParseEnumError, normalize};

/// The kind of work an item represents.
///
/// Unknown type strings deserialize to [`ItemType::Other`] so that new types
/// added upstream still flow through the engine with a default duration.
/// The original name is dropped: such an item serializes back as `"other"`.
/// Callers that must round-trip unknown types keep the raw string themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Epic,
    Feature,
    UserStory,
    Task,
    Bug,
    #[serde(other)]
    Other,
}

impl ItemType {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Epic => "epic",
            Self::Feature => "feature",
            Self::UserStory => "user_story",
            Self::Task => "task",
            Self::Bug => "bug",
            Self::Other => "other",
        }
    }
}

/// Business priority of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Workflow phase of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Backlog,
    Planning,
    InProgress,
    Review,
    Blocked,
    Done,
}

impl Phase {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Planning => "planning",
            Self::InProgress => "in_progress",
            Self::Review => "review",
            Self::Blocked => "blocked",
            Self::Done => "done",
        }
    }

    /// Someone is actively working the item.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::InProgress | Self::Review)
    }

    #[must_use]
    pub const fn is_blocked(self) -> bool {
        matches!(self, Self::Blocked)
    }
}

/// A project work item as seen by the analysis engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default = "default_item_type")]
    pub item_type: ItemType,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub phase: Phase,
    /// Explicit estimate in days, when the team has provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate_days: Option<u32>,
}

const fn default_item_type() -> ItemType {
    ItemType::Task
}

impl WorkItem {
    /// Build an item with default priority and phase.
    pub fn new(id: impl Into<String>, name: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            item_type,
            priority: Priority::default(),
            phase: Phase::default(),
            estimate_days: None,
        }
    }

    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub const fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    #[must_use]
    pub const fn with_estimate(mut self, days: u32) -> Self {
        self.estimate_days = Some(days);
        self
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "epic" => Ok(Self::Epic),
            "feature" => Ok(Self::Feature),
            "user_story" | "story" => Ok(Self::UserStory),
            "task" => Ok(Self::Task),
            "bug" => Ok(Self::Bug),
            "other" => Ok(Self::Other),
            _ => Err(ParseEnumError::new("item type", s)),
        }
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(ParseEnumError::new("priority", s)),
        }
    }
}

impl FromStr for Phase {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "backlog" => Ok(Self::Backlog),
            "planning" => Ok(Self::Planning),
            "in_progress" | "active" => Ok(Self::InProgress),
            "review" => Ok(Self::Review),
            "blocked" => Ok(Self::Blocked),
            "done" => Ok(Self::Done),
            _ => Err(ParseEnumError::new("phase", s)),
        }
    }
}
