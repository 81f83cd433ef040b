use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::{ParseEnumError, normalize};

/// The relationship a connection expresses.
///
/// Only [`ConnectionType::Dependency`] and [`ConnectionType::Blocks`] impose
/// ordering. The other two are informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    Dependency,
    Blocks,
    Complements,
    RelatesTo,
}

impl ConnectionType {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Dependency => "dependency",
            Self::Blocks => "blocks",
            Self::Complements => "complements",
            Self::RelatesTo => "relates_to",
        }
    }

    /// Whether an edge of this type constrains scheduling order.
    #[must_use]
    pub const fn imposes_ordering(self) -> bool {
        matches!(self, Self::Dependency | Self::Blocks)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Active,
    Inactive,
}

impl ConnectionStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// Who authored a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveredBy {
    #[default]
    User,
    Ai,
}

impl DiscoveredBy {
    const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
        }
    }
}

/// A typed, directed relationship between two work items.
///
/// For ordering types the connection reads "`source` depends on `target`":
/// the target must complete before the source starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub connection_type: ConnectionType,
    #[serde(default)]
    pub status: ConnectionStatus,
    /// Confidence/importance in `[0.0, 1.0]`.
    #[serde(default = "default_strength")]
    pub strength: f64,
    #[serde(default)]
    pub discovered_by: DiscoveredBy,
    pub created_at: DateTime<Utc>,
}

const fn default_strength() -> f64 {
    1.0
}

impl Connection {
    /// Build an active, user-authored connection with full strength.
    pub fn new(
        id: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        connection_type: ConnectionType,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            connection_type,
            status: ConnectionStatus::Active,
            strength: default_strength(),
            discovered_by: DiscoveredBy::User,
            created_at,
        }
    }

    #[must_use]
    pub const fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    #[must_use]
    pub const fn with_status(mut self, status: ConnectionStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub const fn with_discovered_by(mut self, discovered_by: DiscoveredBy) -> Self {
        self.discovered_by = discovered_by;
        self
    }

    /// `true` for active `dependency`/`blocks` connections.
    #[must_use]
    pub fn is_ordering(&self) -> bool {
        self.status == ConnectionStatus::Active && self.connection_type.imposes_ordering()
    }

    /// Strength clamped into `[0.0, 1.0]`; NaN reads as zero.
    #[must_use]
    pub fn effective_strength(&self) -> f64 {
        if self.strength.is_nan() {
            0.0
        } else {
            self.strength.clamp(0.0, 1.0)
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DiscoveredBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "dependency" | "depends_on" => Ok(Self::Dependency),
            "blocks" => Ok(Self::Blocks),
            "complements" => Ok(Self::Complements),
            "relates_to" | "related_to" => Ok(Self::RelatesTo),
            _ => Err(ParseEnumError::new("connection type", s)),
        }
    }
}

impl FromStr for ConnectionStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(ParseEnumError::new("connection status", s)),
        }
    }
}

impl FromStr for DiscoveredBy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "user" => Ok(Self::User),
            "ai" => Ok(Self::Ai),
            _ => Err(ParseEnumError::new("discovered_by", s)),
        }
    }
}
