//! Experiment domain types: named groupings of training jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for an experiment, using ULID for chronological sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExperimentId(pub Ulid);

impl ExperimentId {
    /// Create a new unique experiment ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse an experiment ID from a string.
    pub fn parse(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for ExperimentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An experiment groups related training jobs under one name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    /// Unique identifier for this experiment.
    pub id: ExperimentId,
    /// Human-readable name.
    pub name: String,
    /// Optional description of what is being studied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// When the experiment was created.
    pub created_at: DateTime<Utc>,
    /// When the experiment was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Experiment {
    /// Create a new experiment with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ExperimentId::new(),
            name: name.into(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the description for this experiment.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
