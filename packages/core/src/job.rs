//! Job domain types for tracked training runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::{ExperimentId, JobParameters, MetricHistory};

/// Unique identifier for a job, using ULID for chronological sorting.
///
/// Assigned once at creation and never reused, even after deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Ulid);

impl JobId {
    /// Create a new unique job ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse a job ID from a string.
    pub fn parse(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current status of a job in its lifecycle.
///
/// Transitions: `pending -> running -> {completed, failed}`, plus the direct
/// `pending -> failed` path. Terminal states are sinks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is waiting to start.
    #[default]
    Pending,
    /// Job is training.
    Running,
    /// Job finished all epochs.
    Completed,
    /// Job stopped early: trainer error or cancellation.
    Failed,
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Get a simple status string for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A job is one parameterized training run tracked through its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier for this job.
    pub id: JobId,
    /// Human-readable name.
    pub name: String,
    /// The experiment this job belongs to. Immutable.
    pub experiment_id: ExperimentId,
    /// Training hyperparameters. Immutable after creation.
    pub parameters: JobParameters,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Number of epochs finished so far; never decreases.
    #[serde(default)]
    pub epochs_completed: u32,
    /// Best validation accuracy seen so far; never decreases once set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_accuracy: Option<f64>,
    /// Failure explanation for terminal `failed` jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock seconds from start to terminal transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<f64>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job transitioned to running. Set at most once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state. Set at most once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a new pending job.
    pub fn new(
        name: impl Into<String>,
        experiment_id: ExperimentId,
        parameters: JobParameters,
    ) -> Self {
        Self {
            id: JobId::new(),
            name: name.into(),
            experiment_id,
            parameters,
            status: JobStatus::Pending,
            epochs_completed: 0,
            best_accuracy: None,
            error: None,
            total_time: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Total number of epochs this job will run.
    pub fn epochs_total(&self) -> u32 {
        self.parameters.epochs()
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// The full authoritative state of a job, obtained via pull.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job: Job,
    pub history: MetricHistory,
}

impl JobSnapshot {
    pub fn new(job: Job, history: MetricHistory) -> Self {
        Self { job, history }
    }
}
