//! Message types for actor communication.

use ractor::RpcReplyPort;
use tokio::sync::broadcast;
use tracker_core::{
    ExperimentId, Job, JobId, JobParameters, JobSnapshot, ProgressEvent, ValidationError,
};

/// Messages for a JobActor.
#[derive(Debug)]
pub enum JobMessage {
    /// Transition pending -> running and begin consuming trainer events.
    /// No-op returning the current job if already running or terminal.
    Start {
        reply: RpcReplyPort<Result<Job, StoreError>>,
    },

    /// One notification from the trainer driver. The single authorized
    /// mutator of a running job's state.
    Progress { event: ProgressEvent },

    /// Request cooperative cancellation.
    Cancel {
        reply: RpcReplyPort<Result<Job, StoreError>>,
    },

    /// Read the full authoritative state including history.
    GetSnapshot { reply: RpcReplyPort<JobSnapshot> },

    /// Stop the actor (job deleted or system shutdown).
    Shutdown,
}

/// Messages for the JobSupervisor.
#[derive(Debug)]
pub enum SupervisorMessage {
    /// Create a new job, or return the existing one on an exact-parameter
    /// duplicate for the same experiment.
    CreateJob {
        name: String,
        experiment_id: ExperimentId,
        parameters: JobParameters,
        reply: RpcReplyPort<Result<Job, StoreError>>,
    },

    /// Start a pending job.
    StartJob {
        job_id: JobId,
        reply: RpcReplyPort<Result<Job, StoreError>>,
    },

    /// Cancel a pending or running job.
    CancelJob {
        job_id: JobId,
        reply: RpcReplyPort<Result<Job, StoreError>>,
    },

    /// Delete a terminal job and its history irrevocably.
    DeleteJob {
        job_id: JobId,
        reply: RpcReplyPort<Result<(), StoreError>>,
    },

    /// Get a job's full snapshot.
    GetJob {
        job_id: JobId,
        reply: RpcReplyPort<Result<JobSnapshot, StoreError>>,
    },

    /// Respawn actors for jobs already persisted in the repository.
    RestoreJobs {
        reply: RpcReplyPort<Result<usize, StoreError>>,
    },

    /// Subscribe to the progress event stream.
    Subscribe {
        reply: RpcReplyPort<broadcast::Receiver<ProgressEvent>>,
    },

    /// Shutdown all jobs.
    Shutdown,
}

/// Error type for job store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] db::DbError),

    #[error("actor error: {0}")]
    Actor(String),
}
