//! Job lifecycle and pull functions.
//!
//! Thin wrappers mapping the external control surface onto supervisor
//! messages and repository reads.

use actors::{ActorRef, StoreError, SupervisorMessage};
use db::repositories::{JobFilter, JobRepository};
use tokio::sync::broadcast;
use tracker_core::{
    ExperimentId, Job, JobId, JobParameters, JobSnapshot, ProgressEvent, ValidationError,
};

/// Request type for creating a job.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CreateJobRequest {
    pub name: String,
    pub experiment_id: String,
    pub parameters: JobParameters,
}

fn parse_job_id(id: &str) -> Result<JobId, StoreError> {
    JobId::parse(id).map_err(|_| {
        StoreError::Validation(ValidationError::new(
            "job_id",
            format!("not a valid id: {}", id),
        ))
    })
}

fn parse_experiment_id(id: &str) -> Result<ExperimentId, StoreError> {
    ExperimentId::parse(id).map_err(|_| {
        StoreError::Validation(ValidationError::new(
            "experiment_id",
            format!("not a valid id: {}", id),
        ))
    })
}

/// Ask the supervisor and await its reply.
async fn call_supervisor<T: Send + 'static>(
    supervisor: &ActorRef<SupervisorMessage>,
    make_msg: impl FnOnce(actors::RpcReplyPort<T>) -> SupervisorMessage,
) -> Result<T, StoreError> {
    let (tx, rx) = actors::concurrency::oneshot();
    supervisor
        .send_message(make_msg(tx.into()))
        .map_err(|e| StoreError::Actor(format!("failed to send message: {}", e)))?;
    rx.await
        .map_err(|_| StoreError::Actor("no response from supervisor".into()))
}

/// Create a job, or return the existing one on duplicate parameters.
pub async fn create_job(
    supervisor: &ActorRef<SupervisorMessage>,
    request: CreateJobRequest,
) -> Result<Job, StoreError> {
    let experiment_id = parse_experiment_id(&request.experiment_id)?;

    call_supervisor(supervisor, |reply| SupervisorMessage::CreateJob {
        name: request.name,
        experiment_id,
        parameters: request.parameters,
        reply,
    })
    .await?
}

/// Start a pending job. No-op for running or terminal jobs.
pub async fn start_job(
    supervisor: &ActorRef<SupervisorMessage>,
    id: &str,
) -> Result<Job, StoreError> {
    let job_id = parse_job_id(id)?;
    call_supervisor(supervisor, |reply| SupervisorMessage::StartJob { job_id, reply }).await?
}

/// Request cooperative cancellation of a pending or running job.
pub async fn cancel_job(
    supervisor: &ActorRef<SupervisorMessage>,
    id: &str,
) -> Result<Job, StoreError> {
    let job_id = parse_job_id(id)?;
    call_supervisor(supervisor, |reply| SupervisorMessage::CancelJob { job_id, reply }).await?
}

/// Delete a terminal job and its history.
pub async fn delete_job(
    supervisor: &ActorRef<SupervisorMessage>,
    id: &str,
) -> Result<(), StoreError> {
    let job_id = parse_job_id(id)?;
    call_supervisor(supervisor, |reply| SupervisorMessage::DeleteJob { job_id, reply }).await?
}

/// Pull a job's full snapshot, history included.
pub async fn get_job(
    supervisor: &ActorRef<SupervisorMessage>,
    id: &str,
) -> Result<JobSnapshot, StoreError> {
    let job_id = parse_job_id(id)?;
    call_supervisor(supervisor, |reply| SupervisorMessage::GetJob { job_id, reply }).await?
}

/// Pull the job list, optionally filtered by experiment. No history.
pub async fn list_jobs(experiment_id: Option<&str>) -> Result<Vec<Job>, StoreError> {
    let filter = match experiment_id {
        Some(id) => JobFilter::for_experiment(parse_experiment_id(id)?),
        None => JobFilter::default(),
    };
    Ok(JobRepository::list(filter).await?)
}

/// Respawn actors for persisted jobs (startup recovery).
pub(crate) async fn call_restore(
    supervisor: &ActorRef<SupervisorMessage>,
) -> Result<usize, StoreError> {
    call_supervisor(supervisor, |reply| SupervisorMessage::RestoreJobs { reply }).await?
}

/// Subscribe to the store's progress event stream.
pub async fn subscribe_events(
    supervisor: &ActorRef<SupervisorMessage>,
) -> Result<broadcast::Receiver<ProgressEvent>, StoreError> {
    call_supervisor(supervisor, |reply| SupervisorMessage::Subscribe { reply }).await
}
