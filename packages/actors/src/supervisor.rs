//! Supervisor actor owning the job index.

use std::collections::HashMap;
use std::sync::Arc;

use db::repositories::{ExperimentRepository, JobFilter, JobRepository};
use ractor::{Actor, ActorProcessingErr, ActorRef, SupervisionEvent};
use tokio::sync::broadcast;
use tracker_core::{ExperimentId, Job, JobId, JobParameters, JobStatus, MetricHistory, ProgressEvent};

use crate::job_actor::{JobActor, JobActorState};
use crate::messages::{JobMessage, StoreError, SupervisorMessage};
use crate::trainer::Trainer;

/// State for the supervisor actor.
pub struct SupervisorState {
    /// All job actors by ID.
    pub jobs: HashMap<JobId, ActorRef<JobMessage>>,
    /// Immutable creation facts, kept for duplicate detection.
    fingerprints: HashMap<JobId, (ExperimentId, JobParameters)>,
    /// Event broadcaster cloned into every job actor.
    pub event_tx: broadcast::Sender<ProgressEvent>,
    /// Trainer adapter shared by all jobs.
    trainer: Arc<dyn Trainer>,
}

impl SupervisorState {
    /// Create a new supervisor state.
    pub fn new(trainer: Arc<dyn Trainer>) -> Self {
        let (event_tx, _) = broadcast::channel(1024);
        Self {
            jobs: HashMap::new(),
            fingerprints: HashMap::new(),
            event_tx,
            trainer,
        }
    }

    /// Find a non-deleted job with identical parameters for the experiment.
    fn find_duplicate(&self, experiment_id: ExperimentId, parameters: &JobParameters) -> Option<JobId> {
        self.fingerprints
            .iter()
            .find(|(_, (exp, params))| *exp == experiment_id && params == parameters)
            .map(|(id, _)| *id)
    }
}

async fn spawn_job_actor(
    state: &mut SupervisorState,
    job: Job,
    history: MetricHistory,
) -> Result<ActorRef<JobMessage>, ActorProcessingErr> {
    let job_id = job.id;
    let experiment_id = job.experiment_id;
    let parameters = job.parameters.clone();

    let actor_state = JobActorState::new(job, history, state.trainer.clone(), state.event_tx.clone());

    let (actor, _handle) = Actor::spawn(Some(format!("job-{}", job_id)), JobActor, actor_state)
        .await
        .map_err(|e| ActorProcessingErr::from(format!("Failed to spawn job: {}", e)))?;

    state.jobs.insert(job_id, actor.clone());
    state.fingerprints.insert(job_id, (experiment_id, parameters));

    Ok(actor)
}

/// Ask one job actor and await its reply.
async fn call_job<T: Send + 'static>(
    actor: &ActorRef<JobMessage>,
    make_msg: impl FnOnce(ractor::RpcReplyPort<T>) -> JobMessage,
) -> Result<T, StoreError> {
    let (tx, rx) = ractor::concurrency::oneshot();
    actor
        .send_message(make_msg(tx.into()))
        .map_err(|e| StoreError::Actor(format!("failed to send message: {}", e)))?;
    rx.await
        .map_err(|_| StoreError::Actor("no response from job actor".into()))
}

/// Supervisor actor that manages all jobs.
pub struct JobSupervisor;

impl Actor for JobSupervisor {
    type Msg = SupervisorMessage;
    type State = SupervisorState;
    type Arguments = Arc<dyn Trainer>;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting job supervisor");
        Ok(SupervisorState::new(args))
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SupervisorMessage::CreateJob {
                name,
                experiment_id,
                parameters,
                reply,
            } => {
                if let Err(e) = parameters.validate() {
                    let _ = reply.send(Err(StoreError::Validation(e)));
                    return Ok(());
                }

                match ExperimentRepository::exists(experiment_id).await {
                    Ok(true) => {}
                    Ok(false) => {
                        let _ = reply.send(Err(StoreError::NotFound(format!(
                            "experiment not found: {}",
                            experiment_id
                        ))));
                        return Ok(());
                    }
                    Err(e) => {
                        let _ = reply.send(Err(StoreError::Storage(e)));
                        return Ok(());
                    }
                }

                // Idempotent creation: an exact-parameter duplicate for the
                // same experiment returns the existing job.
                if let Some(existing_id) = state.find_duplicate(experiment_id, &parameters) {
                    if let Some(actor) = state.jobs.get(&existing_id).cloned() {
                        match call_job(&actor, |tx| JobMessage::GetSnapshot { reply: tx }).await {
                            Ok(snapshot) => {
                                tracing::info!(
                                    "Duplicate parameters for experiment {}, returning job {}",
                                    experiment_id,
                                    existing_id
                                );
                                let _ = reply.send(Ok(snapshot.job));
                                return Ok(());
                            }
                            Err(_) => {
                                // Stale index entry; fall through and create.
                                state.jobs.remove(&existing_id);
                                state.fingerprints.remove(&existing_id);
                            }
                        }
                    }
                }

                let job = Job::new(name, experiment_id, parameters);

                if let Err(e) = JobRepository::create(&job).await {
                    let _ = reply.send(Err(StoreError::Storage(e)));
                    return Ok(());
                }

                if let Err(e) = spawn_job_actor(state, job.clone(), MetricHistory::new()).await {
                    let _ = reply.send(Err(StoreError::Actor(format!(
                        "failed to spawn job: {}",
                        e
                    ))));
                    return Ok(());
                }

                let _ = state.event_tx.send(ProgressEvent::status_only(
                    job.id,
                    JobStatus::Pending,
                    0,
                    job.epochs_total(),
                ));

                let _ = reply.send(Ok(job));
            }

            SupervisorMessage::StartJob { job_id, reply } => {
                if let Some(actor) = state.jobs.get(&job_id) {
                    let result = call_job(actor, |tx| JobMessage::Start { reply: tx })
                        .await
                        .and_then(|r| r);
                    let _ = reply.send(result);
                } else {
                    let _ = reply.send(Err(StoreError::NotFound(format!(
                        "job not found: {}",
                        job_id
                    ))));
                }
            }

            SupervisorMessage::CancelJob { job_id, reply } => {
                if let Some(actor) = state.jobs.get(&job_id) {
                    let result = call_job(actor, |tx| JobMessage::Cancel { reply: tx })
                        .await
                        .and_then(|r| r);
                    let _ = reply.send(result);
                } else {
                    let _ = reply.send(Err(StoreError::NotFound(format!(
                        "job not found: {}",
                        job_id
                    ))));
                }
            }

            SupervisorMessage::DeleteJob { job_id, reply } => {
                let Some(actor) = state.jobs.get(&job_id).cloned() else {
                    let _ = reply.send(Err(StoreError::NotFound(format!(
                        "job not found: {}",
                        job_id
                    ))));
                    return Ok(());
                };

                let snapshot = match call_job(&actor, |tx| JobMessage::GetSnapshot { reply: tx }).await
                {
                    Ok(snapshot) => snapshot,
                    Err(e) => {
                        let _ = reply.send(Err(e));
                        return Ok(());
                    }
                };

                if !snapshot.job.is_terminal() {
                    let _ = reply.send(Err(StoreError::Conflict(format!(
                        "job {} is {}; cancel it before deleting",
                        job_id, snapshot.job.status
                    ))));
                    return Ok(());
                }

                if let Err(e) = JobRepository::delete(job_id).await {
                    let _ = reply.send(Err(StoreError::Storage(e)));
                    return Ok(());
                }

                let _ = actor.send_message(JobMessage::Shutdown);
                state.jobs.remove(&job_id);
                state.fingerprints.remove(&job_id);

                let _ = reply.send(Ok(()));
            }

            SupervisorMessage::GetJob { job_id, reply } => {
                if let Some(actor) = state.jobs.get(&job_id) {
                    let result = call_job(actor, |tx| JobMessage::GetSnapshot { reply: tx }).await;
                    let _ = reply.send(result);
                } else {
                    // Not indexed in this process; fall back to persistence.
                    let result = match JobRepository::get_snapshot(job_id).await {
                        Ok(snapshot) => Ok(snapshot),
                        Err(db::DbError::NotFound(_)) => {
                            Err(StoreError::NotFound(format!("job not found: {}", job_id)))
                        }
                        Err(e) => Err(StoreError::Storage(e)),
                    };
                    let _ = reply.send(result);
                }
            }

            SupervisorMessage::RestoreJobs { reply } => {
                let persisted = match JobRepository::list(JobFilter::default()).await {
                    Ok(jobs) => jobs,
                    Err(e) => {
                        let _ = reply.send(Err(StoreError::Storage(e)));
                        return Ok(());
                    }
                };

                let mut restored = 0;
                for job in persisted {
                    if state.jobs.contains_key(&job.id) {
                        continue;
                    }
                    let snapshot = match JobRepository::get_snapshot(job.id).await {
                        Ok(snapshot) => snapshot,
                        Err(e) => {
                            tracing::warn!("Failed to load history for job {}: {}", job.id, e);
                            continue;
                        }
                    };
                    if spawn_job_actor(state, snapshot.job, snapshot.history)
                        .await
                        .is_ok()
                    {
                        restored += 1;
                    }
                }

                tracing::info!("Restored {} persisted jobs", restored);
                let _ = reply.send(Ok(restored));
            }

            SupervisorMessage::Subscribe { reply } => {
                let _ = reply.send(state.event_tx.subscribe());
            }

            SupervisorMessage::Shutdown => {
                tracing::info!("Shutting down job supervisor");
                for actor in state.jobs.values() {
                    let _ = actor.send_message(JobMessage::Shutdown);
                }
                myself.stop(None);
                return Ok(());
            }
        }

        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: SupervisionEvent,
        _state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if let SupervisionEvent::ActorTerminated(cell, _, reason) = message {
            tracing::debug!(
                "Job actor {} terminated: {:?}",
                cell.get_name().unwrap_or_default(),
                reason
            );
        }
        Ok(())
    }
}

/// Start the supervisor with the given trainer adapter.
pub async fn start_supervisor(
    trainer: Arc<dyn Trainer>,
) -> Result<(ActorRef<SupervisorMessage>, tokio::task::JoinHandle<()>), ractor::SpawnErr> {
    let (actor, handle) =
        Actor::spawn(Some("job-supervisor".to_string()), JobSupervisor, trainer).await?;

    Ok((actor, handle))
}
