//! Job actor: the single writer for one job's state and metric history.

use std::sync::Arc;

use chrono::Utc;
use db::repositories::JobRepository;
use futures_util::StreamExt;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracker_core::{Job, JobSnapshot, JobStatus, MetricHistory, ProgressEvent};

use crate::messages::{JobMessage, StoreError};
use crate::trainer::{CancelFlag, Trainer};

/// State for a job actor.
pub struct JobActorState {
    /// Authoritative job state.
    pub job: Job,
    /// Accumulated per-epoch metrics; length always equals `epochs_completed`.
    pub history: MetricHistory,
    /// Cooperative cancellation flag shared with the trainer.
    cancel: CancelFlag,
    /// Trainer adapter driving this job once started.
    trainer: Arc<dyn Trainer>,
    /// Event broadcaster shared with the supervisor.
    event_tx: broadcast::Sender<ProgressEvent>,
    /// Driver task consuming the trainer stream, once started.
    driver: Option<JoinHandle<()>>,
}

impl JobActorState {
    /// Create state for a freshly created or restored job.
    pub fn new(
        job: Job,
        history: MetricHistory,
        trainer: Arc<dyn Trainer>,
        event_tx: broadcast::Sender<ProgressEvent>,
    ) -> Self {
        Self {
            job,
            history,
            cancel: CancelFlag::new(),
            trainer,
            event_tx,
            driver: None,
        }
    }

    /// Broadcast an applied event. Observers that lag simply miss it.
    fn broadcast(&self, event: ProgressEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Stamp the terminal fields on the job.
    fn finish(&mut self, status: JobStatus, error: Option<String>) {
        let now = Utc::now();
        self.job.status = status;
        self.job.completed_at = Some(now);
        self.job.total_time = self
            .job
            .started_at
            .map(|started| (now - started).num_milliseconds() as f64 / 1000.0);
        if error.is_some() {
            self.job.error = error;
        }
    }
}

/// Actor managing a single job's lifecycle.
pub struct JobActor;

impl Actor for JobActor {
    type Msg = JobMessage;
    type State = JobActorState;
    type Arguments = JobActorState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting job actor: {} ({})", args.job.name, args.job.id);
        Ok(args)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            JobMessage::Start { reply } => {
                // Starting a running or terminal job is a no-op.
                if state.job.status != JobStatus::Pending {
                    let _ = reply.send(Ok(state.job.clone()));
                    return Ok(());
                }

                let mut started = state.job.clone();
                started.status = JobStatus::Running;
                started.started_at = Some(Utc::now());

                if let Err(e) = JobRepository::update(&started, &state.history).await {
                    let _ = reply.send(Err(StoreError::Storage(e)));
                    return Ok(());
                }
                state.job = started;

                state.broadcast(ProgressEvent::status_only(
                    state.job.id,
                    JobStatus::Running,
                    state.job.epochs_completed,
                    state.job.epochs_total(),
                ));

                // Drive the trainer's lazy event sequence back into this
                // actor; the actor remains the only writer.
                let job_id = state.job.id;
                let epochs_total = state.job.epochs_total();
                let stream_src = state.trainer.clone();
                let parameters = state.job.parameters.clone();
                let cancel = state.cancel.clone();
                let actor = myself.clone();
                state.driver = Some(tokio::spawn(async move {
                    let mut stream = stream_src.run(job_id, parameters, cancel);
                    let mut saw_terminal = false;
                    while let Some(item) = stream.next().await {
                        let event = match item {
                            Ok(event) => event,
                            Err(error) => {
                                // Fatal trainer error: absorbed into the
                                // job's terminal state, never re-raised.
                                saw_terminal = true;
                                let _ = actor.send_message(JobMessage::Progress {
                                    event: ProgressEvent::failed(job_id, 0, epochs_total, error),
                                });
                                break;
                            }
                        };
                        let terminal = event.is_terminal();
                        if actor.send_message(JobMessage::Progress { event }).is_err() {
                            return;
                        }
                        if terminal {
                            saw_terminal = true;
                            break;
                        }
                    }
                    if !saw_terminal {
                        let _ = actor.send_message(JobMessage::Progress {
                            event: ProgressEvent::failed(
                                job_id,
                                0,
                                epochs_total,
                                "trainer ended without a terminal event",
                            ),
                        });
                    }
                }));

                let _ = reply.send(Ok(state.job.clone()));
            }

            JobMessage::Progress { event } => {
                // Terminal states are sinks.
                if state.job.is_terminal() {
                    tracing::warn!(
                        "Job {}: ignoring event after terminal state ({})",
                        state.job.id,
                        event.description()
                    );
                    return Ok(());
                }

                let mut applied = false;

                if let Some(metrics) = event.metrics {
                    let expected = state.job.epochs_completed + 1;
                    if event.epoch == expected && !state.cancel.is_set() {
                        state.history.push(metrics);
                        state.job.epochs_completed = event.epoch;
                        applied = true;
                    } else {
                        // Out-of-order, duplicate, or post-cancel epoch rows
                        // are logged and never applied.
                        tracing::warn!(
                            "Job {}: ignoring epoch {} row (expected {}, cancel_requested={})",
                            state.job.id,
                            event.epoch,
                            expected,
                            state.cancel.is_set()
                        );
                    }
                }

                if let Some(best) = event.best_accuracy {
                    let merged = match state.job.best_accuracy {
                        Some(current) => current.max(best),
                        None => best,
                    };
                    if state.job.best_accuracy != Some(merged) {
                        state.job.best_accuracy = Some(merged);
                        applied = true;
                    }
                }

                match event.status {
                    JobStatus::Completed | JobStatus::Failed => {
                        state.finish(event.status, event.error.clone());
                        applied = true;
                    }
                    JobStatus::Running if state.job.status != JobStatus::Running => {
                        state.job.status = JobStatus::Running;
                        applied = true;
                    }
                    JobStatus::Running | JobStatus::Pending => {}
                }

                if !applied {
                    return Ok(());
                }

                // Mid-run persistence failures must not kill the run; the
                // next applied event writes the full state again.
                if let Err(e) = JobRepository::update(&state.job, &state.history).await {
                    tracing::warn!("Failed to persist job {}: {}", state.job.id, e);
                }

                state.broadcast(event);
            }

            JobMessage::Cancel { reply } => {
                match state.job.status {
                    JobStatus::Completed | JobStatus::Failed => {
                        let _ = reply.send(Err(StoreError::Conflict(format!(
                            "job {} is already {}",
                            state.job.id, state.job.status
                        ))));
                    }
                    JobStatus::Pending => {
                        // Nothing is running yet: fail immediately.
                        let previous = state.job.clone();
                        state.cancel.set();
                        state.finish(JobStatus::Failed, Some("cancelled by request".into()));

                        if let Err(e) = JobRepository::update(&state.job, &state.history).await {
                            state.job = previous;
                            let _ = reply.send(Err(StoreError::Storage(e)));
                            return Ok(());
                        }

                        state.broadcast(ProgressEvent::failed(
                            state.job.id,
                            state.job.epochs_completed,
                            state.job.epochs_total(),
                            "cancelled by request",
                        ));
                        let _ = reply.send(Ok(state.job.clone()));
                    }
                    JobStatus::Running => {
                        // Cooperative: the trainer observes the flag at the
                        // next epoch boundary and terminates the stream.
                        state.cancel.set();
                        let _ = reply.send(Ok(state.job.clone()));
                    }
                }
            }

            JobMessage::GetSnapshot { reply } => {
                let _ = reply.send(JobSnapshot::new(state.job.clone(), state.history.clone()));
            }

            JobMessage::Shutdown => {
                tracing::info!("Shutting down job actor: {}", state.job.id);
                if let Some(driver) = state.driver.take() {
                    driver.abort();
                }
                myself.stop(None);
                return Ok(());
            }
        }

        Ok(())
    }
}
