//! Trainer adapter contract.
//!
//! The training engine itself is an external collaborator; the job store
//! only consumes its event sequence through this trait.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::Stream;
use tracker_core::{JobId, JobParameters, ProgressEvent};

/// Cooperative cancellation flag shared between the job store and a running
/// trainer. The trainer is expected to check it between epochs; there is no
/// forced interruption mid-epoch.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a new, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A lazy, finite sequence of progress notifications terminating in a final
/// completed/failed event. A stream-level `Err` is a fatal trainer error and
/// maps to a `failed` transition with the error text attached.
pub type TrainerStream = Pin<Box<dyn Stream<Item = Result<ProgressEvent, String>> + Send>>;

/// Trait for the external training engine.
///
/// Implement this trait to plug a real training backend into the job store.
pub trait Trainer: Send + Sync + 'static {
    /// Launch a training run for the given job and return its event stream.
    fn run(&self, job_id: JobId, parameters: JobParameters, cancel: CancelFlag) -> TrainerStream;
}

/// A simple function-based trainer, mainly for tests and wiring demos.
pub struct FnTrainer<F>
where
    F: Fn(JobId, JobParameters, CancelFlag) -> TrainerStream + Send + Sync + 'static,
{
    run_fn: F,
}

impl<F> FnTrainer<F>
where
    F: Fn(JobId, JobParameters, CancelFlag) -> TrainerStream + Send + Sync + 'static,
{
    /// Create a new function-based trainer.
    pub fn new(run_fn: F) -> Self {
        Self { run_fn }
    }
}

impl<F> Trainer for FnTrainer<F>
where
    F: Fn(JobId, JobParameters, CancelFlag) -> TrainerStream + Send + Sync + 'static,
{
    fn run(&self, job_id: JobId, parameters: JobParameters, cancel: CancelFlag) -> TrainerStream {
        (self.run_fn)(job_id, parameters, cancel)
    }
}
