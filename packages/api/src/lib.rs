//! Server-side synchronization surface for the training-job tracker.
//!
//! This crate bridges the job store to observers:
//! - `ConnectionManager` - registry of live push-channel connections and
//!   their subscriptions, with non-blocking fan-out
//! - the event pump forwarding store events into the manager
//! - thin pull/control functions over the supervisor and repositories

mod experiments;
mod init;
mod jobs;
mod realtime;

pub use experiments::{create_experiment, delete_experiment, get_experiment, list_experiments};
pub use init::{TrackerHandle, init_tracker};
pub use jobs::{
    CreateJobRequest, cancel_job, create_job, delete_job, get_job, list_jobs, start_job,
    subscribe_events,
};
pub use realtime::{ClientId, ConnectionManager, spawn_event_pump};
