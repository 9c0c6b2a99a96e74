//! Core domain types for the training-job tracker.
//!
//! This crate contains shared types used across all packages:
//! - Job, JobStatus and MetricHistory for tracked training runs
//! - JobParameters with variant-specific validation
//! - ProgressEvent deltas and the push-channel wire protocol

mod events;
mod experiment;
mod history;
mod job;
mod params;
pub mod protocol;

pub use events::ProgressEvent;
pub use experiment::{Experiment, ExperimentId};
pub use history::{EpochMetrics, MetricHistory};
pub use job::{Job, JobId, JobSnapshot, JobStatus};
pub use params::{JobParameters, Optimizer, SharedParams, ValidationError};
pub use protocol::{Envelope, SubscribeAction, SubscribeRequest, Topic};
