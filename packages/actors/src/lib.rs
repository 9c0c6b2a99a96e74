//! Actor system for the training-job store.
//!
//! This crate provides the ractor-based job store: the authoritative state
//! machine for each job and the supervisor that owns the job index.
//!
//! # Architecture
//!
//! - `JobSupervisor` - Top-level actor owning the job index and the event
//!   broadcast channel; handles create/start/cancel/delete requests
//! - `JobActor` - Single writer for one job's state and metric history;
//!   drives the trainer's event stream
//! - `Trainer` - Adapter contract for the external training engine
//!
//! # Usage
//!
//! ```ignore
//! use actors::{SupervisorMessage, start_supervisor};
//!
//! let (supervisor, handle) = start_supervisor(trainer).await?;
//!
//! // Create a job via message
//! supervisor.send_message(SupervisorMessage::CreateJob { ... })?;
//! ```

mod job_actor;
mod messages;
mod supervisor;
mod trainer;

pub use job_actor::{JobActor, JobActorState};
pub use messages::{JobMessage, StoreError, SupervisorMessage};
pub use supervisor::{JobSupervisor, start_supervisor};
pub use trainer::{CancelFlag, FnTrainer, Trainer, TrainerStream};

/// Re-export ractor types for convenience.
pub use ractor::{Actor, ActorRef, RpcReplyPort, concurrency};
