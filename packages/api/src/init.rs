//! Server initialization for the tracker.

use std::sync::Arc;

use actors::{ActorRef, SupervisorMessage, Trainer, start_supervisor};
use db::DbConfig;
use tokio::task::JoinHandle;

use crate::realtime::{ConnectionManager, spawn_event_pump};

/// Handles to the running tracker subsystems.
///
/// Constructed once at startup and passed to the transport layer; nothing
/// here is ambient global state.
pub struct TrackerHandle {
    /// The job store supervisor.
    pub supervisor: ActorRef<SupervisorMessage>,
    /// The push-channel connection registry.
    pub connections: Arc<ConnectionManager>,
    /// The supervisor's join handle.
    pub supervisor_task: JoinHandle<()>,
    /// The event pump bridging store events to connections.
    pub pump_task: JoinHandle<()>,
}

/// Initialize the tracker: database, job store, and event fan-out.
///
/// This should be called once at server startup before handling requests.
pub async fn init_tracker(
    db_config: DbConfig,
    trainer: Arc<dyn Trainer>,
) -> Result<TrackerHandle, Box<dyn std::error::Error>> {
    tracing::info!("Initializing training-job tracker...");

    db::init(db_config).await?;

    let (supervisor, supervisor_task) = start_supervisor(trainer).await?;

    // Respawn actors for jobs that survived a restart.
    let restored = crate::jobs::call_restore(&supervisor).await?;
    if restored > 0 {
        tracing::info!("Restored {} persisted jobs", restored);
    }

    let connections = Arc::new(ConnectionManager::default());
    let events = crate::jobs::subscribe_events(&supervisor).await?;
    let pump_task = spawn_event_pump(connections.clone(), events);

    tracing::info!("Training-job tracker initialized");

    Ok(TrackerHandle {
        supervisor,
        connections,
        supervisor_task,
        pump_task,
    })
}
