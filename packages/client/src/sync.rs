//! Transport-generic synchronization loop with fixed-delay reconnect.

use std::collections::HashSet;
use std::time::Duration;

use thiserror::Error;
use tracker_core::protocol::ProtocolError;
use tracker_core::{Envelope, ExperimentId, Job, JobId, JobSnapshot, SubscribeRequest, Topic};

use crate::store::ReconciliationStore;

/// Push-channel or pull failures on the observer side.
///
/// Contained here: a transport error triggers a reconnect and never
/// surfaces as a job-level failure.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Io(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("request failed: {0}")]
    Request(String),
}

/// Fixed-delay reconnect policy: unbounded attempts, never retrying
/// tighter than the configured delay.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy with the given delay between attempts.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// The delay applied between reconnect attempts.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

/// One established push-channel connection.
#[allow(async_fn_in_trait)]
pub trait PushConnection: Send {
    /// Send a subscription request upstream.
    async fn send(&mut self, request: &SubscribeRequest) -> Result<(), TransportError>;

    /// Await the next envelope. `None` means the channel closed cleanly.
    async fn next_envelope(&mut self) -> Result<Option<Envelope>, TransportError>;
}

/// Factory for push-channel connections.
#[allow(async_fn_in_trait)]
pub trait PushTransport: Send {
    type Connection: PushConnection;

    /// Establish a fresh connection with a fresh client identity.
    async fn connect(&mut self) -> Result<Self::Connection, TransportError>;
}

/// Pull transport for authoritative snapshots.
#[allow(async_fn_in_trait)]
pub trait SnapshotApi: Send {
    /// Fetch one job with its full history.
    async fn job_snapshot(&mut self, job_id: JobId) -> Result<JobSnapshot, TransportError>;

    /// Fetch the job list, optionally filtered by experiment. No history.
    async fn list_jobs(
        &mut self,
        experiment_id: Option<ExperimentId>,
    ) -> Result<Vec<Job>, TransportError>;
}

/// Observer-side synchronization client.
///
/// Owns the reconciliation store and keeps it consistent across
/// disconnects: every successful (re)connect re-subscribes and re-pulls
/// snapshots for all tracked topics before any delta is trusted.
pub struct SyncClient<T, S> {
    transport: T,
    snapshots: S,
    store: ReconciliationStore,
    policy: RetryPolicy,
    topics: HashSet<Topic>,
}

impl<T, S> SyncClient<T, S>
where
    T: PushTransport,
    S: SnapshotApi,
{
    /// Create a client over the given transports.
    pub fn new(transport: T, snapshots: S, policy: RetryPolicy) -> Self {
        Self {
            transport,
            snapshots,
            store: ReconciliationStore::new(),
            policy,
            topics: HashSet::new(),
        }
    }

    /// The merged views accumulated so far.
    pub fn store(&self) -> &ReconciliationStore {
        &self.store
    }

    /// Follow a topic. Takes effect on the next (re)connect.
    pub fn track(&mut self, topic: Topic) {
        self.topics.replace(topic);
    }

    /// Stop following a topic.
    pub fn untrack(&mut self, topic: Topic) {
        self.topics.remove(&topic);
    }

    /// Connect, retrying at the fixed delay until a connection is
    /// established.
    async fn establish(&mut self) -> T::Connection {
        loop {
            match self.transport.connect().await {
                Ok(connection) => return connection,
                Err(e) => {
                    tracing::warn!("Connect failed, retrying in {:?}: {}", self.policy.delay(), e);
                    tokio::time::sleep(self.policy.delay()).await;
                }
            }
        }
    }

    /// Re-subscribe and re-pull snapshots for every tracked topic.
    ///
    /// Runs after every successful connect, before any delta is applied.
    async fn resync(&mut self, connection: &mut T::Connection) -> Result<(), TransportError> {
        for topic in self.topics.clone() {
            connection.send(&SubscribeRequest::subscribe(topic)).await?;
        }

        if self.topics.contains(&Topic::All) {
            let jobs = self.snapshots.list_jobs(None).await?;
            self.store.merge_jobs(jobs);
        }

        for topic in self.topics.clone() {
            if let Topic::Job(job_id) = topic {
                let snapshot = self.snapshots.job_snapshot(job_id).await?;
                self.store.apply_snapshot(snapshot);
            }
        }

        Ok(())
    }

    /// Apply deltas until the connection ends, one way or another.
    async fn consume(&mut self, connection: &mut T::Connection) -> usize {
        let mut applied = 0;
        loop {
            match connection.next_envelope().await {
                Ok(Some(envelope)) => {
                    if self.store.apply_event(&envelope.data) {
                        applied += 1;
                    }
                }
                Ok(None) => return applied,
                Err(e) => {
                    tracing::warn!("Push channel failed, will reconnect: {}", e);
                    return applied;
                }
            }
        }
    }

    /// One connect / resync / consume cycle.
    ///
    /// Returns the number of deltas applied once the connection ends. An
    /// error means the post-connect resync failed; the caller (or [`run`])
    /// simply tries again after the retry delay.
    ///
    /// [`run`]: SyncClient::run
    pub async fn sync_once(&mut self) -> Result<usize, TransportError> {
        let mut connection = self.establish().await;
        self.resync(&mut connection).await?;
        Ok(self.consume(&mut connection).await)
    }

    /// Synchronize forever, reconnecting at the fixed delay after every
    /// disconnect. Runs until the owning task is dropped or aborted.
    pub async fn run(&mut self) {
        loop {
            if let Err(e) = self.sync_once().await {
                tracing::warn!("Resync failed, reconnecting: {}", e);
            }
            tokio::time::sleep(self.policy.delay()).await;
        }
    }
}
