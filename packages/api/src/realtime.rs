//! Real-time push channel: connection registry and event fan-out.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracker_core::protocol::{Envelope, ProtocolError, SubscribeAction, SubscribeRequest, Topic};
use tracker_core::{JobId, ProgressEvent};
use ulid::Ulid;

/// Opaque identifier assigned to a connection when it is registered.
///
/// A reconnecting observer gets a fresh identity; dead connections are
/// never resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Ulid);

impl ClientId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One live connection's outbound state.
struct Connection {
    tx: mpsc::Sender<Envelope>,
    topics: HashSet<Topic>,
    dropped: u64,
}

/// Registry of live push-channel connections.
///
/// Constructed once and passed by reference; owns the topic -> connections
/// mapping. A topic maps to the set of subscribed connections, so multiple
/// observers of the same job all receive its deltas. Fan-out is
/// non-blocking: a full outbound buffer drops the message for that
/// connection only and bumps its drop counter.
pub struct ConnectionManager {
    connections: RwLock<HashMap<ClientId, Connection>>,
    buffer_size: usize,
}

impl ConnectionManager {
    /// Default outbound buffer capacity per connection.
    pub const DEFAULT_BUFFER: usize = 64;

    /// Create a manager with the given per-connection buffer capacity.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Register a new connection, assigning it a fresh client id.
    ///
    /// The returned receiver feeds the transport's write loop; dropping it
    /// counts as a disconnect and the connection is swept on the next
    /// publish.
    pub fn register(&self) -> (ClientId, mpsc::Receiver<Envelope>) {
        let client_id = ClientId::new();
        let (tx, rx) = mpsc::channel(self.buffer_size);

        let mut connections = self.connections.write().unwrap();
        connections.insert(
            client_id,
            Connection {
                tx,
                topics: HashSet::new(),
                dropped: 0,
            },
        );

        tracing::info!("Client {} connected", client_id);
        (client_id, rx)
    }

    /// Remove a connection after a transport failure or clean close.
    pub fn disconnect(&self, client_id: ClientId) -> bool {
        let removed = self
            .connections
            .write()
            .unwrap()
            .remove(&client_id)
            .is_some();
        if removed {
            tracing::info!("Client {} disconnected", client_id);
        }
        removed
    }

    /// Subscribe a connection to a topic.
    ///
    /// Subscribing to a topic the connection already holds replaces the
    /// previous subscription rather than duplicating delivery.
    pub fn subscribe(&self, client_id: ClientId, topic: Topic) -> bool {
        let mut connections = self.connections.write().unwrap();
        match connections.get_mut(&client_id) {
            Some(connection) => {
                connection.topics.replace(topic);
                true
            }
            None => false,
        }
    }

    /// Remove one of a connection's subscriptions.
    pub fn unsubscribe(&self, client_id: ClientId, topic: Topic) -> bool {
        let mut connections = self.connections.write().unwrap();
        match connections.get_mut(&client_id) {
            Some(connection) => connection.topics.remove(&topic),
            None => false,
        }
    }

    /// Apply an inbound push-channel message (a subscription request).
    pub fn handle_message(&self, client_id: ClientId, text: &str) -> Result<(), ProtocolError> {
        let request = SubscribeRequest::parse(text)?;
        match request.action {
            SubscribeAction::Subscribe => self.subscribe(client_id, request.topic),
            SubscribeAction::Unsubscribe => self.unsubscribe(client_id, request.topic),
        };
        Ok(())
    }

    /// Fan an envelope out to every connection subscribed to the job or to
    /// the wildcard topic. Returns the number of successful deliveries.
    ///
    /// Never blocks: slow observers lose this message, closed connections
    /// are swept from the registry.
    pub fn publish(&self, envelope: &Envelope) -> usize {
        let mut connections = self.connections.write().unwrap();
        let mut delivered = 0;
        let mut dead = Vec::new();

        for (client_id, connection) in connections.iter_mut() {
            if !connection.topics.iter().any(|t| t.matches(envelope.job_id)) {
                continue;
            }
            match connection.tx.try_send(envelope.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    connection.dropped += 1;
                    tracing::warn!(
                        "Client {} buffer full, dropping event for job {} ({} dropped so far)",
                        client_id,
                        envelope.job_id,
                        connection.dropped
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    dead.push(*client_id);
                }
            }
        }

        for client_id in dead {
            connections.remove(&client_id);
            tracing::info!("Client {} gone, removed from registry", client_id);
        }

        delivered
    }

    /// Messages dropped for a connection because its buffer was full.
    pub fn dropped(&self, client_id: ClientId) -> u64 {
        self.connections
            .read()
            .unwrap()
            .get(&client_id)
            .map(|c| c.dropped)
            .unwrap_or(0)
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.read().unwrap().len()
    }

    /// Number of connections that would receive events for a job.
    pub fn subscriber_count(&self, job_id: JobId) -> usize {
        self.connections
            .read()
            .unwrap()
            .values()
            .filter(|c| c.topics.iter().any(|t| t.matches(job_id)))
            .count()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BUFFER)
    }
}

/// Bridge the job store's event channel into the connection manager.
///
/// Runs until the store side closes; a lagged receiver logs and keeps
/// going, since observers recover via snapshot pulls anyway.
pub fn spawn_event_pump(
    manager: Arc<ConnectionManager>,
    mut events: broadcast::Receiver<ProgressEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    manager.publish(&Envelope::new(event));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event pump lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
