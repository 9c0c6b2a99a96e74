//! Wire protocol for the push channel.
//!
//! Inbound messages are subscription requests; outbound messages are
//! `{ job_id, data }` envelopes wrapping a [`ProgressEvent`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{JobId, ProgressEvent};

/// Spelling of the wildcard topic on the wire.
pub const WILDCARD: &str = "*";

/// Protocol errors for inbound push-channel messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid topic: {0}")]
    InvalidTopic(String),
}

/// A subscription target: one job, or every job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Topic {
    /// Deltas for a single job.
    Job(JobId),
    /// Wildcard: deltas for every job.
    All,
}

impl Topic {
    /// Parse a topic from its wire spelling.
    pub fn parse(s: &str) -> Result<Self, ProtocolError> {
        if s == WILDCARD {
            return Ok(Topic::All);
        }
        JobId::parse(s)
            .map(Topic::Job)
            .map_err(|_| ProtocolError::InvalidTopic(s.to_string()))
    }

    /// Whether this topic matches events for the given job.
    pub fn matches(&self, job_id: JobId) -> bool {
        match self {
            Topic::Job(id) => *id == job_id,
            Topic::All => true,
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topic::Job(id) => write!(f, "{}", id),
            Topic::All => write!(f, "{}", WILDCARD),
        }
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.to_string()
    }
}

impl TryFrom<String> for Topic {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Topic::parse(&s).map_err(|e| e.to_string())
    }
}

/// What a subscription request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscribeAction {
    Subscribe,
    Unsubscribe,
}

/// Inbound push-channel message: change this connection's subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub action: SubscribeAction,
    pub topic: Topic,
}

impl SubscribeRequest {
    pub fn subscribe(topic: Topic) -> Self {
        Self {
            action: SubscribeAction::Subscribe,
            topic,
        }
    }

    pub fn unsubscribe(topic: Topic) -> Self {
        Self {
            action: SubscribeAction::Unsubscribe,
            topic,
        }
    }

    /// Parse an inbound message.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode for the wire.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Outbound push-channel message wrapping one progress delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub job_id: JobId,
    pub data: ProgressEvent,
}

impl Envelope {
    /// Wrap an event; the envelope's `job_id` duplicates the event's.
    pub fn new(data: ProgressEvent) -> Self {
        Self {
            job_id: data.job_id,
            data,
        }
    }

    /// Parse an outbound message on the observer side.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode for the wire.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
