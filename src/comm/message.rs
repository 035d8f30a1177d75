//! The [`Message`] envelope exchanged over a [`super::CommunicationChannel`].

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

/// Category of a published message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// A directive addressed to one or more targets.
    Command,
    /// Notification of something that happened.
    Event,
    /// Opaque application payload.
    Data,
    /// Liveness ping emitted by the fabric's background loop.
    Heartbeat,
}

impl Default for MessageType {
    fn default() -> Self {
        Self::Data
    }
}

/// A message published on a channel (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message id, derived from a hash of wall-clock time, pid, and task id.
    pub id: String,
    /// Message category.
    pub message_type: MessageType,
    /// Opaque payload, typically JSON.
    pub content: String,
    /// Name of the publishing container.
    pub source: String,
    /// Target container names; empty means broadcast to every participant.
    pub targets: Vec<String>,
    /// Unix-epoch milliseconds at publish time.
    pub timestamp: i64,
}

impl Message {
    /// Construct a message, generating its id and timestamp.
    #[must_use]
    pub fn new(
        message_type: MessageType,
        content: impl Into<String>,
        source: impl Into<String>,
        targets: Vec<String>,
    ) -> Self {
        Self {
            id: generate_message_id(),
            message_type,
            content: content.into(),
            source: source.into(),
            targets,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Construct the fabric's own heartbeat message: empty source, broadcast targets.
    #[must_use]
    pub fn heartbeat() -> Self {
        Self::new(MessageType::Heartbeat, "", "", Vec::new())
    }

    /// Whether this message addresses every participant.
    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        self.targets.is_empty()
    }

    /// Serialize to the on-wire JSON record.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Derive a message id from wall-clock time, process id, and the calling thread
/// (the closest stable analogue of the source's time+pid+thread hash, since
/// async tasks don't carry OS thread identity 1:1 — `std::thread::current().id()`
/// stands in for it).
fn generate_message_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let pid = std::process::id();
    let thread_id = std::thread::current().id();

    let mut hasher = DefaultHasher::new();
    nanos.hash(&mut hasher);
    pid.hash(&mut hasher);
    thread_id.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_is_empty_targets() {
        let msg = Message::new(MessageType::Data, "payload", "svc-a", vec![]);
        assert!(msg.is_broadcast());
    }

    #[test]
    fn targeted_is_not_broadcast() {
        let msg = Message::new(MessageType::Command, "go", "svc-a", vec!["svc-b".to_string()]);
        assert!(!msg.is_broadcast());
    }

    #[test]
    fn ids_are_distinct_across_calls() {
        let a = generate_message_id();
        let b = generate_message_id();
        assert_ne!(a, b);
    }

    #[test]
    fn heartbeat_defaults() {
        let hb = Message::heartbeat();
        assert_eq!(hb.message_type, MessageType::Heartbeat);
        assert!(hb.source.is_empty());
        assert!(hb.is_broadcast());
    }

    #[test]
    fn round_trips_through_json() {
        let msg = Message::new(MessageType::Event, "{}", "svc-a", vec![]);
        let json = msg.to_json().unwrap();
        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, msg.id);
    }
}
