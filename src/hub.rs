//! Fan-out of serialized events to push-channel subscribers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;

use crate::payload::{BroadcastPayload, EventEnvelope};

/// Sink for broadcast events.
pub trait Broadcaster: Send + Sync {
    /// Deliver one event to every current subscriber without waiting on any of
    /// them. Returns how many subscribers were handed the event; zero
    /// subscribers is not an error.
    fn emit(&self, event: &str, payload: &BroadcastPayload) -> Result<usize>;

    fn subscriber_count(&self) -> usize;
}

/// Bounded broadcast channel carrying pre-serialized JSON text frames.
///
/// Each event is serialized once and shared between subscribers. A subscriber
/// that falls more than `capacity` events behind loses the oldest ones.
#[derive(Clone)]
pub struct EventHub {
    tx: broadcast::Sender<Arc<str>>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<str>> {
        self.tx.subscribe()
    }

    /// Send an already serialized text frame.
    pub fn send_raw(&self, text: Arc<str>) -> usize {
        // An error only means nobody is listening right now.
        self.tx.send(text).unwrap_or(0)
    }
}

impl Broadcaster for EventHub {
    fn emit(&self, event: &str, payload: &BroadcastPayload) -> Result<usize> {
        let text = serde_json::to_string(&EventEnvelope {
            event: event.to_string(),
            data: payload,
        })
        .with_context(|| format!("failed to serialize '{}' event", event))?;
        Ok(self.send_raw(Arc::from(text)))
    }

    fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
