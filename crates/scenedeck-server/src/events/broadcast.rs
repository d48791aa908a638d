//! Registry of event-stream subscribers and fan-out of [`StreamMessage`]s.

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::Mutex;
use scenedeck_core::{ClientId, StreamMessage};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Why a frame could not be queued for a subscriber.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum WriteFailed {
    /// The response body was dropped.
    #[error("subscriber disconnected")]
    Closed,
    /// The subscriber stopped reading and its queue filled up.
    #[error("subscriber queue full")]
    QueueFull,
}

/// Open event streams, keyed by client id.
///
/// Each subscriber gets a bounded queue of pre-framed SSE chunks. A failed
/// write removes the subscriber in the same call; nothing is retried.
#[derive(Debug)]
pub struct EventBroadcaster {
    subscribers: Mutex<HashMap<ClientId, mpsc::Sender<Bytes>>>,
    max_send_queue: usize,
}

impl EventBroadcaster {
    /// Registry whose subscribers queue up to `max_send_queue` frames.
    pub fn new(max_send_queue: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            max_send_queue: max_send_queue.max(1),
        }
    }

    /// Register a subscriber. The `connected` handshake is already queued
    /// on the returned receiver.
    pub fn subscribe(&self) -> (ClientId, mpsc::Receiver<Bytes>) {
        let id = ClientId::new();
        let (tx, rx) = mpsc::channel(self.max_send_queue);
        let handshake = StreamMessage::Connected {
            client_id: id.clone(),
        };
        match handshake.to_sse_frame() {
            Ok(frame) => {
                let _ = tx.try_send(Bytes::from(frame));
            }
            Err(e) => warn!(client_id = %id, error = %e, "failed to serialize handshake"),
        }
        let count = {
            let mut subscribers = self.subscribers.lock();
            let _ = subscribers.insert(id.clone(), tx);
            subscribers.len()
        };
        info!(client_id = %id, subscribers = count, "event stream subscribed");
        (id, rx)
    }

    /// Remove a subscriber. Returns whether it was registered.
    pub fn unsubscribe(&self, id: &ClientId) -> bool {
        let removed = self.subscribers.lock().remove(id).is_some();
        if removed {
            info!(client_id = %id, "event stream closed");
        }
        removed
    }

    /// Queue `message` for every subscriber, dropping the ones that fail.
    ///
    /// Serializes once. Returns how many subscribers received the frame.
    pub fn broadcast(&self, message: &StreamMessage) -> usize {
        let frame = match message.to_sse_frame() {
            Ok(frame) => Bytes::from(frame),
            Err(e) => {
                warn!(message_type = message.type_name(), error = %e, "failed to serialize event");
                return 0;
            }
        };

        let mut subscribers = self.subscribers.lock();
        let mut failed = Vec::new();
        for (id, tx) in subscribers.iter() {
            if let Err(reason) = write(tx, frame.clone()) {
                failed.push((id.clone(), reason));
            }
        }
        for (id, reason) in &failed {
            let _ = subscribers.remove(id);
            warn!(client_id = %id, %reason, "dropping event-stream subscriber");
        }
        let delivered = subscribers.len();
        debug!(
            message_type = message.type_name(),
            delivered,
            dropped = failed.len(),
            "broadcast event"
        );
        delivered
    }

    /// Number of open subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

fn write(tx: &mpsc::Sender<Bytes>, frame: Bytes) -> Result<(), WriteFailed> {
    tx.try_send(frame).map_err(|e| match e {
        mpsc::error::TrySendError::Full(_) => WriteFailed::QueueFull,
        mpsc::error::TrySendError::Closed(_) => WriteFailed::Closed,
    })
}
