//! The `text/event-stream` response body of one subscriber.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use scenedeck_core::ClientId;
use tokio::sync::mpsc;

use super::broadcast::EventBroadcaster;

/// Frames queued for one subscriber.
///
/// Dropping the stream (the client went away and hyper dropped the body)
/// unsubscribes it.
#[derive(Debug)]
pub struct SubscriberStream {
    id: ClientId,
    rx: mpsc::Receiver<Bytes>,
    broadcaster: Arc<EventBroadcaster>,
}

impl SubscriberStream {
    /// Subscribe to `broadcaster` and wrap the receiver.
    pub fn open(broadcaster: Arc<EventBroadcaster>) -> Self {
        let (id, rx) = broadcaster.subscribe();
        Self {
            id,
            rx,
            broadcaster,
        }
    }

    /// Id of the subscriber.
    pub fn id(&self) -> &ClientId {
        &self.id
    }
}

impl Stream for SubscriberStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx).map(|frame| frame.map(Ok))
    }
}

impl Drop for SubscriberStream {
    fn drop(&mut self) {
        let _ = self.broadcaster.unsubscribe(&self.id);
    }
}
