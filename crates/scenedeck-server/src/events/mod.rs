//! Server-Sent Events: subscriber registry, supervisor bridge and response body.

pub mod bridge;
pub mod broadcast;
pub mod stream;

pub use bridge::EventBridge;
pub use broadcast::{EventBroadcaster, WriteFailed};
pub use stream::SubscriberStream;
