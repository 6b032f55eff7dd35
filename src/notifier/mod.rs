//! # Realtime Notifier
//!
//! Viewers subscribe to subject ids over a WebSocket and receive a
//! `status_update` for every diagnosis status write on that subject.
//! Delivery is best-effort and at most once.

pub mod listener;
pub mod protocol;
pub mod registry;
pub mod ws;

use thiserror::Error;

pub use listener::NotificationListener;
pub use protocol::{ClientMessage, ServerMessage};
pub use registry::{BroadcastReport, ChannelSink, ConnectionId, SubscriptionRegistry, ViewerSink};
pub use ws::router;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifierError {
    #[error("Viewer connection is closed")]
    ViewerGone,

    #[error("Viewer outbound buffer is full")]
    ViewerBackedUp,
}
