//! Typed domain events published by the pub/sub multiplexer.
//!
//! The multiplexer decodes server-pushed frames into the event types in this
//! crate and hands them to the application through an [`EventBroadcaster`].
//! Events are immutable values; the core does not retain them after publish.

pub mod broadcast;
pub mod events;

pub use broadcast::{BroadcastError, EventBroadcaster};
pub use events::{ChannelMode, ConnectivityEvent, ModeState, ModerationEvent, PubSubEvent, UnbanPreviousState, UserRef, WhisperEvent};
