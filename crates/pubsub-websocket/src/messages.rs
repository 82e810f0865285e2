//! Wire protocol: JSON frames over the persistent socket.
//!
//! Outbound frames are LISTEN / UNLISTEN / PING; inbound frames are RESPONSE /
//! MESSAGE / PONG. A MESSAGE frame nests a second JSON document in its
//! `data.message` string, which is decoded per topic namespace. Malformed
//! input at any level is a soft failure: the frame is dropped with a
//! diagnostic, never a panic.

mod error;
mod extractor;
mod outbound;
mod parsers;
mod processor;

pub use error::MessageError;
pub use processor::{InboundFrame, MessageProcessor};

pub(crate) use outbound::{listen_frame, unlisten_frame, PING_FRAME};

/// Topic namespace carrying private messages for one identity
pub const WHISPERS_TOPIC_PREFIX: &str = "whispers.";

/// Topic namespace carrying moderation actions for one moderator/channel pair
pub const MODERATION_TOPIC_PREFIX: &str = "chat_moderator_actions.";
