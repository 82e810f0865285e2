use serde::{Deserialize, Serialize};
use std::fmt;

/// A chat user carried by moderation events. Value data, not an owning
/// reference; either field may be empty when the server omits it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
	pub name: String,
	pub id: String,
}

impl UserRef {
	pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
		Self { name: name.into(), id: id.into() }
	}
}

impl fmt::Display for UserRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.id.is_empty() {
			write!(f, "{}", self.name)
		} else {
			write!(f, "{}({})", self.name, self.id)
		}
	}
}

/// Channel-wide chat modes a moderator can toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelMode {
	Slow,
	R9K,
	SubscribersOnly,
	EmoteOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModeState {
	On,
	Off,
}

/// What a user was released from by an unban-style action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnbanPreviousState {
	Banned,
	TimedOut,
}

/// Moderation occurrences pushed for a channel the identity moderates.
///
/// `room_id` is the channel the action happened in. `duration` is seconds
/// where present (slow-mode delay, timeout length).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModerationEvent {
	ChatCleared {
		room_id: String,
	},
	ModeChanged {
		room_id: String,
		mode: ChannelMode,
		state: ModeState,
		duration: Option<u64>,
	},
	ModerationStateChanged {
		room_id: String,
		target: UserRef,
		modded: bool,
	},
	UserBanned {
		room_id: String,
		source: UserRef,
		target: UserRef,
		duration: Option<u64>,
		reason: Option<String>,
	},
	UserUnbanned {
		room_id: String,
		source: UserRef,
		target: UserRef,
		previous_state: UnbanPreviousState,
	},
}

/// Private-message traffic on the identity's whisper topic. The payload is
/// the nested server document, passed through verbatim for the messaging
/// layer to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WhisperEvent {
	Received { payload: serde_json::Value },
	Sent { payload: serde_json::Value },
}

/// Connectivity changes surfaced to the application.
///
/// `ConnectionDegraded` carries the raw connection number of the client that
/// missed its pong deadline; the pool recycles that connection after
/// publishing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectivityEvent {
	ConnectionsChanged { active: usize },
	ConnectionDegraded { connection: u64 },
}

/// Unified event delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PubSubEvent {
	Moderation(ModerationEvent),
	Whisper(WhisperEvent),
	Connectivity(ConnectivityEvent),
}

impl From<ModerationEvent> for PubSubEvent {
	fn from(event: ModerationEvent) -> Self {
		Self::Moderation(event)
	}
}

impl From<WhisperEvent> for PubSubEvent {
	fn from(event: WhisperEvent) -> Self {
		Self::Whisper(event)
	}
}

impl From<ConnectivityEvent> for PubSubEvent {
	fn from(event: ConnectivityEvent) -> Self {
		Self::Connectivity(event)
	}
}
