use async_broadcast::{Receiver, Sender};
use thiserror::Error;

use crate::events::PubSubEvent;

/// Broadcast-specific error types
#[derive(Debug, Error)]
pub enum BroadcastError {
	#[error("Broadcast channel error: {0}")]
	Channel(#[from] async_broadcast::SendError<PubSubEvent>),
}

/// Fan-out channel for decoded events.
///
/// Overflow is enabled: a slow subscriber loses old events rather than
/// backpressuring the multiplexer's event loop. The broadcaster keeps one
/// internal receiver alive so publishing before the first subscriber attaches
/// is not an error.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
	sender: Sender<PubSubEvent>,
	_keep_alive: Receiver<PubSubEvent>,
}

impl EventBroadcaster {
	#[must_use]
	pub fn new(capacity: usize) -> Self {
		let (mut sender, keep_alive) = async_broadcast::broadcast(capacity);
		sender.set_overflow(true);
		sender.set_await_active(false);

		Self { sender, _keep_alive: keep_alive }
	}

	/// Create a new receiver attached to the live end of the channel
	pub fn subscribe(&self) -> Receiver<PubSubEvent> {
		self.sender.new_receiver()
	}

	/// Publish one event to all current subscribers
	pub async fn publish(&self, event: impl Into<PubSubEvent>) -> Result<(), BroadcastError> {
		self.sender.broadcast(event.into()).await.map(|_| ()).map_err(BroadcastError::Channel)
	}

	pub fn subscriber_count(&self) -> usize {
		// The keep-alive receiver is not a subscriber
		self.sender.receiver_count().saturating_sub(1)
	}
}

impl Default for EventBroadcaster {
	fn default() -> Self {
		Self::new(64)
	}
}
