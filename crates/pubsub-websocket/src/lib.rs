// pubsub-websocket Library
//
// Multiplexes topic subscriptions for a real-time pub/sub service over a pool
// of websocket connections. Each connection holds at most
// `max_topics_per_connection` topics; requests that fit nowhere are queued
// until a connection with room appears. Liveness is maintained per connection
// with an application-level PING/PONG heartbeat, and server-pushed messages
// are decoded into the typed events of the `pubsub-events` crate.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

mod config;
mod core;
mod credentials;
pub mod messages;
pub mod transport;

pub use config::{PubSubConfig, DEFAULT_MAX_TOPICS_PER_CONNECTION};
pub use credentials::Credentials;
pub use messages::{MessageError, MODERATION_TOPIC_PREFIX, WHISPERS_TOPIC_PREFIX};
pub use pubsub_events as events;

pub use crate::core::{PoolError, PubSubHandle};

use crate::core::PubSubPool;
use pubsub_events::{EventBroadcaster, PubSubEvent};
use transport::{Transport, TransportError, TransportEvent, WebSocketTransport};

const TRANSPORT_EVENT_BUFFER: usize = 256;
const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 64;

/// Errors for the pubsub-websocket crate
#[derive(Debug, Error)]
pub enum PubSubError {
	#[error("Transport error: {0}")]
	Transport(#[from] TransportError),

	#[error("Pool error: {0}")]
	Pool(#[from] PoolError),
}

/// Owner of the multiplexer: the pool actor task, the transport, and the
/// event fan-out.
///
/// All operations are safe to call from any task; they are marshalled onto
/// the pool's event loop and never block the caller.
pub struct PubSubManager<T: Transport> {
	handle: PubSubHandle,
	transport: Arc<T>,
	broadcaster: EventBroadcaster,
	pool_task: tokio::task::JoinHandle<()>,
}

impl PubSubManager<WebSocketTransport> {
	/// Create a manager backed by real websocket connections to the
	/// configured service. Call [`connect`](Self::connect) to open the first
	/// connection.
	#[must_use]
	pub fn new(config: PubSubConfig) -> Self {
		let (event_tx, event_rx) = mpsc::channel(TRANSPORT_EVENT_BUFFER);
		let transport = Arc::new(WebSocketTransport::new(config.url.clone(), event_tx));
		Self::with_transport(config, transport, event_rx)
	}
}

impl<T: Transport> PubSubManager<T> {
	/// Create a manager over an injected transport. `transport_events` must
	/// be the receiving end of the channel the transport reports into.
	pub fn with_transport(config: PubSubConfig, transport: Arc<T>, transport_events: mpsc::Receiver<TransportEvent>) -> Self {
		let broadcaster = EventBroadcaster::new(EVENT_BUFFER);
		let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);

		let pool = PubSubPool::new(
			config,
			Arc::clone(&transport),
			broadcaster.clone(),
			command_tx.clone(),
			command_rx,
			transport_events,
		);
		let pool_task = tokio::spawn(pool.run());

		Self {
			handle: PubSubHandle::new(command_tx),
			transport,
			broadcaster,
			pool_task,
		}
	}

	/// Open the initial connection to the service
	pub async fn connect(&self) -> Result<(), PubSubError> {
		self.transport.connect().await?;
		Ok(())
	}

	/// Subscribe a topic set for one identity. The set is placed atomically
	/// on one connection or queued whole; it is never split.
	pub async fn subscribe(&self, topics: Vec<String>, credentials: Credentials) -> Result<(), PubSubError> {
		self.handle.subscribe(topics, credentials).await?;
		Ok(())
	}

	/// Drop every subscription whose topic starts with `prefix`
	pub async fn unsubscribe_prefix(&self, prefix: impl Into<String>) -> Result<(), PubSubError> {
		self.handle.unsubscribe_prefix(prefix).await?;
		Ok(())
	}

	pub async fn is_subscribed(&self, topic: impl Into<String>) -> Result<bool, PubSubError> {
		Ok(self.handle.is_subscribed(topic).await?)
	}

	pub async fn active_connections(&self) -> Result<usize, PubSubError> {
		Ok(self.handle.active_connections().await?)
	}

	/// Subscribe the identity's whisper topic
	pub async fn listen_to_whispers(&self, credentials: &Credentials) -> Result<(), PubSubError> {
		let topic = format!("{WHISPERS_TOPIC_PREFIX}{}", credentials.user_id);
		self.subscribe(vec![topic], credentials.clone()).await
	}

	/// Subscribe moderation actions for one channel, unless already listening
	pub async fn listen_to_channel_moderation_actions(&self, channel_id: &str, credentials: &Credentials) -> Result<(), PubSubError> {
		let topic = format!("{MODERATION_TOPIC_PREFIX}{}.{}", credentials.user_id, channel_id);
		if self.is_subscribed(topic.clone()).await? {
			debug!(%topic, "already listening to moderation topic");
			return Ok(());
		}

		self.subscribe(vec![topic], credentials.clone()).await
	}

	/// Drop every moderation-action subscription on every connection
	pub async fn unlisten_all_moderation_actions(&self) -> Result<(), PubSubError> {
		self.unsubscribe_prefix(MODERATION_TOPIC_PREFIX).await
	}

	/// New receiver of decoded domain events
	pub fn subscribe_events(&self) -> async_broadcast::Receiver<PubSubEvent> {
		self.broadcaster.subscribe()
	}

	/// Cloneable handle for talking to the pool from other tasks
	#[must_use]
	pub fn handle(&self) -> PubSubHandle {
		self.handle.clone()
	}

	/// Stop the pool actor and wait for it to finish
	pub async fn shutdown(self) {
		let _ = self.handle.shutdown().await;
		let _ = self.pool_task.await;
	}
}
