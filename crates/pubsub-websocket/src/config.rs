use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hard cap on topics per connection, imposed by the service
pub const DEFAULT_MAX_TOPICS_PER_CONNECTION: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubSubConfig {
	/// Websocket endpoint of the pub/sub service
	pub url: String,

	/// Capacity of one connection; a LISTEN that would exceed it is placed on
	/// another connection or queued
	pub max_topics_per_connection: usize,

	/// Period of the per-connection PING heartbeat
	pub ping_interval: Duration,

	/// How long after a PING a PONG must arrive before the connection is
	/// considered degraded
	pub pong_deadline: Duration,

	/// How long an unanswered LISTEN/UNLISTEN correlation entry is kept
	pub nonce_ttl: Duration,
}

impl Default for PubSubConfig {
	fn default() -> Self {
		Self {
			url: "wss://pubsub-edge.twitch.tv".to_string(),
			max_topics_per_connection: DEFAULT_MAX_TOPICS_PER_CONNECTION,
			ping_interval: Duration::from_secs(5 * 60),
			pong_deadline: Duration::from_secs(15),
			nonce_ttl: Duration::from_secs(5 * 60),
		}
	}
}
