use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use super::pool::PendingRequest;
use crate::credentials::Credentials;
use crate::messages::{listen_frame, unlisten_frame, PING_FRAME};
use crate::transport::{ConnectionId, Transport};

/// A LISTEN/UNLISTEN frame handed to the transport, identified by its nonce
#[derive(Debug, Clone)]
pub(crate) struct SentFrame {
	pub nonce: String,
	pub payload: String,
}

/// Result of asking a client to take a topic set
pub(crate) enum ListenOutcome {
	/// The set would exceed this connection's capacity; nothing changed
	Rejected,
	/// Listeners recorded and a LISTEN frame sent
	Sent(SentFrame),
}

/// One transport connection's subscription state and heartbeat flags.
///
/// Lifecycle is Created -> Started -> Stopped. The pool is the only caller;
/// every method runs on the pool's task, so check-and-mutate sequences here
/// are atomic with respect to the event loop.
///
/// Each listener keeps the credentials it was subscribed with so the pool can
/// requeue it if this connection goes away.
pub(crate) struct PubSubClient<T: Transport> {
	id: ConnectionId,
	transport: Arc<T>,
	listeners: HashMap<String, Credentials>,
	started: bool,
	awaiting_pong: bool,
}

impl<T: Transport> PubSubClient<T> {
	pub fn new(id: ConnectionId, transport: Arc<T>) -> Self {
		Self {
			id,
			transport,
			listeners: HashMap::new(),
			started: false,
			awaiting_pong: false,
		}
	}

	pub fn start(&mut self) {
		debug_assert!(!self.started, "client started twice");
		self.started = true;
	}

	pub fn stop(&mut self) {
		debug_assert!(self.started, "client stopped before start");
		self.started = false;
	}

	pub fn is_started(&self) -> bool {
		self.started
	}

	pub fn is_awaiting_pong(&self) -> bool {
		self.awaiting_pong
	}

	pub fn listener_count(&self) -> usize {
		self.listeners.len()
	}

	pub fn is_listening(&self, topic: &str) -> bool {
		self.listeners.contains_key(topic)
	}

	/// Take the whole topic set, or reject it untouched if it does not fit.
	///
	/// A send failure after admission is not rolled back: the listeners stay
	/// recorded and the transport-close path requeues them.
	pub async fn listen(&mut self, topics: &[String], credentials: &Credentials, max_topics: usize) -> ListenOutcome {
		if self.listeners.len() + topics.len() > max_topics {
			return ListenOutcome::Rejected;
		}

		for topic in topics {
			self.listeners.insert(topic.clone(), credentials.clone());
		}

		let nonce = Uuid::new_v4().to_string();
		let payload = listen_frame(&nonce, topics, &credentials.auth_token);
		debug!(connection = %self.id, topics = topics.len(), total = self.listener_count(), %nonce, "listening");
		self.send(&payload).await;

		ListenOutcome::Sent(SentFrame { nonce, payload })
	}

	/// Remove every listener whose topic starts with `prefix`. Sends one
	/// UNLISTEN frame listing the removed topics, or nothing when no listener
	/// matched.
	pub async fn unlisten_prefix(&mut self, prefix: &str) -> Option<SentFrame> {
		let removed: Vec<String> = self.listeners.keys().filter(|topic| topic.starts_with(prefix)).cloned().collect();

		if removed.is_empty() {
			return None;
		}

		for topic in &removed {
			self.listeners.remove(topic);
		}

		let nonce = Uuid::new_v4().to_string();
		let payload = unlisten_frame(&nonce, &removed);
		debug!(connection = %self.id, prefix, topics = removed.len(), %nonce, "unlistening");
		self.send(&payload).await;

		Some(SentFrame { nonce, payload })
	}

	/// Send a PING and start waiting for the PONG. Returns `false` when the
	/// frame could not be sent, in which case the heartbeat flag is untouched.
	pub async fn ping(&mut self) -> bool {
		if !self.send(PING_FRAME).await {
			return false;
		}

		self.awaiting_pong = true;
		true
	}

	pub fn handle_pong(&mut self) {
		if !self.awaiting_pong {
			// Reachable from the network, so no assertion
			warn!(connection = %self.id, "PONG received without an outstanding PING");
			return;
		}

		trace!(connection = %self.id, "pong received");
		self.awaiting_pong = false;
	}

	/// Single egress point. `false` means "frame not delivered, no state
	/// change to undo".
	pub async fn send(&self, payload: &str) -> bool {
		match self.transport.send(self.id, payload.to_string()).await {
			Ok(()) => true,
			Err(e) => {
				warn!(connection = %self.id, error = %e, "failed to send frame");
				false
			}
		}
	}

	/// Convert the remaining listeners into pending requests, one per
	/// credential set, for requeueing after this connection closed.
	pub fn into_pending(self) -> Vec<PendingRequest> {
		let mut grouped: HashMap<Credentials, Vec<String>> = HashMap::new();
		for (topic, credentials) in self.listeners {
			grouped.entry(credentials).or_default().push(topic);
		}

		grouped.into_iter().map(|(credentials, topics)| PendingRequest { topics, credentials }).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::transport::InMemoryTransport;
	use serde_json::Value;

	async fn client_with_transport() -> (PubSubClient<InMemoryTransport>, Arc<InMemoryTransport>) {
		let (transport, _events) = InMemoryTransport::with_events(16);
		let id = transport.open_connection().await;
		let transport = Arc::new(transport);
		// The receiver is dropped: these tests assert on recorded frames, not
		// on the event stream.
		let mut client = PubSubClient::new(id, Arc::clone(&transport));
		client.start();
		(client, transport)
	}

	fn topics(names: &[&str]) -> Vec<String> {
		names.iter().map(ToString::to_string).collect()
	}

	fn credentials() -> Credentials {
		Credentials::new("40286300", "oauth-token")
	}

	#[tokio::test]
	async fn test_listen_records_topics_and_sends_one_frame() {
		let (mut client, transport) = client_with_transport().await;

		let outcome = client.listen(&topics(&["whispers.9", "whispers.10"]), &credentials(), 50).await;
		assert!(matches!(outcome, ListenOutcome::Sent(_)));

		assert_eq!(client.listener_count(), 2);
		assert!(client.is_listening("whispers.9"));
		assert!(!client.is_listening("whispers.11"));

		let frames = transport.sent_frames();
		assert_eq!(frames.len(), 1);
		let frame: Value = serde_json::from_str(&frames[0].1).unwrap();
		assert_eq!(frame["type"], "LISTEN");
		assert_eq!(frame["data"]["topics"].as_array().unwrap().len(), 2);
	}

	#[tokio::test]
	async fn test_listen_over_capacity_has_no_side_effects() {
		let (mut client, transport) = client_with_transport().await;
		client.listen(&topics(&["a.1", "a.2"]), &credentials(), 3).await;

		let outcome = client.listen(&topics(&["b.1", "b.2"]), &credentials(), 3).await;
		assert!(matches!(outcome, ListenOutcome::Rejected));

		assert_eq!(client.listener_count(), 2);
		assert!(!client.is_listening("b.1"));
		assert_eq!(transport.sent_frames().len(), 1);
	}

	#[tokio::test]
	async fn test_listen_exactly_at_capacity_is_accepted() {
		let (mut client, _transport) = client_with_transport().await;

		let outcome = client.listen(&topics(&["a.1", "a.2", "a.3"]), &credentials(), 3).await;
		assert!(matches!(outcome, ListenOutcome::Sent(_)));
		assert_eq!(client.listener_count(), 3);
	}

	#[tokio::test]
	async fn test_unlisten_prefix_removes_matches_and_sends_one_frame() {
		let (mut client, transport) = client_with_transport().await;
		client
			.listen(
				&topics(&["chat_moderator_actions.1.2", "chat_moderator_actions.1.3", "whispers.9"]),
				&credentials(),
				50,
			)
			.await;

		let frame = client.unlisten_prefix("chat_moderator_actions.").await;
		assert!(frame.is_some());

		assert_eq!(client.listener_count(), 1);
		assert!(client.is_listening("whispers.9"));

		let frames = transport.sent_frames();
		assert_eq!(frames.len(), 2, "one LISTEN then one UNLISTEN");
		let unlisten: Value = serde_json::from_str(&frames[1].1).unwrap();
		assert_eq!(unlisten["type"], "UNLISTEN");
		let mut removed: Vec<&str> = unlisten["data"]["topics"].as_array().unwrap().iter().map(|t| t.as_str().unwrap()).collect();
		removed.sort_unstable();
		assert_eq!(removed, vec!["chat_moderator_actions.1.2", "chat_moderator_actions.1.3"]);
	}

	#[tokio::test]
	async fn test_unlisten_prefix_without_matches_sends_nothing() {
		let (mut client, transport) = client_with_transport().await;
		client.listen(&topics(&["whispers.9"]), &credentials(), 50).await;

		let frame = client.unlisten_prefix("chat_moderator_actions.").await;
		assert!(frame.is_none());
		assert_eq!(transport.sent_frames().len(), 1);
	}

	#[tokio::test]
	async fn test_ping_sets_awaiting_pong_and_pong_clears_it() {
		let (mut client, transport) = client_with_transport().await;

		assert!(!client.is_awaiting_pong());
		assert!(client.ping().await);
		assert!(client.is_awaiting_pong());
		assert_eq!(transport.sent_frames()[0].1, PING_FRAME);

		client.handle_pong();
		assert!(!client.is_awaiting_pong());
	}

	#[tokio::test]
	async fn test_unexpected_pong_is_ignored() {
		let (mut client, _transport) = client_with_transport().await;

		client.handle_pong();
		assert!(!client.is_awaiting_pong());
	}

	#[tokio::test]
	async fn test_into_pending_groups_by_credentials() {
		let (mut client, _transport) = client_with_transport().await;
		let first = Credentials::new("1", "token-a");
		let second = Credentials::new("2", "token-b");

		client.listen(&topics(&["whispers.1"]), &first, 50).await;
		client.listen(&topics(&["chat_moderator_actions.1.2", "chat_moderator_actions.1.3"]), &second, 50).await;

		let mut pending = client.into_pending();
		pending.sort_by(|a, b| a.credentials.user_id.cmp(&b.credentials.user_id));

		assert_eq!(pending.len(), 2);
		assert_eq!(pending[0].topics, vec!["whispers.1"]);
		assert_eq!(pending[1].topics.len(), 2);
	}
}
