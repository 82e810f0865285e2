use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use super::client::{ListenOutcome, PubSubClient, SentFrame};
use super::command::PoolCommand;
use crate::config::PubSubConfig;
use crate::credentials::Credentials;
use crate::messages::{InboundFrame, MessageProcessor};
use crate::transport::{ConnectionId, Transport, TransportEvent};
use pubsub_events::{ConnectivityEvent, EventBroadcaster};

/// A subscription request no connection had room for, queued verbatim
#[derive(Debug, Clone)]
pub(crate) struct PendingRequest {
	pub topics: Vec<String>,
	pub credentials: Credentials,
}

/// Correlation record for an in-flight LISTEN/UNLISTEN request
struct SentRequest {
	payload: String,
	sent_at: Instant,
}

/// The multiplexer actor.
///
/// Owns every connection client, the pending-request queue, and the nonce
/// correlation table. All state mutation happens on this task: callers reach
/// it through [`super::PubSubHandle`], transports through the event channel,
/// heartbeat timers through `ConnectionId`-keyed commands. The client table
/// is a `BTreeMap` so placement tries clients in creation order.
pub(crate) struct PubSubPool<T: Transport> {
	config: PubSubConfig,
	transport: Arc<T>,
	broadcaster: EventBroadcaster,
	processor: MessageProcessor,
	clients: BTreeMap<ConnectionId, PubSubClient<T>>,
	pending: VecDeque<PendingRequest>,
	nonces: HashMap<String, SentRequest>,
	command_tx: mpsc::Sender<PoolCommand>,
	commands: mpsc::Receiver<PoolCommand>,
	transport_events: mpsc::Receiver<TransportEvent>,
}

impl<T: Transport> PubSubPool<T> {
	pub fn new(
		config: PubSubConfig,
		transport: Arc<T>,
		broadcaster: EventBroadcaster,
		command_tx: mpsc::Sender<PoolCommand>,
		commands: mpsc::Receiver<PoolCommand>,
		transport_events: mpsc::Receiver<TransportEvent>,
	) -> Self {
		Self {
			config,
			transport,
			broadcaster,
			processor: MessageProcessor::new(),
			clients: BTreeMap::new(),
			pending: VecDeque::new(),
			nonces: HashMap::new(),
			command_tx,
			commands,
			transport_events,
		}
	}

	/// Run the actor event loop until shutdown or both channels close
	pub async fn run(mut self) {
		info!("pub/sub pool started");

		loop {
			tokio::select! {
				command = self.commands.recv() => match command {
					None | Some(PoolCommand::Shutdown) => break,
					Some(command) => self.handle_command(command).await,
				},
				event = self.transport_events.recv() => match event {
					Some(event) => self.handle_transport_event(event).await,
					None => break,
				},
			}
		}

		info!("pub/sub pool stopped");
	}

	async fn handle_command(&mut self, command: PoolCommand) {
		match command {
			PoolCommand::Subscribe { topics, credentials } => self.subscribe(topics, credentials).await,
			PoolCommand::UnsubscribePrefix { prefix } => self.unsubscribe_prefix(&prefix).await,
			PoolCommand::IsSubscribed { topic, reply } => {
				let _ = reply.send(self.is_subscribed(&topic));
			}
			PoolCommand::ActiveConnections { reply } => {
				let _ = reply.send(self.clients.len());
			}
			PoolCommand::PingTick { connection } => self.ping(connection).await,
			PoolCommand::PongDeadline { connection } => self.handle_pong_deadline(connection).await,
			PoolCommand::Shutdown => unreachable!("handled in run"),
		}
	}

	async fn handle_transport_event(&mut self, event: TransportEvent) {
		match event {
			TransportEvent::Opened(connection) => self.add_client(connection).await,
			TransportEvent::Message(connection, text) => self.on_frame(connection, &text).await,
			TransportEvent::Closed(connection) => self.remove_client(connection).await,
		}
	}

	// --- subscription placement ---

	async fn subscribe(&mut self, topics: Vec<String>, credentials: Credentials) {
		if topics.is_empty() {
			debug!("subscribe called with no topics");
			return;
		}

		let request = PendingRequest { topics, credentials };
		if let Err(request) = self.try_listen(request).await {
			debug!(topics = request.topics.len(), "no connection has capacity, queuing request");
			self.pending.push_back(request);
			self.request_connection().await;
		}
	}

	/// Place the whole topic set on the first client (in creation order) with
	/// room for all of it. Returns the request untouched when none has.
	async fn try_listen(&mut self, request: PendingRequest) -> Result<(), PendingRequest> {
		let max_topics = self.config.max_topics_per_connection;

		let mut sent = None;
		for client in self.clients.values_mut() {
			match client.listen(&request.topics, &request.credentials, max_topics).await {
				ListenOutcome::Rejected => {}
				ListenOutcome::Sent(frame) => {
					sent = Some(frame);
					break;
				}
			}
		}

		match sent {
			Some(frame) => {
				self.record_nonce(frame);
				Ok(())
			}
			None => Err(request),
		}
	}

	/// Retry every queued request once, preserving queue order for the ones
	/// that still do not fit. Each request is delivered at most once.
	async fn drain_pending(&mut self) {
		let mut still_pending = VecDeque::new();
		while let Some(request) = self.pending.pop_front() {
			if let Err(request) = self.try_listen(request).await {
				still_pending.push_back(request);
			}
		}
		self.pending = still_pending;
	}

	async fn unsubscribe_prefix(&mut self, prefix: &str) {
		let mut frames = Vec::new();
		for client in self.clients.values_mut() {
			if let Some(frame) = client.unlisten_prefix(prefix).await {
				frames.push(frame);
			}
		}
		for frame in frames {
			self.record_nonce(frame);
		}
	}

	fn is_subscribed(&self, topic: &str) -> bool {
		self.clients.values().any(|client| client.is_listening(topic))
	}

	fn record_nonce(&mut self, frame: SentFrame) {
		// Sweep expired entries on insert so the table stays bounded even if
		// the server never answers.
		let ttl = self.config.nonce_ttl;
		self.nonces.retain(|_, sent| sent.sent_at.elapsed() < ttl);
		self.nonces.insert(
			frame.nonce,
			SentRequest {
				payload: frame.payload,
				sent_at: Instant::now(),
			},
		);
	}

	// --- connection lifecycle ---

	async fn add_client(&mut self, connection: ConnectionId) {
		if self.clients.contains_key(&connection) {
			warn!(%connection, "open reported for an already-registered connection");
			return;
		}

		let mut client = PubSubClient::new(connection, Arc::clone(&self.transport));
		client.start();
		self.clients.insert(connection, client);
		info!(%connection, active = self.clients.len(), "pub/sub connection registered");

		// First heartbeat fires immediately and arms the recurring timers
		self.ping(connection).await;

		self.publish_connectivity().await;
		self.drain_pending().await;
	}

	async fn remove_client(&mut self, connection: ConnectionId) {
		let Some(mut client) = self.clients.remove(&connection) else {
			warn!(%connection, "close reported for unknown connection");
			return;
		};

		client.stop();
		let orphaned = client.into_pending();
		if !orphaned.is_empty() {
			info!(%connection, requests = orphaned.len(), "requeuing listeners from closed connection");
			self.pending.extend(orphaned);
		}

		info!(%connection, active = self.clients.len(), "pub/sub connection removed");
		self.publish_connectivity().await;

		self.drain_pending().await;
		if !self.pending.is_empty() {
			self.request_connection().await;
		}
	}

	async fn request_connection(&self) {
		if let Err(e) = self.transport.connect().await {
			warn!(error = %e, "failed to request new connection");
		}
	}

	async fn publish_connectivity(&self) {
		let _ = self
			.broadcaster
			.publish(ConnectivityEvent::ConnectionsChanged { active: self.clients.len() })
			.await;
	}

	// --- heartbeat ---

	async fn ping(&mut self, connection: ConnectionId) {
		let Some(client) = self.clients.get_mut(&connection) else {
			trace!(%connection, "ping timer fired for a gone connection");
			return;
		};
		if !client.is_started() {
			trace!(%connection, "ping timer fired for a stopped connection");
			return;
		}

		if !client.ping().await {
			// The connection is likely on its way down; the close event will
			// clean up. No timers are re-armed.
			warn!(%connection, "heartbeat ping failed to send");
			return;
		}

		self.arm_timer(connection, self.config.pong_deadline, TimerKind::PongDeadline);
		self.arm_timer(connection, self.config.ping_interval, TimerKind::PingTick);
	}

	async fn handle_pong_deadline(&mut self, connection: ConnectionId) {
		let Some(client) = self.clients.get(&connection) else {
			trace!(%connection, "pong deadline fired for a gone connection");
			return;
		};
		if !client.is_started() || !client.is_awaiting_pong() {
			return;
		}

		warn!(%connection, deadline = ?self.config.pong_deadline, "no PONG within deadline, recycling connection");
		let _ = self
			.broadcaster
			.publish(ConnectivityEvent::ConnectionDegraded { connection: connection.as_u64() })
			.await;

		// The Closed event from the transport drives removal and requeueing;
		// fall back to direct removal when the transport no longer knows the
		// connection.
		if self.transport.close(connection).await.is_err() {
			self.remove_client(connection).await;
		}
		self.request_connection().await;
	}

	fn arm_timer(&self, connection: ConnectionId, delay: Duration, kind: TimerKind) {
		let commands = self.command_tx.clone();
		tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			let command = match kind {
				TimerKind::PingTick => PoolCommand::PingTick { connection },
				TimerKind::PongDeadline => PoolCommand::PongDeadline { connection },
			};
			let _ = commands.send(command).await;
		});
	}

	// --- ingress ---

	async fn on_frame(&mut self, connection: ConnectionId, text: &str) {
		let frame = match self.processor.process(text) {
			Ok(frame) => frame,
			Err(e) => {
				warn!(%connection, error = %e, "dropping malformed frame");
				return;
			}
		};

		match frame {
			InboundFrame::Response { nonce, error } => self.handle_response(nonce, error),
			InboundFrame::Pong => self.handle_pong(connection),
			InboundFrame::Message { topic, payload } => self.handle_topic_message(&topic, &payload).await,
		}
	}

	fn handle_response(&mut self, nonce: Option<String>, error: Option<String>) {
		let Some(nonce) = nonce else {
			warn!("RESPONSE frame without a nonce");
			return;
		};
		let Some(request) = self.nonces.remove(&nonce) else {
			warn!(%nonce, "RESPONSE for unknown nonce");
			return;
		};

		match error {
			Some(error) if !error.is_empty() => {
				warn!(%nonce, %error, request = %request.payload, "listen request failed");
			}
			_ => debug!(%nonce, "listen request acknowledged"),
		}
	}

	fn handle_pong(&mut self, connection: ConnectionId) {
		match self.clients.get_mut(&connection) {
			Some(client) => client.handle_pong(),
			// Reachable when a connection closes with a PONG still in flight
			None => warn!(%connection, "PONG for unknown connection"),
		}
	}

	async fn handle_topic_message(&mut self, topic: &str, payload: &str) {
		match MessageProcessor::decode_message(topic, payload) {
			Ok(Some(event)) => {
				let _ = self.broadcaster.publish(event).await;
			}
			Ok(None) => trace!(topic, "message recognized but not surfaced"),
			Err(e) => warn!(topic, error = %e, "dropping undecodable message"),
		}
	}
}

enum TimerKind {
	PingTick,
	PongDeadline,
}
