use std::collections::HashSet;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use super::core::Transport;
use super::error::{Result, TransportError};
use super::types::{ConnectionId, TransportEvent};

/// In-memory transport for tests and single-process development.
///
/// Connections do not open themselves: `connect` only records the request, and
/// the test decides when (and whether) a connection appears by calling
/// [`open_connection`](Self::open_connection). Outbound frames are recorded
/// instead of sent, and inbound traffic is injected with
/// [`inject_message`](Self::inject_message).
pub struct InMemoryTransport {
	events: mpsc::Sender<TransportEvent>,
	inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
	open: HashSet<ConnectionId>,
	sent: Vec<(ConnectionId, String)>,
	connect_requests: usize,
}

impl InMemoryTransport {
	pub fn new(events: mpsc::Sender<TransportEvent>) -> Self {
		Self {
			events,
			inner: Mutex::new(Inner::default()),
		}
	}

	/// Create a transport together with the event channel the pool consumes
	pub fn with_events(buffer: usize) -> (Self, mpsc::Receiver<TransportEvent>) {
		let (tx, rx) = mpsc::channel(buffer);
		(Self::new(tx), rx)
	}

	/// Simulate the service accepting a connection
	pub async fn open_connection(&self) -> ConnectionId {
		let id = ConnectionId::next();
		self.inner.lock().expect("transport state poisoned").open.insert(id);
		let _ = self.events.send(TransportEvent::Opened(id)).await;
		id
	}

	/// Simulate the service dropping a connection
	pub async fn drop_connection(&self, connection: ConnectionId) {
		self.inner.lock().expect("transport state poisoned").open.remove(&connection);
		let _ = self.events.send(TransportEvent::Closed(connection)).await;
	}

	/// Deliver one inbound frame on a connection
	pub async fn inject_message(&self, connection: ConnectionId, payload: impl Into<String>) {
		let _ = self.events.send(TransportEvent::Message(connection, payload.into())).await;
	}

	/// Snapshot of every frame sent so far, in send order
	pub fn sent_frames(&self) -> Vec<(ConnectionId, String)> {
		self.inner.lock().expect("transport state poisoned").sent.clone()
	}

	/// How many times the pool asked for a new connection
	pub fn connect_requests(&self) -> usize {
		self.inner.lock().expect("transport state poisoned").connect_requests
	}

	pub fn is_open(&self, connection: ConnectionId) -> bool {
		self.inner.lock().expect("transport state poisoned").open.contains(&connection)
	}
}

#[async_trait::async_trait]
impl Transport for InMemoryTransport {
	async fn connect(&self) -> Result<()> {
		let mut inner = self.inner.lock().expect("transport state poisoned");
		inner.connect_requests += 1;
		debug!(requests = inner.connect_requests, "connection requested");
		Ok(())
	}

	async fn send(&self, connection: ConnectionId, payload: String) -> Result<()> {
		let mut inner = self.inner.lock().expect("transport state poisoned");
		if !inner.open.contains(&connection) {
			return Err(TransportError::ConnectionNotFound(connection));
		}
		inner.sent.push((connection, payload));
		Ok(())
	}

	async fn close(&self, connection: ConnectionId) -> Result<()> {
		let removed = self.inner.lock().expect("transport state poisoned").open.remove(&connection);
		if !removed {
			return Err(TransportError::ConnectionNotFound(connection));
		}
		let _ = self.events.send(TransportEvent::Closed(connection)).await;
		Ok(())
	}
}
