use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one transport connection for the lifetime of the process.
///
/// Ids are monotonic, so a `BTreeMap` keyed by `ConnectionId` iterates in
/// connection-creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
	pub fn next() -> Self {
		static COUNTER: AtomicU64 = AtomicU64::new(1);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}

	pub fn as_u64(&self) -> u64 {
		self.0
	}
}

impl fmt::Display for ConnectionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "conn-{}", self.0)
	}
}

/// What a transport reports back to the pool.
///
/// Frames on one connection are delivered in arrival order. `Closed` is
/// emitted exactly once per opened connection.
#[derive(Debug, Clone)]
pub enum TransportEvent {
	Opened(ConnectionId),
	Message(ConnectionId, String),
	Closed(ConnectionId),
}
