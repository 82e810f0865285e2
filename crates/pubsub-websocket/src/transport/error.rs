use super::types::ConnectionId;

/// Transport-agnostic error type
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
	/// No open connection with this id
	#[error("Connection {0} not found")]
	ConnectionNotFound(ConnectionId),

	/// Failed to establish a new connection
	#[error("Failed to connect: {0}")]
	ConnectFailed(String),

	/// Failed to send a frame
	#[error("Failed to send: {0}")]
	SendFailed(String),

	/// The transport event channel is closed
	#[error("Transport channel closed")]
	Closed,
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;
