use super::error::Result;
use super::types::ConnectionId;

/// Secure, full-duplex, message-oriented socket abstraction.
///
/// Implementations push [`super::TransportEvent`]s into the channel they were
/// constructed with; the pool consumes that channel. All methods are
/// non-blocking from the caller's point of view: `connect` reports completion
/// through an `Opened` event, `close` through a `Closed` event.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
	/// Open one new connection to the service.
	async fn connect(&self) -> Result<()>;

	/// Send one text frame on an open connection.
	async fn send(&self, connection: ConnectionId, payload: String) -> Result<()>;

	/// Close an open connection.
	async fn close(&self, connection: ConnectionId) -> Result<()>;
}
