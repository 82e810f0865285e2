use tokio::sync::oneshot;

use crate::credentials::Credentials;
use crate::transport::ConnectionId;

/// Messages that can be sent to the pool actor.
///
/// `PingTick` and `PongDeadline` are posted by heartbeat timer tasks; they
/// carry the connection key rather than any reference to the client, so a
/// timer outliving its client fires as a no-op.
#[derive(Debug)]
pub(crate) enum PoolCommand {
	Subscribe { topics: Vec<String>, credentials: Credentials },

	UnsubscribePrefix { prefix: String },

	IsSubscribed { topic: String, reply: oneshot::Sender<bool> },

	ActiveConnections { reply: oneshot::Sender<usize> },

	PingTick { connection: ConnectionId },

	PongDeadline { connection: ConnectionId },

	Shutdown,
}
