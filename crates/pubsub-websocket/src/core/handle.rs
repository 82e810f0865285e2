use tokio::sync::{mpsc, oneshot};

use super::command::PoolCommand;
use super::error::{PoolError, Result};
use crate::credentials::Credentials;

/// Handle for communicating with the pool actor.
///
/// Cloneable and usable from any task; every call is marshalled onto the
/// pool's event loop, so callers never touch shared state directly.
#[derive(Clone, Debug)]
pub struct PubSubHandle {
	sender: mpsc::Sender<PoolCommand>,
}

impl PubSubHandle {
	pub(crate) fn new(sender: mpsc::Sender<PoolCommand>) -> Self {
		Self { sender }
	}

	/// Subscribe a topic set for one identity. Never fails for capacity
	/// reasons: a set no connection can hold is queued until one can.
	pub async fn subscribe(&self, topics: Vec<String>, credentials: Credentials) -> Result<()> {
		self
			.sender
			.send(PoolCommand::Subscribe { topics, credentials })
			.await
			.map_err(|_| PoolError::ActorUnavailable)
	}

	/// Drop every subscription whose topic starts with `prefix`
	pub async fn unsubscribe_prefix(&self, prefix: impl Into<String>) -> Result<()> {
		self
			.sender
			.send(PoolCommand::UnsubscribePrefix { prefix: prefix.into() })
			.await
			.map_err(|_| PoolError::ActorUnavailable)
	}

	/// Whether any connection currently holds this topic
	pub async fn is_subscribed(&self, topic: impl Into<String>) -> Result<bool> {
		let (reply, answer) = oneshot::channel();
		self
			.sender
			.send(PoolCommand::IsSubscribed { topic: topic.into(), reply })
			.await
			.map_err(|_| PoolError::ActorUnavailable)?;

		Ok(answer.await?)
	}

	/// Number of live connections in the pool
	pub async fn active_connections(&self) -> Result<usize> {
		let (reply, answer) = oneshot::channel();
		self
			.sender
			.send(PoolCommand::ActiveConnections { reply })
			.await
			.map_err(|_| PoolError::ActorUnavailable)?;

		Ok(answer.await?)
	}

	/// Stop the pool actor
	pub async fn shutdown(&self) -> Result<()> {
		self.sender.send(PoolCommand::Shutdown).await.map_err(|_| PoolError::ActorUnavailable)
	}
}
