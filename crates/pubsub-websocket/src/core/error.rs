use thiserror::Error;
use tokio::sync::oneshot;

/// Result type alias for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors that can occur talking to the pool actor
#[derive(Debug, Error)]
pub enum PoolError {
	/// The pool actor is no longer running
	#[error("Pool actor unavailable")]
	ActorUnavailable,

	/// The actor dropped a query reply before answering
	#[error("Failed to get reply from pool actor: {0}")]
	ReplyFailed(#[from] oneshot::error::RecvError),
}
