use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity material used to build LISTEN frames.
///
/// Supplied by the surrounding application per identity; this crate never
/// stores credentials beyond the listeners they are attached to.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credentials {
	pub user_id: String,
	pub auth_token: String,
}

impl Credentials {
	pub fn new(user_id: impl Into<String>, auth_token: impl Into<String>) -> Self {
		Self {
			user_id: user_id.into(),
			auth_token: auth_token.into(),
		}
	}
}

// Manual Debug: the auth token must not leak into logs
impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials").field("user_id", &self.user_id).field("auth_token", &"<redacted>").finish()
	}
}
