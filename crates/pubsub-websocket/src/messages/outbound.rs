use serde_json::json;

/// PING carries no nonce and no data
pub(crate) const PING_FRAME: &str = "{\"type\":\"PING\"}";

pub(crate) fn listen_frame(nonce: &str, topics: &[String], auth_token: &str) -> String {
	json!({
		"type": "LISTEN",
		"nonce": nonce,
		"data": {
			"topics": topics,
			"auth_token": auth_token,
		}
	})
	.to_string()
}

pub(crate) fn unlisten_frame(nonce: &str, topics: &[String]) -> String {
	json!({
		"type": "UNLISTEN",
		"nonce": nonce,
		"data": {
			"topics": topics,
		}
	})
	.to_string()
}
