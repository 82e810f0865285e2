use serde_json::Value;
use tracing::trace;

use crate::messages::error::{MessageError, Result};
use crate::messages::extractor::JsonExtractor;
use pubsub_events::WhisperEvent;

/// Decodes the nested document of a `whispers.*` message.
///
/// The document is passed through verbatim; the messaging layer owns its
/// shape. Only the subtype is interpreted here.
pub(crate) struct WhisperMessageParser;

impl WhisperMessageParser {
	pub fn parse(document: &Value) -> Result<Option<WhisperEvent>> {
		let root = JsonExtractor::new(document, "whisper message");
		let whisper_type = root.get_string("type")?;

		match whisper_type {
			"whisper_received" => Ok(Some(WhisperEvent::Received { payload: document.clone() })),
			"whisper_sent" => Ok(Some(WhisperEvent::Sent { payload: document.clone() })),
			"thread" => {
				// Thread updates carry no renderable content yet
				trace!("ignoring whisper thread update");
				Ok(None)
			}
			other => Err(MessageError::UnknownWhisperType(other.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_whisper_received_passes_payload_through() {
		let document = json!({ "type": "whisper_received", "data": { "body": "hey" } });
		let event = WhisperMessageParser::parse(&document).unwrap();
		assert_eq!(event, Some(WhisperEvent::Received { payload: document }));
	}

	#[test]
	fn test_whisper_sent() {
		let document = json!({ "type": "whisper_sent", "data": {} });
		assert!(matches!(WhisperMessageParser::parse(&document).unwrap(), Some(WhisperEvent::Sent { .. })));
	}

	#[test]
	fn test_thread_is_ignored_without_error() {
		let document = json!({ "type": "thread", "data": {} });
		assert_eq!(WhisperMessageParser::parse(&document).unwrap(), None);
	}

	#[test]
	fn test_unknown_whisper_type_is_soft_error() {
		let document = json!({ "type": "whisper_edited" });
		let result = WhisperMessageParser::parse(&document);
		assert!(matches!(result, Err(MessageError::UnknownWhisperType(t)) if t == "whisper_edited"));
	}

	#[test]
	fn test_missing_type_is_rejected() {
		let document = json!({ "data": {} });
		assert!(matches!(
			WhisperMessageParser::parse(&document),
			Err(MessageError::MissingField { field: "type", .. })
		));
	}
}
