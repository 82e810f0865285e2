use serde_json::Value;
use std::collections::HashMap;
use tracing::trace;

use super::error::{MessageError, Result};
use super::extractor::JsonExtractor;
use super::parsers::{ModerationMessageParser, WhisperMessageParser};
use super::{MODERATION_TOPIC_PREFIX, WHISPERS_TOPIC_PREFIX};
use pubsub_events::PubSubEvent;

/// A decoded top-level frame envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
	/// Acknowledgement of a LISTEN/UNLISTEN request. `error` is empty or
	/// absent on success.
	Response { nonce: Option<String>, error: Option<String> },

	/// A server-pushed message on a subscribed topic. `payload` is the nested
	/// JSON document, still encoded.
	Message { topic: String, payload: String },

	/// Heartbeat reply for the connection the frame arrived on
	Pong,
}

/// Parses top-level envelopes and keeps per-frame-type counters
pub struct MessageProcessor {
	frame_stats: HashMap<String, u64>,
}

impl MessageProcessor {
	#[must_use]
	pub fn new() -> Self {
		Self { frame_stats: HashMap::new() }
	}

	/// Decode one envelope. Any error here means the frame is dropped by the
	/// caller; no partial state is produced.
	pub fn process(&mut self, text: &str) -> Result<InboundFrame> {
		let json: Value = serde_json::from_str(text)?;

		if !json.is_object() {
			return Err(MessageError::NotAnObject { context: "frame root" });
		}

		let root = JsonExtractor::new(&json, "frame root");
		let frame_type = root.get_string("type")?;
		self.update_frame_stats(frame_type);

		match frame_type {
			"RESPONSE" => Ok(InboundFrame::Response {
				nonce: root.optional_string("nonce").map(String::from),
				error: root.optional_string("error").map(String::from),
			}),
			"MESSAGE" => {
				let data = root.get_object("data")?;
				let data_value = Value::Object(data.clone());
				let data = JsonExtractor::new(&data_value, "MESSAGE data");

				Ok(InboundFrame::Message {
					topic: data.get_string("topic")?.to_string(),
					payload: data.get_string("message")?.to_string(),
				})
			}
			"PONG" => Ok(InboundFrame::Pong),
			other => Err(MessageError::UnknownFrameType(other.to_string())),
		}
	}

	/// Decode the nested document of a MESSAGE frame by topic namespace.
	///
	/// `Ok(None)` means the message was recognized but intentionally ignored
	/// (whisper threads).
	pub fn decode_message(topic: &str, payload: &str) -> Result<Option<PubSubEvent>> {
		let document: Value = serde_json::from_str(payload)?;

		if topic.starts_with(WHISPERS_TOPIC_PREFIX) {
			Ok(WhisperMessageParser::parse(&document)?.map(PubSubEvent::Whisper))
		} else if topic.starts_with(MODERATION_TOPIC_PREFIX) {
			let segments: Vec<&str> = topic.split('.').collect();
			if segments.len() != 3 {
				return Err(MessageError::MalformedTopic(topic.to_string()));
			}

			// chat_moderator_actions.<modID>.<channelID>: the channel is the room
			let room_id = segments[2];
			Ok(Some(PubSubEvent::Moderation(ModerationMessageParser::parse(&document, room_id)?)))
		} else {
			Err(MessageError::UnknownTopic(topic.to_string()))
		}
	}

	fn update_frame_stats(&mut self, frame_type: &str) {
		*self.frame_stats.entry(frame_type.to_string()).or_insert(0) += 1;
		trace!(stats = ?self.frame_stats, "frame stats updated");
	}

	pub fn frame_stats(&self) -> &HashMap<String, u64> {
		&self.frame_stats
	}
}

impl Default for MessageProcessor {
	fn default() -> Self {
		Self::new()
	}
}
