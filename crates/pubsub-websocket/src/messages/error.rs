/// Errors raised while decoding wire frames and nested documents.
///
/// Every variant is a soft failure at the dispatch layer: the offending frame
/// or event is dropped and logged, nothing propagates past the pool.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
	#[error("JSON parse error: {0}")]
	JsonParse(#[from] serde_json::Error),

	#[error("{context} is not a JSON object")]
	NotAnObject { context: &'static str },

	#[error("Missing required field `{field}` in {context}")]
	MissingField { field: &'static str, context: &'static str },

	#[error("Field `{field}` in {context} must be a {expected}")]
	InvalidFieldType {
		field: &'static str,
		context: &'static str,
		expected: &'static str,
	},

	#[error("Unknown frame type `{0}`")]
	UnknownFrameType(String),

	#[error("Unknown topic namespace `{0}`")]
	UnknownTopic(String),

	#[error("Malformed moderation topic `{0}`, expected 3 segments")]
	MalformedTopic(String),

	#[error("Unknown moderation action `{0}`")]
	UnknownAction(String),

	#[error("Unknown whisper type `{0}`")]
	UnknownWhisperType(String),

	#[error("Missing argument {index} for moderation action `{action}`")]
	MissingArg { action: &'static str, index: usize },

	#[error("Argument {index} for moderation action `{action}` must be a string")]
	InvalidArg { action: &'static str, index: usize },
}

pub type Result<T> = std::result::Result<T, MessageError>;
