use serde_json::Value;
use tracing::trace;

use crate::messages::error::{MessageError, Result};
use crate::messages::extractor::JsonExtractor;
use pubsub_events::{ChannelMode, ModeState, ModerationEvent, UnbanPreviousState, UserRef};

/// The fixed set of moderation actions the server pushes.
///
/// Dispatch is keyed on this enum rather than on the raw action string; each
/// variant maps to one pure decode function below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModerationAction {
	Clear,
	Slow,
	SlowOff,
	R9kBeta,
	R9kBetaOff,
	Subscribers,
	SubscribersOff,
	EmoteOnly,
	EmoteOnlyOff,
	Mod,
	Unmod,
	Ban,
	Timeout,
	Unban,
	Untimeout,
}

impl ModerationAction {
	fn from_name(name: &str) -> Option<Self> {
		match name {
			"clear" => Some(Self::Clear),
			"slow" => Some(Self::Slow),
			"slowoff" => Some(Self::SlowOff),
			"r9kbeta" => Some(Self::R9kBeta),
			"r9kbetaoff" => Some(Self::R9kBetaOff),
			"subscribers" => Some(Self::Subscribers),
			"subscribersoff" => Some(Self::SubscribersOff),
			"emoteonly" => Some(Self::EmoteOnly),
			"emoteonlyoff" => Some(Self::EmoteOnlyOff),
			"mod" => Some(Self::Mod),
			"unmod" => Some(Self::Unmod),
			"ban" => Some(Self::Ban),
			"timeout" => Some(Self::Timeout),
			"unban" => Some(Self::Unban),
			"untimeout" => Some(Self::Untimeout),
			_ => None,
		}
	}
}

/// Decodes the nested document of a `chat_moderator_actions.*` message
pub(crate) struct ModerationMessageParser;

impl ModerationMessageParser {
	pub fn parse(document: &Value, room_id: &str) -> Result<ModerationEvent> {
		let root = JsonExtractor::new(document, "moderation message");
		let data = root.get_object("data")?;
		let data_value = Value::Object(data.clone());
		let data = JsonExtractor::new(&data_value, "moderation data");

		let action_name = data.get_string("moderation_action")?;
		let action = ModerationAction::from_name(action_name).ok_or_else(|| MessageError::UnknownAction(action_name.to_string()))?;

		trace!(action = action_name, room_id, "decoding moderation action");

		let room_id = room_id.to_string();
		match action {
			ModerationAction::Clear => Ok(ModerationEvent::ChatCleared { room_id }),
			ModerationAction::Slow => Self::decode_slow_on(&data, room_id),
			ModerationAction::SlowOff => Ok(Self::mode_event(room_id, ChannelMode::Slow, ModeState::Off)),
			ModerationAction::R9kBeta => Ok(Self::mode_event(room_id, ChannelMode::R9K, ModeState::On)),
			ModerationAction::R9kBetaOff => Ok(Self::mode_event(room_id, ChannelMode::R9K, ModeState::Off)),
			ModerationAction::Subscribers => Ok(Self::mode_event(room_id, ChannelMode::SubscribersOnly, ModeState::On)),
			ModerationAction::SubscribersOff => Ok(Self::mode_event(room_id, ChannelMode::SubscribersOnly, ModeState::Off)),
			ModerationAction::EmoteOnly => Ok(Self::mode_event(room_id, ChannelMode::EmoteOnly, ModeState::On)),
			ModerationAction::EmoteOnlyOff => Ok(Self::mode_event(room_id, ChannelMode::EmoteOnly, ModeState::Off)),
			ModerationAction::Mod => Self::decode_moderation_state(&data, room_id, true),
			ModerationAction::Unmod => Self::decode_moderation_state(&data, room_id, false),
			ModerationAction::Ban => Self::decode_ban(&data, room_id),
			ModerationAction::Timeout => Self::decode_timeout(&data, room_id),
			ModerationAction::Unban => Self::decode_unban(&data, room_id, UnbanPreviousState::Banned),
			ModerationAction::Untimeout => Self::decode_unban(&data, room_id, UnbanPreviousState::TimedOut),
		}
	}

	fn mode_event(room_id: String, mode: ChannelMode, state: ModeState) -> ModerationEvent {
		ModerationEvent::ModeChanged {
			room_id,
			mode,
			state,
			duration: None,
		}
	}

	fn decode_slow_on(data: &JsonExtractor<'_>, room_id: String) -> Result<ModerationEvent> {
		let args = data.get_array("args")?;
		let duration = Self::required_arg(args, 0, "slow")?;

		Ok(ModerationEvent::ModeChanged {
			room_id,
			mode: ChannelMode::Slow,
			state: ModeState::On,
			duration: Some(Self::parse_duration(duration)),
		})
	}

	fn decode_moderation_state(data: &JsonExtractor<'_>, room_id: String, modded: bool) -> Result<ModerationEvent> {
		let args = data.get_array("args")?;
		let action = if modded { "mod" } else { "unmod" };
		let name = Self::required_arg(args, 0, action)?;

		Ok(ModerationEvent::ModerationStateChanged {
			room_id,
			target: Self::target_user(data, name),
			modded,
		})
	}

	fn decode_ban(data: &JsonExtractor<'_>, room_id: String) -> Result<ModerationEvent> {
		let args = data.get_array("args")?;
		let name = Self::required_arg(args, 0, "ban")?;
		let reason = Self::optional_arg(args, 1, "ban")?;

		Ok(ModerationEvent::UserBanned {
			room_id,
			source: Self::created_by_user(data),
			target: Self::target_user(data, name),
			duration: None,
			reason: reason.filter(|r| !r.is_empty()).map(String::from),
		})
	}

	fn decode_timeout(data: &JsonExtractor<'_>, room_id: String) -> Result<ModerationEvent> {
		let args = data.get_array("args")?;
		let name = Self::required_arg(args, 0, "timeout")?;
		let duration = Self::required_arg(args, 1, "timeout")?;
		let reason = Self::optional_arg(args, 2, "timeout")?;

		Ok(ModerationEvent::UserBanned {
			room_id,
			source: Self::created_by_user(data),
			target: Self::target_user(data, name),
			duration: Some(Self::parse_duration(duration)),
			reason: reason.filter(|r| !r.is_empty()).map(String::from),
		})
	}

	fn decode_unban(data: &JsonExtractor<'_>, room_id: String, previous_state: UnbanPreviousState) -> Result<ModerationEvent> {
		let args = data.get_array("args")?;
		let action = match previous_state {
			UnbanPreviousState::Banned => "unban",
			UnbanPreviousState::TimedOut => "untimeout",
		};
		let name = Self::required_arg(args, 0, action)?;

		Ok(ModerationEvent::UserUnbanned {
			room_id,
			source: Self::created_by_user(data),
			target: Self::target_user(data, name),
			previous_state,
		})
	}

	fn required_arg<'a>(args: &'a [Value], index: usize, action: &'static str) -> Result<&'a str> {
		let value = args.get(index).ok_or(MessageError::MissingArg { action, index })?;
		value.as_str().ok_or(MessageError::InvalidArg { action, index })
	}

	/// Present-but-wrong-type is still an error; absent is fine
	fn optional_arg<'a>(args: &'a [Value], index: usize, action: &'static str) -> Result<Option<&'a str>> {
		match args.get(index) {
			None => Ok(None),
			Some(value) => value.as_str().map(Some).ok_or(MessageError::InvalidArg { action, index }),
		}
	}

	/// Non-numeric durations decode to 0; the server has no error path for
	/// them and upstream consumers treat 0 as "unknown length".
	fn parse_duration(raw: &str) -> u64 {
		raw.parse().unwrap_or(0)
	}

	fn created_by_user(data: &JsonExtractor<'_>) -> UserRef {
		UserRef::new(
			data.optional_string("created_by").unwrap_or_default(),
			data.optional_string("created_by_user_id").unwrap_or_default(),
		)
	}

	fn target_user(data: &JsonExtractor<'_>, name: &str) -> UserRef {
		UserRef::new(name, data.optional_string("target_user_id").unwrap_or_default())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn parse(data: Value) -> Result<ModerationEvent> {
		ModerationMessageParser::parse(&json!({ "data": data }), "11148817")
	}

	#[test]
	fn test_clear_decodes_to_chat_cleared() {
		let event = parse(json!({ "moderation_action": "clear" })).unwrap();
		assert_eq!(event, ModerationEvent::ChatCleared { room_id: "11148817".to_string() });
	}

	#[test]
	fn test_slow_on_carries_duration() {
		let event = parse(json!({ "moderation_action": "slow", "args": ["120"] })).unwrap();
		assert_eq!(
			event,
			ModerationEvent::ModeChanged {
				room_id: "11148817".to_string(),
				mode: ChannelMode::Slow,
				state: ModeState::On,
				duration: Some(120),
			}
		);
	}

	#[test]
	fn test_slow_non_numeric_duration_decodes_to_zero() {
		let event = parse(json!({ "moderation_action": "slow", "args": ["soon"] })).unwrap();
		assert!(matches!(event, ModerationEvent::ModeChanged { duration: Some(0), .. }));
	}

	#[test]
	fn test_slow_without_args_fails() {
		let missing = parse(json!({ "moderation_action": "slow" }));
		assert!(matches!(missing, Err(MessageError::MissingField { field: "args", .. })));

		let empty = parse(json!({ "moderation_action": "slow", "args": [] }));
		assert!(matches!(empty, Err(MessageError::MissingArg { action: "slow", index: 0 })));
	}

	#[test]
	fn test_mode_toggles_without_args() {
		for (name, mode, state) in [
			("slowoff", ChannelMode::Slow, ModeState::Off),
			("r9kbeta", ChannelMode::R9K, ModeState::On),
			("r9kbetaoff", ChannelMode::R9K, ModeState::Off),
			("subscribers", ChannelMode::SubscribersOnly, ModeState::On),
			("subscribersoff", ChannelMode::SubscribersOnly, ModeState::Off),
			("emoteonly", ChannelMode::EmoteOnly, ModeState::On),
			("emoteonlyoff", ChannelMode::EmoteOnly, ModeState::Off),
		] {
			let event = parse(json!({ "moderation_action": name })).unwrap();
			assert_eq!(
				event,
				ModerationEvent::ModeChanged {
					room_id: "11148817".to_string(),
					mode,
					state,
					duration: None,
				},
				"action {name}"
			);
		}
	}

	#[test]
	fn test_mod_and_unmod_set_modded_flag() {
		let modded = parse(json!({
			"moderation_action": "mod",
			"args": ["newmod"],
			"target_user_id": "555",
		}))
		.unwrap();
		assert_eq!(
			modded,
			ModerationEvent::ModerationStateChanged {
				room_id: "11148817".to_string(),
				target: UserRef::new("newmod", "555"),
				modded: true,
			}
		);

		let unmodded = parse(json!({ "moderation_action": "unmod", "args": ["oldmod"] })).unwrap();
		assert!(matches!(unmodded, ModerationEvent::ModerationStateChanged { modded: false, .. }));
	}

	#[test]
	fn test_timeout_decodes_target_duration_and_reason() {
		let event = parse(json!({
			"moderation_action": "timeout",
			"created_by": "somemod",
			"created_by_user_id": "40286300",
			"target_user_id": "70948394",
			"args": ["baduser", "600", "spam"],
		}))
		.unwrap();

		assert_eq!(
			event,
			ModerationEvent::UserBanned {
				room_id: "11148817".to_string(),
				source: UserRef::new("somemod", "40286300"),
				target: UserRef::new("baduser", "70948394"),
				duration: Some(600),
				reason: Some("spam".to_string()),
			}
		);
	}

	#[test]
	fn test_timeout_reason_is_optional() {
		let event = parse(json!({ "moderation_action": "timeout", "args": ["baduser", "600"] })).unwrap();
		assert!(matches!(event, ModerationEvent::UserBanned { duration: Some(600), reason: None, .. }));
	}

	#[test]
	fn test_ban_with_empty_args_yields_no_event() {
		let result = parse(json!({ "moderation_action": "ban", "args": [] }));
		assert!(matches!(result, Err(MessageError::MissingArg { action: "ban", index: 0 })));
	}

	#[test]
	fn test_ban_has_no_duration() {
		let event = parse(json!({ "moderation_action": "ban", "args": ["baduser", "spam"] })).unwrap();
		assert!(matches!(
			event,
			ModerationEvent::UserBanned {
				duration: None,
				reason: Some(ref r),
				..
			} if r == "spam"
		));
	}

	#[test]
	fn test_unban_and_untimeout_previous_state() {
		let unban = parse(json!({ "moderation_action": "unban", "args": ["baduser"] })).unwrap();
		assert!(matches!(
			unban,
			ModerationEvent::UserUnbanned {
				previous_state: UnbanPreviousState::Banned,
				..
			}
		));

		let untimeout = parse(json!({ "moderation_action": "untimeout", "args": ["baduser"] })).unwrap();
		assert!(matches!(
			untimeout,
			ModerationEvent::UserUnbanned {
				previous_state: UnbanPreviousState::TimedOut,
				..
			}
		));
	}

	#[test]
	fn test_unknown_action_yields_no_event() {
		let result = parse(json!({ "moderation_action": "unknown_xyz" }));
		assert!(matches!(result, Err(MessageError::UnknownAction(a)) if a == "unknown_xyz"));
	}

	#[test]
	fn test_non_string_arg_is_rejected() {
		let result = parse(json!({ "moderation_action": "ban", "args": [42] }));
		assert!(matches!(result, Err(MessageError::InvalidArg { action: "ban", index: 0 })));
	}

	#[test]
	fn test_args_must_be_an_array() {
		let result = parse(json!({ "moderation_action": "ban", "args": "baduser" }));
		assert!(matches!(result, Err(MessageError::InvalidFieldType { field: "args", .. })));
	}
}
