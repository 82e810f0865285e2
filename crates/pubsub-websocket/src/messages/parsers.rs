mod moderation;
mod whisper;

pub(crate) use moderation::ModerationMessageParser;
pub(crate) use whisper::WhisperMessageParser;
