//! Decoding of chat-view messages.

use pilot_domain::UiMessage;
use pilot_shared::{ErrorCode, ErrorEnvelope, Result};
use serde_json::Value;

/// Decode a raw chat-view message.
///
/// Unknown commands are rejected with `ui:unknown_command`; known commands
/// with a bad payload with `ui:invalid_message`.
pub fn decode_ui_message(raw: &str) -> Result<UiMessage> {
    let value: Value = serde_json::from_str(raw).map_err(|error| invalid(error.to_string()))?;
    let command = value
        .get("command")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("message has no string `command` field".to_owned()))?;
    if !UiMessage::COMMANDS.contains(&command) {
        return Err(ErrorEnvelope::expected(
            ErrorCode::new("ui", "unknown_command"),
            format!("unknown command `{command}`"),
        )
        .with_metadata("command", command.to_owned()));
    }
    serde_json::from_value(value).map_err(|error| invalid(error.to_string()))
}

fn invalid(message: String) -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::new("ui", "invalid_message"), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_commands() -> Result<()> {
        assert_eq!(
            decode_ui_message(r#"{"command":"sendMessage","text":"what does main do?"}"#)?,
            UiMessage::SendMessage {
                text: "what does main do?".to_owned()
            }
        );
        assert_eq!(
            decode_ui_message(r#"{"command":"openSettings"}"#)?,
            UiMessage::OpenSettings
        );
        Ok(())
    }

    #[test]
    fn unknown_command_is_expected_error() {
        let error = decode_ui_message(r#"{"command":"deleteEverything"}"#).err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("ui", "unknown_command"))
        );
    }

    #[test]
    fn malformed_payloads_are_invalid_messages() {
        for raw in [r#"{"command":"sendMessage"}"#, "not json", r#"{"text":"x"}"#] {
            let error = decode_ui_message(raw).err();
            assert_eq!(
                error.map(|error| error.code),
                Some(ErrorCode::new("ui", "invalid_message")),
                "{raw}"
            );
        }
    }
}
