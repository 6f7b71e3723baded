//! Control messages of the voice agent protocol.
//!
//! The relay never rewrites payloads; text frames are only classified for
//! logging, and the relay itself only ever authors `Error` messages.

use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    SettingsConfiguration,
    Welcome,
    SettingsApplied,
    FunctionCallRequest,
    FunctionCallResponse,
    ConversationText,
    Error,
    KeepAlive,
    Other(String),
    /// Not a JSON object with a string `type`.
    Unrecognized,
}

impl ControlMessage {
    pub fn classify(text: &str) -> Self {
        let Ok(value) = serde_json::from_str::<Value>(text) else {
            return ControlMessage::Unrecognized;
        };
        match value.get("type").and_then(Value::as_str) {
            Some("SettingsConfiguration") | Some("Settings") => ControlMessage::SettingsConfiguration,
            Some("Welcome") => ControlMessage::Welcome,
            Some("SettingsApplied") => ControlMessage::SettingsApplied,
            Some("FunctionCallRequest") | Some("FunctionCall") => {
                ControlMessage::FunctionCallRequest
            }
            Some("FunctionCallResponse") => ControlMessage::FunctionCallResponse,
            Some("ConversationText") => ControlMessage::ConversationText,
            Some("Error") => ControlMessage::Error,
            Some("KeepAlive") => ControlMessage::KeepAlive,
            Some(other) => ControlMessage::Other(other.to_string()),
            None => ControlMessage::Unrecognized,
        }
    }
}

pub const CODE_CONNECT_TIMEOUT: &str = "BACKEND_CONNECT_TIMEOUT";
pub const CODE_CONNECT_FAILED: &str = "BACKEND_CONNECT_FAILED";
pub const CODE_RELAY_ERROR: &str = "RELAY_ERROR";

/// `{"type": "Error", "description": ..., "code": ...}`
pub fn error_message(description: &str, code: &str) -> String {
    json!({
        "type": "Error",
        "description": description,
        "code": code,
    })
    .to_string()
}
