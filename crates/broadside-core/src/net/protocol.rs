use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::messages::{ClientMessage, MessageType, ServerMessage};

/// Default maximum inbound frame size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    EmptyMessage,
    MissingType,
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::MissingType => write!(f, "envelope has no type"),
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

#[derive(Deserialize)]
struct TypeProbe {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Read the `type` field of an envelope.
///
/// Returns `Ok(None)` for well-formed envelopes of a type the server does not
/// handle, so callers can ignore them.
pub fn decode_message_type(text: &str) -> Result<Option<MessageType>, ProtocolError> {
    if text.trim().is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    let probe: TypeProbe =
        serde_json::from_str(text).map_err(|e| ProtocolError::DeserializeError(e.to_string()))?;
    let kind = probe.kind.ok_or(ProtocolError::MissingType)?;
    Ok(MessageType::from_tag(&kind))
}

/// Decode the type-specific fields of an envelope.
pub fn decode_payload<T: DeserializeOwned>(text: &str) -> Result<T, ProtocolError> {
    serde_json::from_str(text).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

pub fn encode_server_message(msg: &ServerMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(|e| ProtocolError::SerializeError(e.to_string()))
}

pub fn decode_server_message(text: &str) -> Result<ServerMessage, ProtocolError> {
    decode_payload(text)
}

pub fn encode_client_message(msg: &ClientMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(|e| ProtocolError::SerializeError(e.to_string()))
}

pub fn decode_client_message(text: &str) -> Result<ClientMessage, ProtocolError> {
    decode_payload(text)
}
