//! JSON framing helpers.
//!
//! Crossway speaks JSON text frames in both directions - inspectable in
//! browser devtools, trivially consumable from JavaScript. These helpers
//! are the only place (de)serialization errors are produced, so the
//! gateway deals with one [`ProtocolError`] type.

use crate::{ClientCommand, ProtocolError, ServerEvent};

/// Serializes a server event into one outbound text frame.
pub fn encode_event(event: &ServerEvent) -> Result<String, ProtocolError> {
    serde_json::to_string(event).map_err(ProtocolError::Encode)
}

/// Parses one inbound text frame into a client command.
pub fn decode_command(frame: &str) -> Result<ClientCommand, ProtocolError> {
    serde_json::from_str(frame).map_err(ProtocolError::Decode)
}
