//! Error types for the protocol layer.

/// Errors produced while framing or parsing wire messages.
///
/// These are transport-level failures (malformed JSON, wrong shape), not
/// game rejections - those travel as [`ServerEvent::Error`](crate::ServerEvent::Error)
/// with an [`ErrorCode`](crate::ErrorCode).
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing an outbound event failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// An inbound frame is not a valid command.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),
}
