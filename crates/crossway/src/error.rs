//! Unified error type for the server crate.

use crossway_protocol::ProtocolError;
use crossway_room::RoomError;
use crossway_transport::TransportError;

/// Top-level error wrapping the layer-specific errors.
///
/// The `#[from]` attributes let `?` convert sub-crate errors
/// automatically; `transparent` keeps the original messages.
#[derive(Debug, thiserror::Error)]
pub enum CrosswayError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A wire-format error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-layer error.
    #[error(transparent)]
    Room(#[from] RoomError),
}
