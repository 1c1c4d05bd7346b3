//! Error types for the room layer.

use crossway_protocol::{PlayerId, RoomId};

/// Expected failures of room operations. These map one-to-one onto client
/// error codes; nothing here is a programming fault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// Both seats are held by connected or in-grace players.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The room is password-protected and the supplied password is absent
    /// or wrong.
    #[error("wrong password for room {0}")]
    WrongPassword(RoomId),

    /// Creating another room would exceed the global cap.
    #[error("server room limit of {0} reached")]
    MaxRooms(usize),

    /// Settings and reset require host privilege.
    #[error("player {0} is not the host")]
    NotHost(PlayerId),

    /// No room with this id exists.
    #[error("room {0} not found")]
    NotFound(RoomId),
}
