//! Wire protocol for Crossway.
//!
//! Defines the "language" clients and the server speak: identifier
//! newtypes, the [`ClientCommand`] / [`ServerEvent`] vocabulary, the
//! machine-readable [`ErrorCode`]s, and the JSON framing helpers.
//!
//! The protocol layer knows nothing about connections, rooms, or timers -
//! it only describes messages. Layering:
//!
//! ```text
//! transport (frames) -> protocol (commands/events) -> gateway (behavior)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{decode_command, encode_event};
pub use error::ProtocolError;
pub use types::{
    ClientCommand, ErrorCode, PlayerId, RoomId, RoomSnapshot, SeatInfo,
    ServerEvent,
};
