//! Everything that travels on the wire between a Crossway client and the
//! server.
//!
//! Commands and events are internally tagged (`{"type": "Move", ...}`) so a
//! JavaScript client can switch on a single `type` field. Identifiers are
//! transparent newtypes: a `PlayerId` serializes as its plain string.

use std::fmt;

use serde::{Deserialize, Serialize};

use crossway_rules::{Cell, Color, GameSettings, GameState};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A client-chosen stable player identifier.
///
/// This is NOT a connection identifier: the client persists it locally and
/// presents the same value when reconnecting, which is how a dropped player
/// reclaims their seat within the grace period.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A room identifier, chosen by the creating client. Joining a room that
/// does not exist creates it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Machine-readable rejection codes, one per distinct failure so clients
/// can react appropriately. Serialized in SCREAMING_SNAKE_CASE to match the
/// wire convention for constants.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- join/capacity --
    /// Both seats are taken by connected or in-grace players.
    RoomFull,
    /// The supplied password does not match the room's.
    WrongPassword,
    /// The global room cap is reached; distinct from a full room.
    MaxRoomsReached,
    /// This origin created a room too recently.
    RateLimitRoomCooldown,
    /// This origin has too many open connections.
    RateLimitConnections,

    // -- move preconditions --
    /// The connection has no room/color binding.
    NotInRoom,
    /// The game already has a terminal status.
    GameOver,
    /// It is the other side's turn.
    NotYourTurn,
    /// The origin cell does not hold one of the sender's pieces.
    NotYourPiece,
    /// The destination is not a free adjacent cell.
    InvalidMove,
    /// The move repeats and the block rule is enabled.
    MoveBlocked,
    /// Move rate exceeded for this origin.
    RateLimitMoves,

    // -- room administration --
    /// Settings and reset are host-only.
    NotHost,
    /// Generic event rate exceeded for this origin.
    RateLimitEvents,

    // -- protocol --
    /// The frame could not be parsed as a command.
    BadCommand,
}

impl ErrorCode {
    /// The wire-format constant for this code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RoomFull => "ROOM_FULL",
            Self::WrongPassword => "WRONG_PASSWORD",
            Self::MaxRoomsReached => "MAX_ROOMS_REACHED",
            Self::RateLimitRoomCooldown => "RATE_LIMIT_ROOM_COOLDOWN",
            Self::RateLimitConnections => "RATE_LIMIT_CONNECTIONS",
            Self::NotInRoom => "NOT_IN_ROOM",
            Self::GameOver => "GAME_OVER",
            Self::NotYourTurn => "NOT_YOUR_TURN",
            Self::NotYourPiece => "NOT_YOUR_PIECE",
            Self::InvalidMove => "INVALID_MOVE",
            Self::MoveBlocked => "MOVE_BLOCKED",
            Self::RateLimitMoves => "RATE_LIMIT_MOVES",
            Self::NotHost => "NOT_HOST",
            Self::RateLimitEvents => "RATE_LIMIT_EVENTS",
            Self::BadCommand => "BAD_COMMAND",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Room snapshot
// ---------------------------------------------------------------------------

/// One seat as presented to clients. The disconnect timestamp stays
/// server-side; clients only see the flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatInfo {
    pub id: PlayerId,
    pub color: Color,
    pub connected: bool,
}

/// The full room view sent to a player on join/reconnect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub host_id: PlayerId,
    pub has_password: bool,
    pub players: Vec<SeatInfo>,
    pub state: GameState,
    pub settings: GameSettings,
    /// The color assigned to the receiving player.
    pub your_color: Color,
    /// Whether the receiving player is the host.
    pub is_host: bool,
}

// ---------------------------------------------------------------------------
// Client -> server commands
// ---------------------------------------------------------------------------

/// Everything a client can ask the server to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    /// Join `room_id` as `player_id`, creating the room if it does not
    /// exist. Re-joining with a seated `player_id` is a reconnect.
    Join {
        room_id: RoomId,
        player_id: PlayerId,
        #[serde(default)]
        password: Option<String>,
    },

    /// Move the piece on `from` to `to`.
    Move { from: Cell, to: Cell },

    /// Replace the room settings (host only).
    Settings { settings: GameSettings },

    /// Start a fresh game in the current room (host only).
    Reset,

    /// Vacate the seat immediately - no grace period.
    Leave,

    /// Ask for server capacity before attempting to create a room.
    Status,

    /// Keep-alive. Answered with [`ServerEvent::Pong`].
    Ping,
}

// ---------------------------------------------------------------------------
// Server -> client events
// ---------------------------------------------------------------------------

/// Everything the server can tell a client, solicited or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Reply to a successful join: the full room view.
    Joined { snapshot: RoomSnapshot },

    /// The opponent took the other seat.
    PlayerJoined { color: Color },

    /// The opponent came back within the grace period.
    PlayerReconnected { color: Color },

    /// The opponent's transport dropped; their seat is held for the grace
    /// period.
    PlayerDisconnected { color: Color },

    /// The opponent is gone for good (explicit leave or grace expired).
    PlayerLeft { color: Color },

    /// A move was applied; the authoritative new state. `time_left` is the
    /// restarted blitz clock, absent when blitz is off or the game ended.
    GameUpdate {
        state: GameState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_left: Option<u16>,
    },

    /// The host changed the room settings.
    SettingsChanged { settings: GameSettings },

    /// The host reset the game.
    GameReset { state: GameState },

    /// One second of blitz clock elapsed.
    CountdownTick { seconds_left: u16 },

    /// The room is password-protected and the supplied password was absent
    /// or wrong. Deliberately not a generic error so clients can prompt.
    PasswordRequired,

    /// Reply to [`ClientCommand::Status`].
    Status {
        rooms: usize,
        max_rooms: usize,
        accepting: bool,
    },

    /// Reply to [`ClientCommand::Ping`].
    Pong,

    /// A rejected action, addressed to the acting client only.
    Error { code: ErrorCode, message: String },
}

impl ServerEvent {
    /// Convenience constructor for rejections: the code's text doubles as
    /// the default human-readable message.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Wire-shape tests. The JSON layout is a contract with the client
    //! SDK; a serde attribute regression here breaks every client.

    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&PlayerId::new("ab12")).unwrap();
        assert_eq!(json, "\"ab12\"");
    }

    #[test]
    fn test_room_id_round_trip() {
        let id = RoomId::new("lobby-7");
        let json = serde_json::to_string(&id).unwrap();
        let back: RoomId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn test_error_code_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::NotYourTurn).unwrap();
        assert_eq!(json, "\"NOT_YOUR_TURN\"");
        let json =
            serde_json::to_string(&ErrorCode::RateLimitRoomCooldown).unwrap();
        assert_eq!(json, "\"RATE_LIMIT_ROOM_COOLDOWN\"");
    }

    #[test]
    fn test_error_code_as_str_matches_serde() {
        for code in [
            ErrorCode::RoomFull,
            ErrorCode::WrongPassword,
            ErrorCode::MaxRoomsReached,
            ErrorCode::NotInRoom,
            ErrorCode::GameOver,
            ErrorCode::NotYourPiece,
            ErrorCode::InvalidMove,
            ErrorCode::MoveBlocked,
            ErrorCode::RateLimitMoves,
            ErrorCode::RateLimitEvents,
            ErrorCode::RateLimitConnections,
            ErrorCode::NotHost,
            ErrorCode::BadCommand,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn test_join_command_json_format() {
        let cmd = ClientCommand::Join {
            room_id: RoomId::new("r1"),
            player_id: PlayerId::new("p1"),
            password: None,
        };
        let json: serde_json::Value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "Join");
        assert_eq!(json["room_id"], "r1");
        assert_eq!(json["player_id"], "p1");
        assert!(json["password"].is_null());
    }

    #[test]
    fn test_join_command_password_defaults_when_missing() {
        let json = r#"{"type": "Join", "room_id": "r", "player_id": "p"}"#;
        let cmd: ClientCommand = serde_json::from_str(json).unwrap();
        assert!(matches!(
            cmd,
            ClientCommand::Join { password: None, .. }
        ));
    }

    #[test]
    fn test_move_command_uses_cell_names() {
        let json = r#"{"type": "Move", "from": "L2", "to": "CL"}"#;
        let cmd: ClientCommand = serde_json::from_str(json).unwrap();
        assert_eq!(
            cmd,
            ClientCommand::Move {
                from: Cell::L2,
                to: Cell::Cl
            }
        );
    }

    #[test]
    fn test_unit_commands_round_trip() {
        for cmd in [
            ClientCommand::Reset,
            ClientCommand::Leave,
            ClientCommand::Status,
            ClientCommand::Ping,
        ] {
            let json = serde_json::to_string(&cmd).unwrap();
            let back: ClientCommand = serde_json::from_str(&json).unwrap();
            assert_eq!(cmd, back);
        }
    }

    #[test]
    fn test_game_update_omits_absent_time_left() {
        let event = ServerEvent::GameUpdate {
            state: GameState::new(),
            time_left: None,
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "GameUpdate");
        assert!(
            json.get("time_left").is_none(),
            "absent clock must not serialize as null"
        );
    }

    #[test]
    fn test_game_update_carries_time_left() {
        let event = ServerEvent::GameUpdate {
            state: GameState::new(),
            time_left: Some(30),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["time_left"], 30);
    }

    #[test]
    fn test_error_event_json_format() {
        let event =
            ServerEvent::error(ErrorCode::NotYourTurn, "it is red's turn");
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Error");
        assert_eq!(json["code"], "NOT_YOUR_TURN");
        assert_eq!(json["message"], "it is red's turn");
    }

    #[test]
    fn test_snapshot_round_trip() {
        let event = ServerEvent::Joined {
            snapshot: RoomSnapshot {
                room_id: RoomId::new("r1"),
                host_id: PlayerId::new("p1"),
                has_password: true,
                players: vec![SeatInfo {
                    id: PlayerId::new("p1"),
                    color: Color::Blue,
                    connected: true,
                }],
                state: GameState::new(),
                settings: GameSettings::default(),
                your_color: Color::Blue,
                is_host: true,
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: ServerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn test_countdown_tick_round_trip() {
        let event = ServerEvent::CountdownTick { seconds_left: 7 };
        let json = serde_json::to_string(&event).unwrap();
        let back: ServerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn test_decode_unknown_command_type_fails() {
        let json = r#"{"type": "FlyToMoon", "speed": 9000}"#;
        let result: Result<ClientCommand, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
