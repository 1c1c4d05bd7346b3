//! The room record: two seats, one game, one host.
//!
//! A `Room` is the unit of broadcast and of exclusive game-state mutation.
//! Seat membership transitions are expressed as explicit outcome values
//! ([`JoinOutcome`], [`Departure`]) rather than booleans, so the reconnect
//! and host-migration logic stays auditable at the call sites.

use std::time::{Duration, Instant};

use crossway_protocol::{PlayerId, RoomId, RoomSnapshot, SeatInfo};
use crossway_rules::{Color, GameSettings, GameState};

// ---------------------------------------------------------------------------
// Seat
// ---------------------------------------------------------------------------

/// One player's claim on a room.
///
/// `id` is the client-chosen stable identifier, not a connection id -
/// the same id presented on a new connection is the same player. The color
/// is fixed for the lifetime of the claim.
#[derive(Debug, Clone)]
pub struct Seat {
    pub id: PlayerId,
    pub color: Color,
    pub connected: bool,
    /// Set while the seat is in its reconnect grace window.
    pub disconnected_at: Option<Instant>,
}

impl Seat {
    pub(crate) fn new(id: PlayerId, color: Color) -> Self {
        Self {
            id,
            color,
            connected: true,
            disconnected_at: None,
        }
    }

    /// Whether this seat still blocks its color: connected, or within the
    /// grace window. A lapsed seat can be repossessed by a new identity.
    pub fn is_live(&self, grace: Duration) -> bool {
        if self.connected {
            return true;
        }
        match self.disconnected_at {
            Some(since) => since.elapsed() <= grace,
            None => false,
        }
    }

    fn info(&self) -> SeatInfo {
        SeatInfo {
            id: self.id.clone(),
            color: self.color,
            connected: self.connected,
        }
    }
}

// ---------------------------------------------------------------------------
// Membership transition outcomes
// ---------------------------------------------------------------------------

/// How a join request resolved. The gateway uses the variant to pick the
/// notification for the opposing seat and to cancel stale timers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// No room existed; one was created with the joiner as Blue and host.
    Created { color: Color },

    /// The joiner took the remaining free seat.
    Joined { color: Color },

    /// The joiner already held a seat here - connection restored, grace
    /// window cleared.
    Reconnected { color: Color },

    /// A seat whose grace window had fully elapsed was taken over. The
    /// evicted identity's pending vacancy timer must be cancelled by the
    /// caller.
    Repossessed { color: Color, evicted: PlayerId },
}

impl JoinOutcome {
    /// The color the joiner ended up with.
    pub fn color(&self) -> Color {
        match self {
            Self::Created { color }
            | Self::Joined { color }
            | Self::Reconnected { color }
            | Self::Repossessed { color, .. } => *color,
        }
    }
}

/// How a seat vacancy resolved - explicit leave and grace expiry both end
/// here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// The seat was vacated; the room lives on. `new_host` is set when the
    /// host role migrated to the remaining seat.
    SeatVacated {
        room_id: RoomId,
        color: Color,
        new_host: Option<PlayerId>,
    },

    /// The last seat was vacated and the room record is gone.
    RoomDestroyed { room_id: RoomId, color: Color },
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One game session: at most two seats, the authoritative game state, and
/// the host-owned settings.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub host_id: PlayerId,
    pub password: Option<String>,
    pub seats: Vec<Seat>,
    pub game: GameState,
    pub settings: GameSettings,
    pub created_at: Instant,
}

impl Room {
    /// Creates a room with the given player seated as Blue and host.
    pub(crate) fn new(
        id: RoomId,
        host: PlayerId,
        password: Option<String>,
    ) -> Self {
        Self {
            id,
            host_id: host.clone(),
            password,
            seats: vec![Seat::new(host, Color::Blue)],
            game: GameState::new(),
            settings: GameSettings::default(),
            created_at: Instant::now(),
        }
    }

    /// The seat held by `player`, if any.
    pub fn seat(&self, player: &PlayerId) -> Option<&Seat> {
        self.seats.iter().find(|s| &s.id == player)
    }

    pub(crate) fn seat_mut(&mut self, player: &PlayerId) -> Option<&mut Seat> {
        self.seats.iter_mut().find(|s| &s.id == player)
    }

    /// The seat opposing `player`, if both seats are claimed.
    pub fn opponent_of(&self, player: &PlayerId) -> Option<&Seat> {
        self.seats.iter().find(|s| &s.id != player)
    }

    /// The color assigned to `player`, if seated.
    pub fn color_of(&self, player: &PlayerId) -> Option<Color> {
        self.seat(player).map(|s| s.color)
    }

    /// Whether `player` currently holds the host role.
    pub fn is_host(&self, player: &PlayerId) -> bool {
        &self.host_id == player
    }

    /// The unclaimed color, Blue first.
    pub(crate) fn free_color(&self) -> Option<Color> {
        for color in [Color::Blue, Color::Red] {
            if !self.seats.iter().any(|s| s.color == color) {
                return Some(color);
            }
        }
        None
    }

    /// Whether any seat is connected or still inside its grace window.
    pub fn has_live_seat(&self, grace: Duration) -> bool {
        self.seats.iter().any(|s| s.is_live(grace))
    }

    /// Number of claimed seats (connected or not).
    pub fn player_count(&self) -> usize {
        self.seats.len()
    }

    /// Number of currently connected seats.
    pub fn connected_count(&self) -> usize {
        self.seats.iter().filter(|s| s.connected).count()
    }

    /// How long this room has existed.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub(crate) fn remove_seat(&mut self, player: &PlayerId) -> Option<Seat> {
        let idx = self.seats.iter().position(|s| &s.id == player)?;
        Some(self.seats.remove(idx))
    }

    /// The room view sent to `player` on join.
    pub fn snapshot_for(&self, player: &PlayerId) -> Option<RoomSnapshot> {
        let color = self.color_of(player)?;
        Some(RoomSnapshot {
            room_id: self.id.clone(),
            host_id: self.host_id.clone(),
            has_password: self.password.is_some(),
            players: self.seats.iter().map(Seat::info).collect(),
            state: self.game.clone(),
            settings: self.settings,
            your_color: color,
            is_host: self.is_host(player),
        })
    }
}
