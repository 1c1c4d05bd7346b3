//! The room manager: owns every room record and the player->room index.
//!
//! No other component mutates a room directly - the gateway reads, asks the
//! rules engine, then commits through this API. All operations are
//! synchronous and return typed results; the manager never throws for an
//! expected condition and never arms a timer (clocks belong to the caller,
//! which re-checks through [`RoomManager::finalize_disconnect`] when one
//! fires).
//!
//! # Concurrency note
//!
//! `RoomManager` is a plain single-owner structure - no interior locking.
//! The server wraps it (together with the rest of the mutable gateway
//! state) in one mutex, so the room table and the player index can never be
//! observed half-updated.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossway_protocol::{PlayerId, RoomId, RoomSnapshot};
use crossway_rules::{Color, GameSettings, GameState};

use crate::{Departure, JoinOutcome, Room, RoomError, RoomLimits, Seat};

/// Manages all active rooms.
///
/// ## Seat lifecycle
///
/// ```text
/// create_or_join() ──→ [Connected] ──(mark_disconnected)──→ [In grace]
///        ↑                  ↑                                   │
///        │                  └──────(create_or_join again)───────┤
///        │                                                      ▼
///   [Repossessed by               (finalize_disconnect / leave) │
///    a new identity] ←──── seat lapsed ←────────────────── [Vacated]
/// ```
pub struct RoomManager {
    /// Active rooms, keyed by room id.
    rooms: HashMap<RoomId, Room>,

    /// Maps each seated player to their room. A player holds at most one
    /// seat at a time; updated in the same call that touches `rooms`.
    player_rooms: HashMap<PlayerId, RoomId>,

    limits: RoomLimits,
}

impl RoomManager {
    /// Creates an empty manager with the given limits.
    pub fn new(limits: RoomLimits) -> Self {
        Self {
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
            limits,
        }
    }

    /// Joins `player_id` to `room_id`, creating the room if it does not
    /// exist.
    ///
    /// Resolution order: password gate, then reconnect (same id already
    /// seated), then repossession of a lapsed seat, then the free seat,
    /// then `RoomFull`. Creation is subject to the global cap, which is a
    /// distinct error from a full room.
    pub fn create_or_join(
        &mut self,
        room_id: RoomId,
        player_id: PlayerId,
        password: Option<String>,
    ) -> Result<JoinOutcome, RoomError> {
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return self.create_room(room_id, player_id, password);
        };

        if let Some(expected) = &room.password {
            if password.as_deref() != Some(expected.as_str()) {
                return Err(RoomError::WrongPassword(room_id));
            }
        }

        // Same identity already holds a seat: this is a reconnect, whatever
        // state the seat is in. The caller cancels any pending vacancy timer.
        if let Some(seat) = room.seat_mut(&player_id) {
            seat.connected = true;
            seat.disconnected_at = None;
            let color = seat.color;
            tracing::info!(%room_id, %player_id, %color, "player reconnected");
            return Ok(JoinOutcome::Reconnected { color });
        }

        // A seat whose grace window has fully elapsed no longer blocks its
        // color: the new identity takes it over outright.
        let grace = self.limits.reconnect_grace;
        if let Some(idx) =
            room.seats.iter().position(|s| !s.is_live(grace))
        {
            let evicted = room.seats[idx].id.clone();
            let color = room.seats[idx].color;
            room.seats[idx] = Seat::new(player_id.clone(), color);
            if room.host_id == evicted {
                room.host_id = player_id.clone();
            }
            self.player_rooms.remove(&evicted);
            self.player_rooms.insert(player_id.clone(), room_id.clone());
            tracing::info!(
                %room_id, %player_id, %evicted, %color,
                "lapsed seat repossessed"
            );
            return Ok(JoinOutcome::Repossessed { color, evicted });
        }

        if room.seats.len() >= 2 {
            return Err(RoomError::RoomFull(room_id));
        }

        let color = room
            .free_color()
            .expect("fewer than two seats leaves a free color");
        room.seats.push(Seat::new(player_id.clone(), color));
        self.player_rooms.insert(player_id.clone(), room_id.clone());
        tracing::info!(%room_id, %player_id, %color, "player joined");
        Ok(JoinOutcome::Joined { color })
    }

    fn create_room(
        &mut self,
        room_id: RoomId,
        player_id: PlayerId,
        password: Option<String>,
    ) -> Result<JoinOutcome, RoomError> {
        if self.rooms.len() >= self.limits.max_rooms {
            return Err(RoomError::MaxRooms(self.limits.max_rooms));
        }
        let room = Room::new(room_id.clone(), player_id.clone(), password);
        self.rooms.insert(room_id.clone(), room);
        self.player_rooms.insert(player_id.clone(), room_id.clone());
        tracing::info!(%room_id, %player_id, "room created");
        Ok(JoinOutcome::Created { color: Color::Blue })
    }

    /// Marks a seated player's transport as gone and timestamps the start
    /// of their grace window. Returns the room and color for the
    /// disconnect broadcast; the caller arms the vacancy timer.
    pub fn mark_disconnected(
        &mut self,
        player_id: &PlayerId,
    ) -> Option<(RoomId, Color)> {
        let room_id = self.player_rooms.get(player_id)?.clone();
        let room = self.rooms.get_mut(&room_id)?;
        let seat = room.seat_mut(player_id)?;
        seat.connected = false;
        seat.disconnected_at = Some(Instant::now());
        let color = seat.color;
        tracing::info!(
            %room_id, %player_id, %color,
            "player disconnected, grace period started"
        );
        Some((room_id, color))
    }

    /// Called when a grace timer fires. Re-checks the *current* seat state
    /// - the player may have reconnected, left, or been repossessed since
    /// the timer was armed - and vacates only if the grace window really
    /// has elapsed.
    pub fn finalize_disconnect(
        &mut self,
        player_id: &PlayerId,
    ) -> Option<Departure> {
        let room_id = self.player_rooms.get(player_id)?.clone();
        let seat_live = self
            .rooms
            .get(&room_id)?
            .seat(player_id)?
            .is_live(self.limits.reconnect_grace);
        if seat_live {
            return None;
        }
        tracing::info!(%room_id, %player_id, "grace period elapsed");
        self.vacate(room_id, player_id)
    }

    /// Explicit leave: vacates the seat immediately, no grace period.
    pub fn leave(&mut self, player_id: &PlayerId) -> Option<Departure> {
        let room_id = self.player_rooms.get(player_id)?.clone();
        tracing::info!(%room_id, %player_id, "player left");
        self.vacate(room_id, player_id)
    }

    /// Removes a seat, migrating the host role and destroying the room if
    /// it empties.
    fn vacate(
        &mut self,
        room_id: RoomId,
        player_id: &PlayerId,
    ) -> Option<Departure> {
        let room = self.rooms.get_mut(&room_id)?;
        let seat = room.remove_seat(player_id)?;
        self.player_rooms.remove(player_id);

        if room.seats.is_empty() {
            self.rooms.remove(&room_id);
            tracing::info!(%room_id, "room destroyed");
            return Some(Departure::RoomDestroyed {
                room_id,
                color: seat.color,
            });
        }

        let new_host = if room.host_id == seat.id {
            let heir = room.seats[0].id.clone();
            room.host_id = heir.clone();
            tracing::info!(%room_id, new_host = %heir, "host migrated");
            Some(heir)
        } else {
            None
        };

        Some(Departure::SeatVacated {
            room_id,
            color: seat.color,
            new_host,
        })
    }

    /// Commits a new game state. The manager trusts the caller to have
    /// validated the transition through the rules engine.
    pub fn update_game(
        &mut self,
        room_id: &RoomId,
        state: GameState,
    ) -> Result<(), RoomError> {
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        room.game = state;
        Ok(())
    }

    /// Replaces the room settings. Host only.
    pub fn update_settings(
        &mut self,
        room_id: &RoomId,
        player_id: &PlayerId,
        settings: GameSettings,
    ) -> Result<(), RoomError> {
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        if !room.is_host(player_id) {
            return Err(RoomError::NotHost(player_id.clone()));
        }
        room.settings = settings;
        tracing::info!(%room_id, %player_id, "settings updated");
        Ok(())
    }

    /// Replaces the game with a fresh initial state, preserving seats,
    /// settings, and host. Host only.
    pub fn reset_game(
        &mut self,
        room_id: &RoomId,
        player_id: &PlayerId,
    ) -> Result<&GameState, RoomError> {
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        if !room.is_host(player_id) {
            return Err(RoomError::NotHost(player_id.clone()));
        }
        room.game = GameState::new();
        tracing::info!(%room_id, %player_id, "game reset");
        Ok(&room.game)
    }

    /// Destroys rooms older than `max_age` with no connected-or-in-grace
    /// seat. Returns the destroyed ids so the caller can drop any timers
    /// still keyed on them.
    pub fn cleanup_stale(&mut self, max_age: Duration) -> Vec<RoomId> {
        let grace = self.limits.reconnect_grace;
        let stale: Vec<RoomId> = self
            .rooms
            .values()
            .filter(|r| r.age() > max_age && !r.has_live_seat(grace))
            .map(|r| r.id.clone())
            .collect();

        for room_id in &stale {
            self.rooms.remove(room_id);
            self.player_rooms.retain(|_, rid| rid != room_id);
        }
        if !stale.is_empty() {
            tracing::info!(removed = stale.len(), "stale rooms swept");
        }
        stale
    }

    /// Read access to one room.
    pub fn room(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    /// The room a player is seated in, if any.
    pub fn player_room(&self, player_id: &PlayerId) -> Option<&RoomId> {
        self.player_rooms.get(player_id)
    }

    /// Number of active rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// The configured global room cap.
    pub fn max_rooms(&self) -> usize {
        self.limits.max_rooms
    }

    /// Whether creating one more room is currently permitted.
    pub fn accepting_rooms(&self) -> bool {
        self.rooms.len() < self.limits.max_rooms
    }

    /// The room view for a seated player.
    pub fn snapshot(
        &self,
        room_id: &RoomId,
        player_id: &PlayerId,
    ) -> Option<RoomSnapshot> {
        self.rooms.get(room_id)?.snapshot_for(player_id)
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new(RoomLimits::default())
    }
}
