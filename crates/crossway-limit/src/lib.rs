//! Per-origin abuse throttling for Crossway.
//!
//! Tracks, per network address and independent of any room: the number of
//! open connections, the instant of the last room creation, and sliding
//! 60-second windows of move and generic-event timestamps. The gateway
//! consults this before any state mutation; a rejected action never reaches
//! the room layer.
//!
//! Records are created on first reference and removed by [`RateLimiter::prune`]
//! once an origin has returned to a fully idle baseline, so memory is
//! bounded by the set of *active* origins.
//!
//! # Concurrency note
//!
//! Like the room manager, this is a plain single-owner structure with no
//! interior locking - the server keeps it behind the same mutex as the rest
//! of the gateway state.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// The sliding window for move and event rates.
const WINDOW: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Caps enforced per origin address.
#[derive(Debug, Clone)]
pub struct LimitConfig {
    /// Maximum concurrently open connections.
    pub max_connections: u32,
    /// Minimum spacing between room *creations* (joins are unaffected).
    pub room_cooldown: Duration,
    /// Maximum accepted moves within the trailing 60 seconds.
    pub max_moves_per_minute: usize,
    /// Maximum accepted non-move commands within the trailing 60 seconds.
    pub max_events_per_minute: usize,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_connections: 8,
            room_cooldown: Duration::from_secs(10),
            max_moves_per_minute: 60,
            max_events_per_minute: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Which cap an action ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LimitExceeded {
    /// Too many open connections from this origin.
    #[error("connection limit reached for this address")]
    Connections,

    /// A room was created too recently; the payload is the remaining wait.
    #[error("room created too recently, retry in {}s", .0.as_secs())]
    RoomCooldown(Duration),

    /// The move window is full.
    #[error("move rate limit exceeded")]
    Moves,

    /// The generic event window is full.
    #[error("event rate limit exceeded")]
    Events,
}

// ---------------------------------------------------------------------------
// Per-origin record
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct OriginRecord {
    connections: u32,
    last_room_created: Option<Instant>,
    moves: VecDeque<Instant>,
    events: VecDeque<Instant>,
}

impl OriginRecord {
    /// Drops window entries older than [`WINDOW`].
    fn expire_windows(&mut self) {
        // checked_sub: Instant arithmetic must not underflow on platforms
        // with a recent time base.
        let Some(cutoff) = Instant::now().checked_sub(WINDOW) else {
            return;
        };
        while self.moves.front().is_some_and(|t| *t < cutoff) {
            self.moves.pop_front();
        }
        while self.events.front().is_some_and(|t| *t < cutoff) {
            self.events.pop_front();
        }
    }

    /// Whether this record carries no state worth keeping: no connections,
    /// empty windows, and any room-creation cooldown fully elapsed.
    fn is_idle(&self, cooldown: Duration) -> bool {
        self.connections == 0
            && self.moves.is_empty()
            && self.events.is_empty()
            && self
                .last_room_created
                .is_none_or(|t| t.elapsed() >= cooldown)
    }
}

// ---------------------------------------------------------------------------
// RateLimiter
// ---------------------------------------------------------------------------

/// Tracks all origin records and answers admission questions.
pub struct RateLimiter {
    origins: HashMap<IpAddr, OriginRecord>,
    config: LimitConfig,
}

impl RateLimiter {
    /// Creates an empty limiter with the given caps.
    pub fn new(config: LimitConfig) -> Self {
        Self {
            origins: HashMap::new(),
            config,
        }
    }

    /// Admits or rejects a new connection, counting it when admitted.
    pub fn try_connect(
        &mut self,
        origin: IpAddr,
    ) -> Result<(), LimitExceeded> {
        let record = self.origins.entry(origin).or_default();
        if record.connections >= self.config.max_connections {
            tracing::warn!(%origin, "connection limit reached");
            return Err(LimitExceeded::Connections);
        }
        record.connections += 1;
        Ok(())
    }

    /// Releases one connection slot when a socket closes.
    pub fn release_connection(&mut self, origin: IpAddr) {
        if let Some(record) = self.origins.get_mut(&origin) {
            record.connections = record.connections.saturating_sub(1);
        }
    }

    /// Whether this origin may create a *new* room right now. Joining an
    /// existing room never goes through this check.
    pub fn check_room_cooldown(
        &self,
        origin: IpAddr,
    ) -> Result<(), LimitExceeded> {
        let Some(last) = self
            .origins
            .get(&origin)
            .and_then(|r| r.last_room_created)
        else {
            return Ok(());
        };
        let elapsed = last.elapsed();
        if elapsed < self.config.room_cooldown {
            return Err(LimitExceeded::RoomCooldown(
                self.config.room_cooldown - elapsed,
            ));
        }
        Ok(())
    }

    /// Records a successful room creation, starting the cooldown.
    pub fn note_room_created(&mut self, origin: IpAddr) {
        self.origins.entry(origin).or_default().last_room_created =
            Some(Instant::now());
    }

    /// Admits or rejects a move; an admitted move timestamps itself into
    /// the window.
    pub fn allow_move(&mut self, origin: IpAddr) -> Result<(), LimitExceeded> {
        let max = self.config.max_moves_per_minute;
        let record = self.origins.entry(origin).or_default();
        record.expire_windows();
        if record.moves.len() >= max {
            tracing::warn!(%origin, "move rate limit exceeded");
            return Err(LimitExceeded::Moves);
        }
        record.moves.push_back(Instant::now());
        Ok(())
    }

    /// Admits or rejects a generic (non-move) command; an admitted one
    /// timestamps itself into the window.
    pub fn allow_event(&mut self, origin: IpAddr) -> Result<(), LimitExceeded> {
        let max = self.config.max_events_per_minute;
        let record = self.origins.entry(origin).or_default();
        record.expire_windows();
        if record.events.len() >= max {
            tracing::warn!(%origin, "event rate limit exceeded");
            return Err(LimitExceeded::Events);
        }
        record.events.push_back(Instant::now());
        Ok(())
    }

    /// Housekeeping: expires window entries and drops records for origins
    /// that are back to a fully idle baseline. Returns how many records
    /// were removed. Call on a fixed interval.
    pub fn prune(&mut self) -> usize {
        let cooldown = self.config.room_cooldown;
        let before = self.origins.len();
        self.origins.retain(|_, record| {
            record.expire_windows();
            !record.is_idle(cooldown)
        });
        let removed = before - self.origins.len();
        if removed > 0 {
            tracing::debug!(removed, "idle origin records pruned");
        }
        removed
    }

    /// Number of tracked origin records.
    pub fn origin_count(&self) -> usize {
        self.origins.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(LimitConfig::default())
    }
}

// =========================================================================
// Tests
// =========================================================================
