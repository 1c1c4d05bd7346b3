//! Server configuration, sourced from environment variables.
//!
//! Every knob has a code default; an unset variable is fine, an
//! unparsable one is logged and ignored. Parsed once at startup - the
//! running server never re-reads the environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crossway_limit::LimitConfig;
use crossway_room::RoomLimits;

/// All tunables of a Crossway server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on. `CROSSWAY_BIND`.
    pub bind_addr: String,
    /// Global cap on concurrent rooms. `CROSSWAY_MAX_ROOMS`.
    pub max_rooms: usize,
    /// Reconnect grace window after a transport drop.
    /// `CROSSWAY_RECONNECT_GRACE_SECS`.
    pub reconnect_grace: Duration,
    /// Minimum spacing between room creations per origin.
    /// `CROSSWAY_ROOM_COOLDOWN_SECS`.
    pub room_cooldown: Duration,
    /// Concurrent connection cap per origin. `CROSSWAY_MAX_CONNECTIONS`.
    pub max_connections_per_origin: u32,
    /// Accepted moves per origin per minute. `CROSSWAY_MOVES_PER_MINUTE`.
    pub max_moves_per_minute: usize,
    /// Accepted non-move commands per origin per minute.
    /// `CROSSWAY_EVENTS_PER_MINUTE`.
    pub max_events_per_minute: usize,
    /// How often housekeeping runs (stale rooms, idle limiter records).
    /// `CROSSWAY_SWEEP_INTERVAL_SECS`.
    pub sweep_interval: Duration,
    /// Age beyond which a room with no live seats is swept.
    /// `CROSSWAY_ROOM_MAX_AGE_SECS`.
    pub room_max_age: Duration,
    /// Silence after which a connection is treated as dropped.
    /// `CROSSWAY_IDLE_TIMEOUT_SECS`.
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            max_rooms: 100,
            reconnect_grace: Duration::from_secs(30),
            room_cooldown: Duration::from_secs(10),
            max_connections_per_origin: 8,
            max_moves_per_minute: 60,
            max_events_per_minute: 30,
            sweep_interval: Duration::from_secs(60),
            room_max_age: Duration::from_secs(3600),
            idle_timeout: Duration::from_secs(120),
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from `CROSSWAY_*` environment variables,
    /// falling back to defaults field by field.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env::var("CROSSWAY_BIND")
                .unwrap_or(defaults.bind_addr),
            max_rooms: env_parse("CROSSWAY_MAX_ROOMS", defaults.max_rooms),
            reconnect_grace: env_secs(
                "CROSSWAY_RECONNECT_GRACE_SECS",
                defaults.reconnect_grace,
            ),
            room_cooldown: env_secs(
                "CROSSWAY_ROOM_COOLDOWN_SECS",
                defaults.room_cooldown,
            ),
            max_connections_per_origin: env_parse(
                "CROSSWAY_MAX_CONNECTIONS",
                defaults.max_connections_per_origin,
            ),
            max_moves_per_minute: env_parse(
                "CROSSWAY_MOVES_PER_MINUTE",
                defaults.max_moves_per_minute,
            ),
            max_events_per_minute: env_parse(
                "CROSSWAY_EVENTS_PER_MINUTE",
                defaults.max_events_per_minute,
            ),
            sweep_interval: env_secs(
                "CROSSWAY_SWEEP_INTERVAL_SECS",
                defaults.sweep_interval,
            ),
            room_max_age: env_secs(
                "CROSSWAY_ROOM_MAX_AGE_SECS",
                defaults.room_max_age,
            ),
            idle_timeout: env_secs(
                "CROSSWAY_IDLE_TIMEOUT_SECS",
                defaults.idle_timeout,
            ),
        }
    }

    /// The slice of this config the room manager consumes.
    pub(crate) fn room_limits(&self) -> RoomLimits {
        RoomLimits {
            max_rooms: self.max_rooms,
            reconnect_grace: self.reconnect_grace,
        }
    }

    /// The slice of this config the rate limiter consumes.
    pub(crate) fn limit_config(&self) -> LimitConfig {
        LimitConfig {
            max_connections: self.max_connections_per_origin,
            room_cooldown: self.room_cooldown,
            max_moves_per_minute: self.max_moves_per_minute,
            max_events_per_minute: self.max_events_per_minute,
        }
    }
}

/// Parses an environment variable, keeping `default` when the variable is
/// unset or malformed (malformed values are logged, not fatal).
fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, %raw, "unparsable value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Like [`env_parse`] for whole-second durations.
fn env_secs(key: &str, default: Duration) -> Duration {
    Duration::from_secs(env_parse(key, default.as_secs()))
}
