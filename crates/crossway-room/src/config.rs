//! Capacity and timing limits for the room layer.

use std::time::Duration;

/// Limits the [`RoomManager`](crate::RoomManager) enforces.
#[derive(Debug, Clone)]
pub struct RoomLimits {
    /// Global cap on concurrently existing rooms. Hitting it rejects room
    /// *creation* with a code distinct from a single room being full.
    pub max_rooms: usize,

    /// How long a disconnected seat is held before it may be repossessed
    /// by a new identity. The gateway arms the matching vacancy timer;
    /// the manager re-checks this duration whenever it decides whether a
    /// seat is still claimed.
    pub reconnect_grace: Duration,
}

impl Default for RoomLimits {
    fn default() -> Self {
        Self {
            max_rooms: 100,
            reconnect_grace: Duration::from_secs(30),
        }
    }
}
