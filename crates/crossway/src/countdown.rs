//! The per-room blitz countdown task.
//!
//! Spawned (and replaced) through the gateway's `TaskKeeper`, so at most
//! one countdown exists per room. The task re-locks the gateway core every
//! second and re-validates the room before acting - the only thing it
//! trusts from spawn time is the room id.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crossway_protocol::{RoomId, ServerEvent};

use crate::gateway::{Resolution, ServerState, resolve_move};

/// Runs one room's countdown: tick every second, auto-play at zero, and
/// restart at the full limit while the game continues with blitz on.
pub(crate) async fn run(state: Arc<ServerState>, room_id: RoomId, limit: u16) {
    let mut remaining = limit;
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let mut core = state.core.lock().await;

        // Anything may have changed since the last tick: blitz toggled
        // off, game finished, a seat vacated, the room destroyed.
        let Some((settings, game)) =
            core.rooms.room(&room_id).and_then(|room| {
                (room.settings.blitz_enabled
                    && !room.game.status.is_terminal()
                    && room.player_count() == 2)
                    .then(|| (room.settings, room.game.clone()))
            })
        else {
            return;
        };

        remaining = remaining.saturating_sub(1);
        if remaining > 0 {
            core.broadcast(
                &room_id,
                ServerEvent::CountdownTick {
                    seconds_left: remaining,
                },
            );
            continue;
        }

        // Clock hit zero: play a uniformly random legal move for the side
        // on the clock, through the same resolution path as a manual move.
        let mover = game.current_player;
        let moves = game.legal_moves(mover);
        if moves.is_empty() {
            // A mover with no legal moves means the previous application
            // already decided the game; nothing is force-played.
            return;
        }
        let (from, to) = moves[rand::rng().random_range(0..moves.len())];
        tracing::info!(
            %room_id, %mover, %from, %to,
            "blitz clock expired, auto-playing"
        );

        match resolve_move(&game, from, to, &settings.rules) {
            Ok(Resolution::Applied(next) | Resolution::Forfeited(next)) => {
                if core.rooms.update_game(&room_id, next.clone()).is_err() {
                    return;
                }
                let continues =
                    core.rooms.room(&room_id).is_some_and(|room| {
                        room.settings.blitz_enabled
                            && !room.game.status.is_terminal()
                    });
                let time_left = continues.then_some(limit);
                core.broadcast(
                    &room_id,
                    ServerEvent::GameUpdate {
                        state: next,
                        time_left,
                    },
                );
                if !continues {
                    return;
                }
                remaining = limit;
            }
            Ok(Resolution::Blocked) => {
                // The random pick repeated and the block rule is on:
                // nothing is played, the clock restarts at full.
                remaining = limit;
            }
            Err(e) => {
                tracing::error!(%room_id, error = %e, "auto-move rejected");
                return;
            }
        }
    }
}
