//! Per-connection protocol handler and the shared gateway core.
//!
//! Every accepted socket gets one task running [`handle_connection`]. All
//! mutable server state - room table, player index, rate limiter, outbound
//! links, timers - lives in a single [`GatewayCore`] behind one mutex, so
//! each command is handled run-to-completion: two "simultaneous" moves for
//! the same room are serialized, and the second one sees the flipped turn.
//!
//! The gateway is also the only place internal rejections become
//! client-visible `{code, message}` events. The rules engine and the room
//! manager below it return typed results; nothing down there talks to a
//! socket.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use crossway_limit::{LimitExceeded, RateLimiter};
use crossway_protocol::{
    ClientCommand, ErrorCode, PlayerId, RoomId, ServerEvent, decode_command,
    encode_event,
};
use crossway_room::{Departure, JoinOutcome, RoomError, RoomManager};
use crossway_rules::{Cell, GameSettings, GameState, MoveError, RuleToggles};
use crossway_timers::TaskKeeper;
use crossway_transport::{ConnectionId, WsConnection};

use crate::ServerConfig;
use crate::countdown;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Process-wide server state shared by every connection task.
pub(crate) struct ServerState {
    pub(crate) core: Mutex<GatewayCore>,
    pub(crate) config: ServerConfig,
}

impl ServerState {
    pub(crate) fn new(config: ServerConfig) -> Self {
        Self {
            core: Mutex::new(GatewayCore {
                rooms: RoomManager::new(config.room_limits()),
                limiter: RateLimiter::new(config.limit_config()),
                links: HashMap::new(),
                countdowns: TaskKeeper::new(),
                grace_timers: TaskKeeper::new(),
            }),
            config,
        }
    }
}

/// The outbound route to a player's *current* connection. Stamped with the
/// connection id so a superseded socket can be told apart from the live one.
pub(crate) struct Link {
    conn: ConnectionId,
    sender: mpsc::UnboundedSender<ServerEvent>,
}

/// Everything a command handler may touch, guarded by one mutex. The room
/// table and the player index can never be observed half-updated because
/// every handler locks the whole core for its full run.
pub(crate) struct GatewayCore {
    pub(crate) rooms: RoomManager,
    pub(crate) limiter: RateLimiter,
    links: HashMap<PlayerId, Link>,
    pub(crate) countdowns: TaskKeeper<RoomId>,
    pub(crate) grace_timers: TaskKeeper<PlayerId>,
}

/// Per-connection context owned by the connection task.
struct ConnSession {
    conn_id: ConnectionId,
    origin: IpAddr,
    tx: mpsc::UnboundedSender<ServerEvent>,
    /// The identity this connection is bound to after a successful join.
    player: Option<PlayerId>,
}

impl ConnSession {
    /// Queues an event for this connection only.
    fn reply(&self, event: ServerEvent) {
        let _ = self.tx.send(event);
    }
}

// ---------------------------------------------------------------------------
// Connection lifecycle
// ---------------------------------------------------------------------------

/// Handles one connection from admission to teardown.
pub(crate) async fn handle_connection(
    conn: WsConnection,
    state: Arc<ServerState>,
) {
    let origin = conn.peer().ip();

    // Connection admission is the one rejection that never gets a live
    // connection: one final error event, then the socket is refused.
    let admitted = state.core.lock().await.limiter.try_connect(origin).is_ok();
    if !admitted {
        if let Ok(frame) = encode_event(&ServerEvent::error(
            ErrorCode::RateLimitConnections,
            "too many connections from this address",
        )) {
            let _ = conn.send(&frame).await;
        }
        let _ = conn.close().await;
        return;
    }

    let conn = Arc::new(conn);
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Writer task: drains this connection's outbound queue. Handlers only
    // ever queue events, so broadcasting never blocks on a slow socket.
    let writer = {
        let conn = Arc::clone(&conn);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let frame = match encode_event(&event) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to encode event");
                        continue;
                    }
                };
                if conn.send(&frame).await.is_err() {
                    break;
                }
            }
        })
    };

    let mut session = ConnSession {
        conn_id: conn.id(),
        origin,
        tx,
        player: None,
    };
    tracing::debug!(conn_id = %session.conn_id, %origin, "connection ready");

    loop {
        let frame = match tokio::time::timeout(
            state.config.idle_timeout,
            conn.recv(),
        )
        .await
        {
            Ok(Ok(Some(frame))) => frame,
            Ok(Ok(None)) => {
                tracing::debug!(conn_id = %session.conn_id, "connection closed");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(conn_id = %session.conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(
                    conn_id = %session.conn_id,
                    "idle timeout, treating as transport drop"
                );
                break;
            }
        };

        let command = match decode_command(&frame) {
            Ok(command) => command,
            Err(e) => {
                session.reply(ServerEvent::error(
                    ErrorCode::BadCommand,
                    e.to_string(),
                ));
                continue;
            }
        };

        let mut core = state.core.lock().await;
        match command {
            ClientCommand::Join {
                room_id,
                player_id,
                password,
            } => core.handle_join(&state, &mut session, room_id, player_id, password),
            ClientCommand::Move { from, to } => {
                core.handle_move(&state, &session, from, to);
            }
            ClientCommand::Settings { settings } => {
                core.handle_settings(&session, settings);
            }
            ClientCommand::Reset => core.handle_reset(&state, &session),
            ClientCommand::Leave => core.handle_leave(&state, &mut session),
            ClientCommand::Status => core.handle_status(&session),
            ClientCommand::Ping => session.reply(ServerEvent::Pong),
        }
    }

    // Teardown: a transport drop enters the grace path; an earlier explicit
    // Leave already cleared the binding and skips it.
    writer.abort();
    let mut core = state.core.lock().await;
    core.limiter.release_connection(origin);
    if let Some(player) = session.player.take() {
        core.on_transport_drop(&state, player, session.conn_id);
    }
}

// ---------------------------------------------------------------------------
// Move resolution (shared by manual moves and the blitz auto-move)
// ---------------------------------------------------------------------------

/// What the repetition-aware move path decided.
pub(crate) enum Resolution {
    /// The move was applied (possibly with a warning increment).
    Applied(GameState),
    /// The mover's third repetition event: the game ends as their forfeit
    /// instead of the move being played.
    Forfeited(GameState),
    /// The move repeats and the block rule is on: rejected, nothing mutated.
    Blocked,
}

/// Runs the repetition verdict and applies exactly one of
/// forfeit > block > warn > plain apply.
pub(crate) fn resolve_move(
    game: &GameState,
    from: Cell,
    to: Cell,
    rules: &RuleToggles,
) -> Result<Resolution, MoveError> {
    let verdict = crossway_rules::repetition::check(game, from, to, rules);
    if verdict.should_forfeit {
        return Ok(Resolution::Forfeited(game.forfeit(game.current_player)));
    }
    if verdict.should_block {
        return Ok(Resolution::Blocked);
    }
    game.apply_move_with_warning(from, to, verdict.should_warn)
        .map(Resolution::Applied)
}

fn move_error_event(err: MoveError) -> ServerEvent {
    let code = match err {
        MoveError::GameOver => ErrorCode::GameOver,
        MoveError::NotYourPiece(_) => ErrorCode::NotYourPiece,
        MoveError::InvalidDestination(..) => ErrorCode::InvalidMove,
    };
    ServerEvent::error(code, err.to_string())
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

impl GatewayCore {
    fn handle_join(
        &mut self,
        state: &Arc<ServerState>,
        session: &mut ConnSession,
        room_id: RoomId,
        player_id: PlayerId,
        password: Option<String>,
    ) {
        // A connection bound to a different identity drops that binding
        // first, as if its transport had closed.
        if let Some(old) = session.player.clone() {
            if old != player_id {
                session.player = None;
                self.on_transport_drop(state, old, session.conn_id);
            }
        }

        // Same identity seated in a different room: that seat is vacated
        // before the new join, an explicit departure.
        let seated_elsewhere = self
            .rooms
            .player_room(&player_id)
            .is_some_and(|current| *current != room_id);
        if seated_elsewhere {
            self.vacate_and_notify(state, &player_id);
        }

        // The creation cooldown applies only when the join would create a
        // room; joining an existing room is never throttled this way.
        if self.rooms.room(&room_id).is_none() {
            if let Err(LimitExceeded::RoomCooldown(wait)) =
                self.limiter.check_room_cooldown(session.origin)
            {
                session.reply(ServerEvent::error(
                    ErrorCode::RateLimitRoomCooldown,
                    format!(
                        "room created too recently, retry in {}s",
                        wait.as_secs().max(1)
                    ),
                ));
                return;
            }
        }

        let outcome = match self.rooms.create_or_join(
            room_id.clone(),
            player_id.clone(),
            password,
        ) {
            Ok(outcome) => outcome,
            Err(RoomError::WrongPassword(_)) => {
                session.reply(ServerEvent::PasswordRequired);
                return;
            }
            Err(RoomError::RoomFull(_)) => {
                session.reply(ServerEvent::error(
                    ErrorCode::RoomFull,
                    "room is full",
                ));
                return;
            }
            Err(RoomError::MaxRooms(max)) => {
                session.reply(ServerEvent::error(
                    ErrorCode::MaxRoomsReached,
                    format!("server is at its {max}-room capacity"),
                ));
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "unexpected join failure");
                session.reply(ServerEvent::error(
                    ErrorCode::BadCommand,
                    e.to_string(),
                ));
                return;
            }
        };

        if matches!(outcome, JoinOutcome::Created { .. }) {
            self.limiter.note_room_created(session.origin);
        }

        // Bind this connection, superseding any stale link left by an
        // earlier connection of the same player. The old socket keeps
        // running but loses its room binding; the seat itself is untouched.
        session.player = Some(player_id.clone());
        self.links.insert(
            player_id.clone(),
            Link {
                conn: session.conn_id,
                sender: session.tx.clone(),
            },
        );
        self.grace_timers.cancel(&player_id);

        if let JoinOutcome::Repossessed { evicted, .. } = &outcome {
            self.grace_timers.cancel(evicted);
            self.links.remove(evicted);
        }

        let snapshot = self
            .rooms
            .snapshot(&room_id, &player_id)
            .expect("player was just seated");
        session.reply(ServerEvent::Joined { snapshot });

        let notice = match &outcome {
            JoinOutcome::Reconnected { color } => {
                ServerEvent::PlayerReconnected { color: *color }
            }
            other => ServerEvent::PlayerJoined {
                color: other.color(),
            },
        };
        self.broadcast_except(&room_id, &player_id, notice);
    }

    fn handle_move(
        &mut self,
        state: &Arc<ServerState>,
        session: &ConnSession,
        from: Cell,
        to: Cell,
    ) {
        let (room_id, _player, color) = match self.require_binding(session) {
            Ok(binding) => binding,
            Err(code) => {
                return session
                    .reply(ServerEvent::error(code, "join a room first"));
            }
        };
        if self.limiter.allow_move(session.origin).is_err() {
            return session.reply(ServerEvent::error(
                ErrorCode::RateLimitMoves,
                "move rate limit exceeded",
            ));
        }

        let (game, rules) = {
            let room = self.rooms.room(&room_id).expect("binding resolved");
            (room.game.clone(), room.settings.rules)
        };

        // Server-side re-validation, independent of anything the client
        // checked, each failure with its own code.
        if game.status.is_terminal() {
            return session.reply(ServerEvent::error(
                ErrorCode::GameOver,
                "the game is already over",
            ));
        }
        if game.current_player != color {
            return session.reply(ServerEvent::error(
                ErrorCode::NotYourTurn,
                format!("it is {}'s turn", game.current_player),
            ));
        }
        if game.piece_owner(from) != Some(color) {
            return session.reply(ServerEvent::error(
                ErrorCode::NotYourPiece,
                format!("no {color} piece on {from}"),
            ));
        }
        if !game.valid_destinations(from).contains(&to) {
            return session.reply(ServerEvent::error(
                ErrorCode::InvalidMove,
                format!("{to} is not a free cell adjacent to {from}"),
            ));
        }

        match resolve_move(&game, from, to, &rules) {
            Ok(Resolution::Blocked) => session.reply(ServerEvent::error(
                ErrorCode::MoveBlocked,
                "move repeats a position and the block rule is enabled",
            )),
            Ok(Resolution::Applied(next) | Resolution::Forfeited(next)) => {
                self.commit_and_broadcast(state, &room_id, next);
            }
            Err(e) => session.reply(move_error_event(e)),
        }
    }

    fn handle_settings(
        &mut self,
        session: &ConnSession,
        settings: GameSettings,
    ) {
        let (room_id, player, _color) = match self.require_binding(session) {
            Ok(binding) => binding,
            Err(code) => {
                return session
                    .reply(ServerEvent::error(code, "join a room first"));
            }
        };
        if self.limiter.allow_event(session.origin).is_err() {
            return session.reply(ServerEvent::error(
                ErrorCode::RateLimitEvents,
                "event rate limit exceeded",
            ));
        }

        match self.rooms.update_settings(&room_id, &player, settings) {
            Ok(()) => {
                self.broadcast(
                    &room_id,
                    ServerEvent::SettingsChanged { settings },
                );
                if !settings.blitz_enabled {
                    self.countdowns.cancel(&room_id);
                }
            }
            Err(RoomError::NotHost(_)) => session.reply(ServerEvent::error(
                ErrorCode::NotHost,
                "only the host can change settings",
            )),
            Err(_) => session.reply(ServerEvent::error(
                ErrorCode::NotInRoom,
                "room no longer exists",
            )),
        }
    }

    fn handle_reset(&mut self, state: &Arc<ServerState>, session: &ConnSession) {
        let (room_id, player, _color) = match self.require_binding(session) {
            Ok(binding) => binding,
            Err(code) => {
                return session
                    .reply(ServerEvent::error(code, "join a room first"));
            }
        };
        if self.limiter.allow_event(session.origin).is_err() {
            return session.reply(ServerEvent::error(
                ErrorCode::RateLimitEvents,
                "event rate limit exceeded",
            ));
        }

        match self.rooms.reset_game(&room_id, &player) {
            Ok(fresh) => {
                let fresh = fresh.clone();
                self.broadcast(&room_id, ServerEvent::GameReset { state: fresh });
                self.sync_countdown(state, &room_id);
            }
            Err(RoomError::NotHost(_)) => session.reply(ServerEvent::error(
                ErrorCode::NotHost,
                "only the host can reset the game",
            )),
            Err(_) => session.reply(ServerEvent::error(
                ErrorCode::NotInRoom,
                "room no longer exists",
            )),
        }
    }

    fn handle_leave(
        &mut self,
        state: &Arc<ServerState>,
        session: &mut ConnSession,
    ) {
        // No direct reply, per protocol: the effect is the broadcast to
        // whoever remains.
        let Some(player) = session.player.take() else {
            return;
        };
        if self
            .links
            .get(&player)
            .is_some_and(|link| link.conn == session.conn_id)
        {
            self.links.remove(&player);
        }
        self.grace_timers.cancel(&player);
        self.vacate_and_notify(state, &player);
    }

    fn handle_status(&mut self, session: &ConnSession) {
        if self.limiter.allow_event(session.origin).is_err() {
            return session.reply(ServerEvent::error(
                ErrorCode::RateLimitEvents,
                "event rate limit exceeded",
            ));
        }
        session.reply(ServerEvent::Status {
            rooms: self.rooms.room_count(),
            max_rooms: self.rooms.max_rooms(),
            accepting: self.rooms.accepting_rooms(),
        });
    }

    // -----------------------------------------------------------------
    // Disconnect and departure plumbing
    // -----------------------------------------------------------------

    /// Transport-level loss of a connection bound to `player`. Enters the
    /// grace path: the seat is held, the opponent notified, and a vacancy
    /// timer armed.
    fn on_transport_drop(
        &mut self,
        state: &Arc<ServerState>,
        player: PlayerId,
        conn: ConnectionId,
    ) {
        // A superseded connection no longer owns the player; its drop must
        // not disturb the live session.
        if !self
            .links
            .get(&player)
            .is_some_and(|link| link.conn == conn)
        {
            return;
        }
        self.links.remove(&player);

        let Some((room_id, color)) = self.rooms.mark_disconnected(&player)
        else {
            return;
        };
        self.broadcast(&room_id, ServerEvent::PlayerDisconnected { color });

        let grace = state.config.reconnect_grace;
        let state_for_timer = Arc::clone(state);
        let expiring = player.clone();
        self.grace_timers.spawn(player, async move {
            tokio::time::sleep(grace).await;
            let mut core = state_for_timer.core.lock().await;
            core.finalize_grace(&expiring);
        });
    }

    /// Fires when a grace timer elapses. The manager re-checks current
    /// seat state, so a reconnect or repossession that raced the timer
    /// turns this into a no-op.
    fn finalize_grace(&mut self, player: &PlayerId) {
        match self.rooms.finalize_disconnect(player) {
            Some(Departure::SeatVacated { room_id, color, .. }) => {
                self.broadcast(&room_id, ServerEvent::PlayerLeft { color });
                // One seat left: a countdown no longer applies.
                self.countdowns.cancel(&room_id);
            }
            Some(Departure::RoomDestroyed { room_id, .. }) => {
                self.countdowns.cancel(&room_id);
            }
            None => {}
        }
    }

    /// Immediate, explicit departure of `player` with broadcasts and
    /// countdown cleanup.
    fn vacate_and_notify(&mut self, state: &Arc<ServerState>, player: &PlayerId) {
        match self.rooms.leave(player) {
            Some(Departure::SeatVacated { room_id, color, .. }) => {
                self.broadcast(&room_id, ServerEvent::PlayerLeft { color });
                self.sync_countdown(state, &room_id);
            }
            Some(Departure::RoomDestroyed { room_id, .. }) => {
                self.countdowns.cancel(&room_id);
            }
            None => {}
        }
    }

    // -----------------------------------------------------------------
    // Shared helpers
    // -----------------------------------------------------------------

    /// Resolves the connection's room/color binding, rejecting superseded
    /// connections and unbound sessions alike.
    fn require_binding(
        &self,
        session: &ConnSession,
    ) -> Result<(RoomId, PlayerId, crossway_rules::Color), ErrorCode> {
        let player = session.player.as_ref().ok_or(ErrorCode::NotInRoom)?;
        let owns = self
            .links
            .get(player)
            .is_some_and(|link| link.conn == session.conn_id);
        if !owns {
            return Err(ErrorCode::NotInRoom);
        }
        let room_id = self
            .rooms
            .player_room(player)
            .ok_or(ErrorCode::NotInRoom)?
            .clone();
        let color = self
            .rooms
            .room(&room_id)
            .and_then(|room| room.color_of(player))
            .ok_or(ErrorCode::NotInRoom)?;
        Ok((room_id, player.clone(), color))
    }

    /// Commits a resolved state and broadcasts it, restarting or stopping
    /// the countdown as the new state requires.
    pub(crate) fn commit_and_broadcast(
        &mut self,
        state: &Arc<ServerState>,
        room_id: &RoomId,
        next: GameState,
    ) {
        if self.rooms.update_game(room_id, next.clone()).is_err() {
            return;
        }
        let time_left = self.sync_countdown(state, room_id);
        self.broadcast(
            room_id,
            ServerEvent::GameUpdate {
                state: next,
                time_left,
            },
        );
    }

    /// Reconciles the room's countdown with its current state: (re)starts
    /// it at the full limit when blitz applies (game playing, both seats
    /// taken, blitz on) and cancels it otherwise. Arming through the
    /// keeper guarantees at most one countdown per room.
    pub(crate) fn sync_countdown(
        &mut self,
        state: &Arc<ServerState>,
        room_id: &RoomId,
    ) -> Option<u16> {
        let restart = self
            .rooms
            .room(room_id)
            .filter(|room| {
                room.settings.blitz_enabled
                    && !room.game.status.is_terminal()
                    && room.player_count() == 2
            })
            .map(|room| room.settings.blitz_secs);

        match restart {
            Some(secs) => {
                self.countdowns.spawn(
                    room_id.clone(),
                    countdown::run(Arc::clone(state), room_id.clone(), secs),
                );
                Some(secs)
            }
            None => {
                self.countdowns.cancel(room_id);
                None
            }
        }
    }

    /// Queues `event` for every seated player with a live link.
    pub(crate) fn broadcast(&self, room_id: &RoomId, event: ServerEvent) {
        let Some(room) = self.rooms.room(room_id) else {
            return;
        };
        for seat in &room.seats {
            if let Some(link) = self.links.get(&seat.id) {
                let _ = link.sender.send(event.clone());
            }
        }
    }

    /// Queues `event` for every seated player except `skip`.
    fn broadcast_except(
        &self,
        room_id: &RoomId,
        skip: &PlayerId,
        event: ServerEvent,
    ) {
        let Some(room) = self.rooms.room(room_id) else {
            return;
        };
        for seat in &room.seats {
            if &seat.id == skip {
                continue;
            }
            if let Some(link) = self.links.get(&seat.id) {
                let _ = link.sender.send(event.clone());
            }
        }
    }
}
