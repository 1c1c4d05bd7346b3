//! The server: accept loop and periodic housekeeping.

use std::sync::Arc;
use std::time::Duration;

use crossway_transport::WsListener;

use crate::CrosswayError;
use crate::config::ServerConfig;
use crate::gateway::{ServerState, handle_connection};

/// A bound Crossway server. Call [`run`](Self::run) to start serving.
pub struct CrosswayServer {
    listener: WsListener,
    state: Arc<ServerState>,
}

impl CrosswayServer {
    /// Binds the listener and initializes empty server state.
    pub async fn bind(config: ServerConfig) -> Result<Self, CrosswayError> {
        let listener = WsListener::bind(&config.bind_addr).await?;
        let state = Arc::new(ServerState::new(config));
        Ok(Self { listener, state })
    }

    /// The locally bound address (useful with port 0 in tests).
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop until the process terminates.
    ///
    /// Each accepted connection gets its own handler task; a parallel
    /// housekeeping task sweeps stale rooms and idle limiter records.
    pub async fn run(self) -> Result<(), CrosswayError> {
        tracing::info!("crossway server running");

        tokio::spawn(housekeeping(
            Arc::clone(&self.state),
            self.state.config.sweep_interval,
        ));

        loop {
            match self.listener.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(handle_connection(conn, state));
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Periodic sweep: stale rooms out, idle origin records out, finished
/// timer entries out.
async fn housekeeping(state: Arc<ServerState>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.tick().await; // the first tick fires immediately; skip it
    loop {
        interval.tick().await;
        let mut core = state.core.lock().await;
        let removed = core.rooms.cleanup_stale(state.config.room_max_age);
        for room_id in &removed {
            core.countdowns.cancel(room_id);
        }
        core.limiter.prune();
        core.countdowns.reap();
        core.grace_timers.reap();
    }
}
