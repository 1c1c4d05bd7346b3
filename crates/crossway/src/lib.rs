//! # Crossway server
//!
//! The authoritative session layer for Crossway: many concurrent two-player
//! games multiplexed over WebSocket connections, with server-side move
//! re-validation, repetition policy, blitz clocks, reconnect grace windows,
//! and per-origin abuse throttling.
//!
//! Layering, leaves first:
//!
//! ```text
//! crossway-rules      pure game rules (no I/O)
//! crossway-protocol   commands, events, error codes
//! crossway-room       room/seat lifecycle, player index
//! crossway-limit      per-origin rate limiting
//! crossway-timers     cancellable keyed timer tasks
//! crossway-transport  WebSocket framing
//! crossway (this)     gateway, countdown driver, server loop
//! ```
//!
//! Start one with:
//!
//! ```rust,no_run
//! use crossway::{CrosswayServer, ServerConfig};
//!
//! # async fn start() -> Result<(), crossway::CrosswayError> {
//! let server = CrosswayServer::bind(ServerConfig::from_env()).await?;
//! server.run().await
//! # }
//! ```

mod config;
mod countdown;
mod error;
mod gateway;
mod server;

pub use config::ServerConfig;
pub use error::CrosswayError;
pub use server::CrosswayServer;
