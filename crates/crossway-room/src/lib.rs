//! Room and seat lifecycle management for Crossway.
//!
//! One [`RoomManager`] owns every room record and the player->room index;
//! the gateway above it requests mutations and the rules engine below it
//! stays pure. Membership transitions (join, reconnect, seat repossession,
//! host migration, vacancy) are explicit outcome values, never implicit
//! side effects.
//!
//! # Key types
//!
//! - [`RoomManager`] - create/join/reconnect/leave/sweep
//! - [`Room`], [`Seat`] - the records themselves
//! - [`JoinOutcome`], [`Departure`] - named membership transitions
//! - [`RoomLimits`] - global cap and grace window
//! - [`RoomError`] - typed expected failures

mod config;
mod error;
mod manager;
mod room;

pub use config::RoomLimits;
pub use error::RoomError;
pub use manager::RoomManager;
pub use room::{Departure, JoinOutcome, Room, Seat};
