//! Pure rules engine for Crossway, a two-player race across an 11-cell
//! board.
//!
//! Everything in this crate is a pure function over immutable values: no
//! I/O, no timers, no globals. The server re-validates every client move
//! through these functions, and AI opponents consume [`GameState::legal_moves`]
//! and [`GameState::win_status`] as their move-generation and evaluation
//! primitives.
//!
//! # Key types
//!
//! - [`Cell`], [`Color`] - the static board graph and the two sides
//! - [`GameState`] - one game in progress; all transitions return new values
//! - [`MoveError`] - typed rejection, so a no-op can never pass for success
//! - [`repetition`] - bounce and repeated-configuration detection
//! - [`GameSettings`] - per-room policy toggles and the blitz clock

mod board;
pub mod repetition;
mod settings;
mod state;

pub use board::{ALL_CELLS, BLUE_HOME, Cell, Color, HUB, RED_HOME};
pub use settings::{GameSettings, RuleToggles};
pub use state::{GameState, GameStatus, Move, MoveError, Warnings};
