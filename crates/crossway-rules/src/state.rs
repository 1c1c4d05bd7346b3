//! Game state and move application.
//!
//! `GameState` is a value: every operation that changes the game returns a
//! new state and leaves the input untouched. Rejected moves are signalled
//! with a typed [`MoveError`] rather than a mutated-or-not state, so callers
//! cannot mistake a no-op for success.

use serde::{Deserialize, Serialize};

use crate::board::{BLUE_HOME, Cell, Color, RED_HOME};

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

/// One recorded move. Append-only once pushed into the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub from: Cell,
    pub to: Cell,
    pub player: Color,
}

impl Move {
    /// Whether `other` is this move played backwards by the same side.
    pub fn is_inverse_of(&self, other: &Move) -> bool {
        self.player == other.player
            && self.from == other.to
            && self.to == other.from
    }
}

// ---------------------------------------------------------------------------
// GameStatus
// ---------------------------------------------------------------------------

/// Outcome of a game. Terminal once not `Playing` - no further moves are
/// accepted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    #[default]
    Playing,
    BlueWins,
    RedWins,
    /// Blue forfeited; Red wins.
    BlueForfeit,
    /// Red forfeited; Blue wins.
    RedForfeit,
}

impl GameStatus {
    /// Whether the game has ended.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Playing)
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Per-player repetition warning counters. Monotone while the game is
/// playing; reset only by a full game reset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
pub struct Warnings {
    pub blue: u8,
    pub red: u8,
}

impl Warnings {
    pub fn get(&self, color: Color) -> u8 {
        match color {
            Color::Blue => self.blue,
            Color::Red => self.red,
        }
    }

    fn bump(&mut self, color: Color) {
        match color {
            Color::Blue => self.blue += 1,
            Color::Red => self.red += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// MoveError
// ---------------------------------------------------------------------------

/// Why a candidate move was rejected. The input state is never modified on
/// rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    /// The game already has a terminal status.
    #[error("the game is already over")]
    GameOver,

    /// `from` does not hold a piece of the side to move.
    #[error("no piece of the moving side on {0}")]
    NotYourPiece(Cell),

    /// `to` is not an unoccupied neighbor of `from`.
    #[error("{1} is not a free cell adjacent to {0}")]
    InvalidDestination(Cell, Cell),
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// The complete state of one game in progress.
///
/// Invariant: `blue_pieces` and `red_pieces` together hold 6 distinct cells -
/// no cell ever carries two pieces, regardless of owner. `move_history` and
/// `board_history` only grow, one entry each per applied move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub current_player: Color,
    pub blue_pieces: [Cell; 3],
    pub red_pieces: [Cell; 3],
    pub status: GameStatus,
    pub move_history: Vec<Move>,
    pub board_history: Vec<String>,
    pub warnings: Warnings,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// A fresh game: both sides at home, Blue to move, empty histories.
    pub fn new() -> Self {
        Self {
            current_player: Color::Blue,
            blue_pieces: BLUE_HOME,
            red_pieces: RED_HOME,
            status: GameStatus::Playing,
            move_history: Vec::new(),
            board_history: Vec::new(),
            warnings: Warnings::default(),
        }
    }

    /// The pieces of one side.
    pub fn pieces(&self, color: Color) -> &[Cell; 3] {
        match color {
            Color::Blue => &self.blue_pieces,
            Color::Red => &self.red_pieces,
        }
    }

    /// Which side owns the piece on `cell`, if any.
    pub fn piece_owner(&self, cell: Cell) -> Option<Color> {
        if self.blue_pieces.contains(&cell) {
            Some(Color::Blue)
        } else if self.red_pieces.contains(&cell) {
            Some(Color::Red)
        } else {
            None
        }
    }

    /// Whether any piece - own or enemy - sits on `cell`.
    pub fn is_occupied(&self, cell: Cell) -> bool {
        self.piece_owner(cell).is_some()
    }

    /// The unoccupied neighbors of `from`. There is no capturing and no
    /// jumping, so an occupied cell is never a destination.
    pub fn valid_destinations(&self, from: Cell) -> Vec<Cell> {
        from.neighbors()
            .iter()
            .copied()
            .filter(|&to| !self.is_occupied(to))
            .collect()
    }

    /// Whether the given side has at least one legal move.
    pub fn can_move(&self, color: Color) -> bool {
        self.pieces(color)
            .iter()
            .any(|&from| !self.valid_destinations(from).is_empty())
    }

    /// Every legal `(from, to)` pair for the given side. This is the
    /// move-generation primitive consumed by AI opponents.
    pub fn legal_moves(&self, color: Color) -> Vec<(Cell, Cell)> {
        let mut moves = Vec::new();
        for &from in self.pieces(color) {
            for to in self.valid_destinations(from) {
                moves.push((from, to));
            }
        }
        moves
    }

    /// Evaluates the win conditions in fixed priority order: completion
    /// (all pieces in the opposing home) beats stalemate, and stalemate is
    /// a loss for the side to move, not a draw.
    pub fn win_status(&self) -> GameStatus {
        if cells_match(&self.blue_pieces, &RED_HOME) {
            return GameStatus::BlueWins;
        }
        if cells_match(&self.red_pieces, &BLUE_HOME) {
            return GameStatus::RedWins;
        }
        if !self.can_move(self.current_player) {
            return match self.current_player {
                Color::Blue => GameStatus::RedWins,
                Color::Red => GameStatus::BlueWins,
            };
        }
        GameStatus::Playing
    }

    /// Canonical snapshot of the board configuration plus side to move:
    /// `"{current_player}:{sorted blue}|{sorted red}"`.
    ///
    /// Positions are sorted, so two states with the same occupancy and the
    /// same side to move serialize identically no matter which piece is
    /// which or how the position was reached.
    pub fn board_key(&self) -> String {
        format!(
            "{}:{}|{}",
            self.current_player,
            sorted_names(&self.blue_pieces),
            sorted_names(&self.red_pieces),
        )
    }

    /// Applies a move for the side to move.
    ///
    /// On success the returned state has the piece relocated, the move and
    /// the new board snapshot appended, the turn flipped, and the status
    /// re-evaluated. On rejection the input state is untouched.
    pub fn apply_move(
        &self,
        from: Cell,
        to: Cell,
    ) -> Result<GameState, MoveError> {
        if self.status.is_terminal() {
            return Err(MoveError::GameOver);
        }
        let mover = self.current_player;
        if self.piece_owner(from) != Some(mover) {
            return Err(MoveError::NotYourPiece(from));
        }
        if !self.valid_destinations(from).contains(&to) {
            return Err(MoveError::InvalidDestination(from, to));
        }

        let mut next = self.clone();
        let pieces = match mover {
            Color::Blue => &mut next.blue_pieces,
            Color::Red => &mut next.red_pieces,
        };
        let slot = pieces
            .iter()
            .position(|&c| c == from)
            .expect("ownership validated above");
        pieces[slot] = to;

        next.move_history.push(Move { from, to, player: mover });
        next.current_player = mover.opponent();
        let key = next.board_key();
        next.board_history.push(key);
        next.status = next.win_status();
        Ok(next)
    }

    /// Applies a move and, if `increment` is set, bumps the *mover's*
    /// warning counter in the resulting state. The mover is the side to
    /// move before the turn flip.
    pub fn apply_move_with_warning(
        &self,
        from: Cell,
        to: Cell,
        increment: bool,
    ) -> Result<GameState, MoveError> {
        let mover = self.current_player;
        let mut next = self.apply_move(from, to)?;
        if increment {
            next.warnings.bump(mover);
        }
        Ok(next)
    }

    /// Ends the game with a forfeit by `color`. Pieces and histories are
    /// left as they are.
    pub fn forfeit(&self, color: Color) -> GameState {
        let mut next = self.clone();
        next.status = match color {
            Color::Blue => GameStatus::BlueForfeit,
            Color::Red => GameStatus::RedForfeit,
        };
        next
    }
}

/// Set equality between a side's pieces and a home cluster.
fn cells_match(pieces: &[Cell; 3], home: &[Cell; 3]) -> bool {
    home.iter().all(|cell| pieces.contains(cell))
}

/// Cell names sorted lexicographically and joined by commas.
fn sorted_names(pieces: &[Cell; 3]) -> String {
    let mut names = [pieces[0].as_str(), pieces[1].as_str(), pieces[2].as_str()];
    names.sort_unstable();
    names.join(",")
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::HUB;

    /// Collects all six piece positions and asserts they are distinct.
    fn assert_occupancy(state: &GameState) {
        let mut cells: Vec<Cell> = state
            .blue_pieces
            .iter()
            .chain(state.red_pieces.iter())
            .copied()
            .collect();
        cells.sort();
        let len = cells.len();
        cells.dedup();
        assert_eq!(cells.len(), len, "two pieces share a cell");
        assert_eq!(len, 6);
    }

    // =====================================================================
    // Initial state
    // =====================================================================

    #[test]
    fn test_new_game_starts_at_home_blue_to_move() {
        let state = GameState::new();
        assert_eq!(state.blue_pieces, BLUE_HOME);
        assert_eq!(state.red_pieces, RED_HOME);
        assert_eq!(state.current_player, Color::Blue);
        assert_eq!(state.status, GameStatus::Playing);
        assert!(state.move_history.is_empty());
        assert!(state.board_history.is_empty());
        assert_eq!(state.warnings, Warnings::default());
        assert_occupancy(&state);
    }

    #[test]
    fn test_new_game_hub_is_empty() {
        let state = GameState::new();
        for cell in HUB {
            assert_eq!(state.piece_owner(cell), None);
        }
    }

    // =====================================================================
    // apply_move - the L2 -> CL opening from the initial position
    // =====================================================================

    #[test]
    fn test_opening_move_succeeds() {
        let state = GameState::new();
        let next = state.apply_move(Cell::L2, Cell::Cl).expect("legal opening");

        assert_eq!(next.current_player, Color::Red);
        assert!(next.blue_pieces.contains(&Cell::Cl));
        assert!(!next.blue_pieces.contains(&Cell::L2));
        assert!(next.blue_pieces.contains(&Cell::L1));
        assert!(next.blue_pieces.contains(&Cell::L3));
        assert_eq!(next.status, GameStatus::Playing);
        assert_eq!(next.move_history.len(), 1);
        assert_eq!(next.board_history.len(), 1);
        assert_occupancy(&next);
    }

    #[test]
    fn test_apply_move_leaves_input_untouched() {
        let state = GameState::new();
        let _ = state.apply_move(Cell::L2, Cell::Cl).unwrap();
        assert_eq!(state, GameState::new());
    }

    #[test]
    fn test_apply_move_rejects_opponent_piece() {
        let state = GameState::new();
        let err = state.apply_move(Cell::R2, Cell::Cr).unwrap_err();
        assert_eq!(err, MoveError::NotYourPiece(Cell::R2));
    }

    #[test]
    fn test_apply_move_rejects_empty_origin() {
        let state = GameState::new();
        let err = state.apply_move(Cell::Cm, Cell::Cl).unwrap_err();
        assert_eq!(err, MoveError::NotYourPiece(Cell::Cm));
    }

    #[test]
    fn test_apply_move_rejects_occupied_destination() {
        let state = GameState::new();
        // L1 and L2 are both Blue's own pieces - no stacking, no capture.
        let err = state.apply_move(Cell::L1, Cell::L2).unwrap_err();
        assert_eq!(err, MoveError::InvalidDestination(Cell::L1, Cell::L2));
    }

    #[test]
    fn test_apply_move_rejects_non_adjacent_destination() {
        let state = GameState::new();
        let err = state.apply_move(Cell::L2, Cell::Cm).unwrap_err();
        assert_eq!(err, MoveError::InvalidDestination(Cell::L2, Cell::Cm));
    }

    #[test]
    fn test_apply_move_rejects_after_game_over() {
        let state = GameState::new().forfeit(Color::Red);
        let err = state.apply_move(Cell::L2, Cell::Cl).unwrap_err();
        assert_eq!(err, MoveError::GameOver);
    }

    #[test]
    fn test_long_legal_sequence_preserves_occupancy() {
        // Deterministic playout: both sides repeatedly take their first
        // legal move. Occupancy must hold after every step.
        let mut state = GameState::new();
        for _ in 0..40 {
            if state.status.is_terminal() {
                break;
            }
            let (from, to) = state.legal_moves(state.current_player)[0];
            state = state.apply_move(from, to).expect("enumerated move");
            assert_occupancy(&state);
        }
    }

    // =====================================================================
    // win_status
    // =====================================================================

    #[test]
    fn test_win_by_completion() {
        let state = GameState {
            blue_pieces: [Cell::R2, Cell::R1, Cell::R3],
            red_pieces: [Cell::Cl, Cell::Cm, Cell::Ct],
            current_player: Color::Red,
            ..GameState::new()
        };
        assert_eq!(state.win_status(), GameStatus::BlueWins);
    }

    #[test]
    fn test_completion_beats_stalemate() {
        // Blue occupies all of Red's home; Red is boxed into Blue's home
        // with the gate blocked and has no moves. Completion wins - this
        // is not a stalemate loss for Red.
        let state = GameState {
            blue_pieces: [Cell::R1, Cell::R2, Cell::R3],
            red_pieces: [Cell::L1, Cell::L2, Cell::L3],
            current_player: Color::Red,
            ..GameState::new()
        };
        // Red can still move (CL is free), but even if it could not, the
        // completion check runs first.
        assert_eq!(state.win_status(), GameStatus::BlueWins);

        let boxed = GameState {
            blue_pieces: [Cell::R1, Cell::R2, Cell::R3],
            red_pieces: [Cell::L1, Cell::L2, Cell::L3],
            current_player: Color::Blue,
            ..GameState::new()
        };
        assert_eq!(boxed.win_status(), GameStatus::BlueWins);
    }

    #[test]
    fn test_stalemate_is_a_loss_for_the_stuck_player() {
        // Red sits at home with the gate CR held by Blue: every red piece
        // is walled in by its cluster mates and the occupied gate.
        let state = GameState {
            blue_pieces: [Cell::Cr, Cell::L1, Cell::L2],
            red_pieces: [Cell::R1, Cell::R2, Cell::R3],
            current_player: Color::Red,
            ..GameState::new()
        };
        assert!(!state.can_move(Color::Red));
        assert_eq!(state.win_status(), GameStatus::BlueWins);
    }

    #[test]
    fn test_playing_when_moves_exist() {
        assert_eq!(GameState::new().win_status(), GameStatus::Playing);
    }

    // =====================================================================
    // board_key
    // =====================================================================

    #[test]
    fn test_board_key_initial() {
        let state = GameState::new();
        assert_eq!(state.board_key(), "blue:L1,L2,L3|R1,R2,R3");
    }

    #[test]
    fn test_board_key_ignores_piece_identity_and_move_order() {
        // Two different routes to the same occupancy with the same side to
        // move must serialize identically.
        let a = GameState::new()
            .apply_move(Cell::L2, Cell::Cl)
            .unwrap()
            .apply_move(Cell::R2, Cell::Cr)
            .unwrap();

        let b = GameState {
            blue_pieces: [Cell::Cl, Cell::L3, Cell::L1],
            red_pieces: [Cell::R3, Cell::Cr, Cell::R1],
            current_player: Color::Blue,
            ..GameState::new()
        };
        assert_eq!(a.board_key(), b.board_key());
    }

    #[test]
    fn test_board_key_distinguishes_side_to_move() {
        let blue_to_move = GameState::new();
        let red_to_move = GameState {
            current_player: Color::Red,
            ..GameState::new()
        };
        assert_ne!(blue_to_move.board_key(), red_to_move.board_key());
    }

    // =====================================================================
    // apply_move_with_warning / forfeit
    // =====================================================================

    #[test]
    fn test_warning_increment_targets_the_mover() {
        let state = GameState::new();
        let next = state
            .apply_move_with_warning(Cell::L2, Cell::Cl, true)
            .unwrap();
        // Blue moved; Blue gets the warning even though it is Red's turn now.
        assert_eq!(next.warnings.blue, 1);
        assert_eq!(next.warnings.red, 0);
    }

    #[test]
    fn test_warning_not_incremented_when_flag_unset() {
        let next = GameState::new()
            .apply_move_with_warning(Cell::L2, Cell::Cl, false)
            .unwrap();
        assert_eq!(next.warnings, Warnings::default());
    }

    #[test]
    fn test_warning_rejected_move_is_an_error() {
        let state = GameState::new();
        assert!(
            state
                .apply_move_with_warning(Cell::R1, Cell::Cr, true)
                .is_err()
        );
    }

    #[test]
    fn test_forfeit_sets_terminal_status_and_keeps_board() {
        let state = GameState::new().apply_move(Cell::L2, Cell::Cl).unwrap();
        let done = state.forfeit(Color::Red);
        assert_eq!(done.status, GameStatus::RedForfeit);
        assert!(done.status.is_terminal());
        assert_eq!(done.blue_pieces, state.blue_pieces);
        assert_eq!(done.move_history, state.move_history);
    }

    #[test]
    fn test_legal_moves_initial_position() {
        // From home only the gate is reachable: each of the three blue
        // pieces can step to CL and nowhere else.
        let moves = GameState::new().legal_moves(Color::Blue);
        assert_eq!(moves.len(), 3);
        assert!(moves.iter().all(|&(_, to)| to == Cell::Cl));
    }
}
