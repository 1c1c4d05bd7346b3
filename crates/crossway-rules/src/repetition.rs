//! Repetition detection: piece bounces and repeated board configurations.
//!
//! A "bounce" is a player's two most recent moves being exact inverses -
//! one piece stepping straight back to where it just came from. A board
//! repetition is the same occupancy configuration (with the same side to
//! move) occurring three or more times over the whole game.
//!
//! [`check`] evaluates a *candidate* move against both detectors by
//! simulating it on a clone, so the caller can decide what to do before
//! committing anything.

use crate::board::{Cell, Color};
use crate::settings::RuleToggles;
use crate::state::{GameState, Move};

/// The repetition flags for one candidate move.
///
/// The `should_*` flags are independently gated by the enabled rules and may
/// all be true at once; callers apply the precedence forfeit > block > warn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Verdict {
    /// The candidate move undoes the mover's previous move.
    pub is_bounce: bool,
    /// How often the resulting configuration has occurred, counting itself.
    pub repetition_count: usize,
    /// Warn the mover (warning rule enabled).
    pub should_warn: bool,
    /// Reject the move outright (block rule enabled).
    pub should_block: bool,
    /// Forfeit the game - third repetition event (forfeit rule enabled and
    /// the mover already carries two warnings).
    pub should_forfeit: bool,
}

impl Verdict {
    /// Whether the candidate move repeats at all.
    pub fn has_repetition(&self) -> bool {
        self.is_bounce || self.repetition_count >= 3
    }
}

/// Whether `color`'s two most recent moves in `history` are exact inverses.
pub fn is_piece_bounce(history: &[Move], color: Color) -> bool {
    let mut own = history.iter().filter(|m| m.player == color).rev();
    match (own.next(), own.next()) {
        (Some(last), Some(previous)) => last.is_inverse_of(previous),
        _ => false,
    }
}

/// How many entries in `board_history` equal the most recent one. At least
/// 1 for a non-empty history, since the latest entry matches itself.
pub fn repetition_count(board_history: &[String]) -> usize {
    match board_history.last() {
        Some(latest) => {
            board_history.iter().filter(|key| *key == latest).count()
        }
        None => 0,
    }
}

/// Evaluates the candidate move `from -> to` against the repetition rules
/// without touching `state`.
///
/// Returns an all-clear [`Verdict`] if the move itself is illegal - callers
/// are expected to have validated it first.
pub fn check(
    state: &GameState,
    from: Cell,
    to: Cell,
    rules: &RuleToggles,
) -> Verdict {
    let mover = state.current_player;
    let Ok(next) = state.apply_move(from, to) else {
        return Verdict::default();
    };

    let is_bounce = is_piece_bounce(&next.move_history, mover);
    let count = repetition_count(&next.board_history);
    let repeats = is_bounce || count >= 3;

    Verdict {
        is_bounce,
        repetition_count: count,
        should_warn: repeats && rules.warning,
        should_block: repeats && rules.block,
        should_forfeit: repeats
            && rules.forfeit
            && state.warnings.get(mover) >= 2,
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Warnings;

    /// All three repetition rules enabled.
    fn all_rules() -> RuleToggles {
        RuleToggles {
            warning: true,
            block: true,
            forfeit: true,
        }
    }

    /// Plays Blue L2->CL, Red R2->CR, leaving Blue about to bounce back.
    fn one_shuffle() -> GameState {
        GameState::new()
            .apply_move(Cell::L2, Cell::Cl)
            .unwrap()
            .apply_move(Cell::R2, Cell::Cr)
            .unwrap()
    }

    // =====================================================================
    // is_piece_bounce
    // =====================================================================

    #[test]
    fn test_bounce_detected_on_immediate_undo() {
        // Blue L2->CL ... Blue CL->L2: exact inverses, a bounce.
        let state = one_shuffle()
            .apply_move(Cell::Cl, Cell::L2)
            .unwrap();
        assert!(is_piece_bounce(&state.move_history, Color::Blue));
        assert!(!is_piece_bounce(&state.move_history, Color::Red));
    }

    #[test]
    fn test_no_bounce_with_fewer_than_two_moves() {
        let state = GameState::new().apply_move(Cell::L2, Cell::Cl).unwrap();
        assert!(!is_piece_bounce(&state.move_history, Color::Blue));
        assert!(!is_piece_bounce(&state.move_history, Color::Red));
    }

    #[test]
    fn test_no_bounce_when_advancing() {
        // Blue L2->CL then CL->CM is progress, not a bounce.
        let state = one_shuffle().apply_move(Cell::Cl, Cell::Cm).unwrap();
        assert!(!is_piece_bounce(&state.move_history, Color::Blue));
    }

    // =====================================================================
    // repetition_count
    // =====================================================================

    #[test]
    fn test_repetition_count_empty_history() {
        assert_eq!(repetition_count(&[]), 0);
    }

    #[test]
    fn test_repetition_count_counts_latest_key() {
        let history = vec![
            "a".to_string(),
            "b".to_string(),
            "a".to_string(),
            "c".to_string(),
            "a".to_string(),
        ];
        assert_eq!(repetition_count(&history), 3);
    }

    #[test]
    fn test_repetition_count_is_at_least_one() {
        assert_eq!(repetition_count(&["only".to_string()]), 1);
    }

    // =====================================================================
    // check
    // =====================================================================

    #[test]
    fn test_check_flags_bounce_on_second_half_of_pair() {
        // Candidate CL->L2 would undo Blue's L2->CL.
        let state = one_shuffle();
        let verdict = check(&state, Cell::Cl, Cell::L2, &all_rules());
        assert!(verdict.is_bounce);
        assert!(verdict.has_repetition());
        assert!(verdict.should_warn);
        assert!(verdict.should_block);
    }

    #[test]
    fn test_check_clear_for_fresh_move() {
        let state = one_shuffle();
        let verdict = check(&state, Cell::Cl, Cell::Cm, &all_rules());
        assert!(!verdict.has_repetition());
        assert!(!verdict.should_warn);
        assert!(!verdict.should_block);
        assert!(!verdict.should_forfeit);
    }

    #[test]
    fn test_check_illegal_candidate_is_all_clear() {
        let state = GameState::new();
        let verdict = check(&state, Cell::L2, Cell::Cm, &all_rules());
        assert_eq!(verdict, Verdict::default());
    }

    #[test]
    fn test_forfeit_requires_two_prior_warnings() {
        // Same bounce, increasing warning counters: the third repetition
        // event (counter already at 2) is the one that forfeits.
        let base = one_shuffle();
        for (prior, expected) in [(0u8, false), (1, false), (2, true), (3, true)]
        {
            let state = GameState {
                warnings: Warnings {
                    blue: prior,
                    red: 0,
                },
                ..base.clone()
            };
            let verdict = check(&state, Cell::Cl, Cell::L2, &all_rules());
            assert!(verdict.is_bounce);
            assert_eq!(
                verdict.should_forfeit, expected,
                "prior warnings = {prior}"
            );
        }
    }

    #[test]
    fn test_flags_follow_rule_toggles() {
        let state = one_shuffle();
        let warn_only = RuleToggles {
            warning: true,
            block: false,
            forfeit: false,
        };
        let verdict = check(&state, Cell::Cl, Cell::L2, &warn_only);
        assert!(verdict.should_warn);
        assert!(!verdict.should_block);
        assert!(!verdict.should_forfeit);

        let none = RuleToggles {
            warning: false,
            block: false,
            forfeit: false,
        };
        let verdict = check(&state, Cell::Cl, Cell::L2, &none);
        assert!(verdict.has_repetition(), "detection is independent of rules");
        assert!(!verdict.should_warn);
        assert!(!verdict.should_block);
        assert!(!verdict.should_forfeit);
    }

    #[test]
    fn test_threefold_board_repetition_reaches_three() {
        // Each cycle of four moves returns to the initial occupancy with
        // Blue to move; the third visit pushes the count to 3.
        let mut state = GameState::new();
        let cycle = [
            (Cell::L2, Cell::Cl),
            (Cell::R2, Cell::Cr),
            (Cell::Cl, Cell::L2),
            (Cell::Cr, Cell::R2),
        ];
        // Two full cycles put "initial, blue to move" twice in the history.
        for _ in 0..2 {
            for (from, to) in cycle {
                state = state.apply_move(from, to).unwrap();
            }
        }
        // Candidate third cycle: its final move would make it three.
        for (from, to) in &cycle[..3] {
            state = state.apply_move(*from, *to).unwrap();
        }
        let verdict = check(&state, Cell::Cr, Cell::R2, &all_rules());
        assert_eq!(verdict.repetition_count, 3);
        assert!(verdict.has_repetition());
    }
}
