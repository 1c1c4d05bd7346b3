//! Per-room game settings.

use serde::{Deserialize, Serialize};

/// Which repetition policies are active. Each toggle is independent; a
/// repeated position can warn, block, and forfeit at the same time, and the
/// caller applies the precedence forfeit > block > warn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleToggles {
    /// Count a warning against the repeating player.
    pub warning: bool,
    /// Reject the repeating move outright.
    pub block: bool,
    /// Forfeit the game on the third repetition event.
    pub forfeit: bool,
}

impl Default for RuleToggles {
    fn default() -> Self {
        Self {
            warning: true,
            block: false,
            forfeit: true,
        }
    }
}

/// Settings a room's host can change. Owned by the room, applied by the
/// rules engine and the gateway's countdown driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    /// Repetition policy toggles.
    pub rules: RuleToggles,
    /// Whether each turn runs against a countdown.
    pub blitz_enabled: bool,
    /// Seconds per turn when blitz is enabled.
    pub blitz_secs: u16,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            rules: RuleToggles::default(),
            blitz_enabled: false,
            blitz_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = GameSettings::default();
        assert!(settings.rules.warning);
        assert!(!settings.rules.block);
        assert!(settings.rules.forfeit);
        assert!(!settings.blitz_enabled);
        assert_eq!(settings.blitz_secs, 30);
    }

    #[test]
    fn test_settings_round_trip() {
        let settings = GameSettings {
            rules: RuleToggles {
                warning: false,
                block: true,
                forfeit: false,
            },
            blitz_enabled: true,
            blitz_secs: 10,
        };
        let json = serde_json::to_string(&settings).unwrap();
        let back: GameSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings, back);
    }
}
