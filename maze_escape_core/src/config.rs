use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{error::GameError, game::Phase};

/// Fewest free cells a maze needs: two heroes, one key and two traps.
pub const MIN_FREE_CELLS: usize = 5;

/// Tunable parameters of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Turn at which the game is lost if the heroes have not escaped.
    pub turn_limit: u32,
    /// Minimum distance on at least one axis between the two starting heroes.
    pub min_hero_separation: usize,
    /// Random draws allowed when placing the heroes.
    pub placement_attempts: u32,
    pub min_free_cells: usize,
    pub hero_names: [String; 2],
    pub hero_symbols: [char; 2],
    pub exploring_frame_ms: u64,
    pub fast_frame_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            turn_limit: 1000,
            min_hero_separation: 7,
            placement_attempts: 1000,
            min_free_cells: MIN_FREE_CELLS,
            hero_names: ["Gregorakis".to_string(), "Asimenia".to_string()],
            hero_symbols: ['G', 'S'],
            exploring_frame_ms: 130,
            fast_frame_ms: 50,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), GameError> {
        if self.turn_limit == 0 {
            return Err(GameError::InvalidConfig(
                "turn_limit must be at least 1".to_string(),
            ));
        }
        if self.placement_attempts == 0 {
            return Err(GameError::InvalidConfig(
                "placement_attempts must be at least 1".to_string(),
            ));
        }
        if self.min_free_cells < MIN_FREE_CELLS {
            return Err(GameError::InvalidConfig(format!(
                "min_free_cells must be at least {MIN_FREE_CELLS}"
            )));
        }
        Ok(())
    }

    /// Delay between two rendered turns. Exploring is paced slower than the
    /// wall and exit animations.
    pub fn frame_delay(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Exploring => Duration::from_millis(self.exploring_frame_ms),
            Phase::WallDissolving | Phase::GuidedToExit => {
                Duration::from_millis(self.fast_frame_ms)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.turn_limit, 1000);
        assert_eq!(config.min_hero_separation, 7);
    }

    #[test]
    fn validate_rejects_degenerate_values() {
        let config = GameConfig {
            turn_limit: 0,
            ..GameConfig::default()
        };
        assert!(matches!(config.validate(), Err(GameError::InvalidConfig(_))));

        let config = GameConfig {
            min_free_cells: 2,
            ..GameConfig::default()
        };
        assert!(matches!(config.validate(), Err(GameError::InvalidConfig(_))));
    }

    #[test]
    fn frame_delay_is_faster_after_rendezvous() {
        let config = GameConfig::default();
        assert_eq!(
            config.frame_delay(Phase::Exploring),
            Duration::from_millis(130)
        );
        assert_eq!(
            config.frame_delay(Phase::WallDissolving),
            Duration::from_millis(50)
        );
        assert_eq!(
            config.frame_delay(Phase::GuidedToExit),
            Duration::from_millis(50)
        );
    }
}
