//! Game and board configuration.
//!
//! Every field has a default matching the standard 19-tile board, so a
//! config file only needs the values it changes:
//!
//! ```json
//! { "player_names": ["Ada", "Grace"], "seed": 7, "board": { "entangled_pairs": 3 } }
//! ```

use crate::board::Resource;
use crate::player::ResourceHand;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Standard dice numbers: one each of 2 and 12, two of everything else but 7
pub const STANDARD_NUMBERS: [u8; 18] = [2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Board generation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Land radius in hex steps (2 gives 19 tiles)
    pub radius: u32,
    /// Entangled pairs to create at generation time
    pub entangled_pairs: u8,
    /// Dice numbers, one per non-desert tile
    pub numbers: Vec<u8>,
    /// Resources, one per non-desert tile
    pub resources: Vec<Resource>,
    /// 3:1 ports placed alongside the five 2:1 ports
    pub generic_ports: u8,
}

impl Default for BoardConfig {
    fn default() -> Self {
        let mut resources = Vec::with_capacity(18);
        resources.extend([Resource::Lumber; 4]);
        resources.extend([Resource::Brick; 3]);
        resources.extend([Resource::Wool; 4]);
        resources.extend([Resource::Grain; 4]);
        resources.extend([Resource::Ore; 3]);

        Self {
            radius: 2,
            entangled_pairs: 2,
            numbers: STANDARD_NUMBERS.to_vec(),
            resources,
            generic_ports: 4,
        }
    }
}

/// Session parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// One name per player, 2-4 players
    pub player_names: Vec<String>,
    /// Seed for every random decision; entropy when unset
    pub seed: Option<u64>,
    pub board: BoardConfig,
    /// Size of the entanglement group id pool
    pub max_entanglement_groups: u8,
    /// Resources each player starts with
    pub starting_resources: ResourceHand,
    /// Settlements a player may place without a connecting road
    pub founding_settlements: u32,
    pub victory_points_to_win: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player_names: vec!["Player 1".into(), "Player 2".into()],
            seed: None,
            board: BoardConfig::default(),
            max_entanglement_groups: 10,
            starting_resources: ResourceHand::with_amounts(2, 2, 2, 2, 2),
            founding_settlements: 2,
            victory_points_to_win: 10,
        }
    }
}

impl GameConfig {
    /// Default config for the given player names
    pub fn with_players<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            player_names: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_entangled_pairs(mut self, pairs: u8) -> Self {
        self.board.entangled_pairs = pairs;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(2..=4).contains(&self.player_names.len()) {
            return Err(ConfigError::Invalid(format!(
                "need 2-4 players, got {}",
                self.player_names.len()
            )));
        }
        if self.board.radius == 0 {
            return Err(ConfigError::Invalid("board radius must be at least 1".into()));
        }
        if self.victory_points_to_win == 0 {
            return Err(ConfigError::Invalid("victory_points_to_win must be positive".into()));
        }
        Ok(())
    }
}
