//! Runner configuration from the environment.

use catan_core::BotDifficulty;
use std::path::PathBuf;
use thiserror::Error;

/// Default cap on full turns before the runner gives up
pub const DEFAULT_MAX_TURNS: u32 = 200;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("CATAN_SEED must be an unsigned integer, got {0:?}")]
    InvalidSeed(String),

    #[error("CATAN_MAX_TURNS must be a positive integer, got {0:?}")]
    InvalidMaxTurns(String),

    #[error("CATAN_BOT_DIFFICULTY must be easy or medium, got {0:?}")]
    InvalidDifficulty(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Seed for the game RNG; random when unset
    pub seed: Option<u64>,
    pub max_turns: u32,
    /// Where to write the final snapshot, if anywhere
    pub snapshot: Option<PathBuf>,
    pub difficulty: BotDifficulty,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_turns: DEFAULT_MAX_TURNS,
            snapshot: None,
            difficulty: BotDifficulty::Medium,
        }
    }
}

impl CliConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup, so tests don't touch the process env
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("CATAN_SEED") {
            let parsed = raw.trim().parse::<u64>();
            config.seed = Some(parsed.map_err(|_| ConfigError::InvalidSeed(raw))?);
        }

        if let Some(raw) = lookup("CATAN_MAX_TURNS") {
            let parsed = raw.trim().parse::<u32>();
            config.max_turns = match parsed {
                Ok(turns) if turns > 0 => turns,
                _ => return Err(ConfigError::InvalidMaxTurns(raw)),
            };
        }

        config.snapshot = lookup("CATAN_SNAPSHOT")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        if let Some(raw) = lookup("CATAN_BOT_DIFFICULTY") {
            let name = raw.trim().to_ascii_lowercase();
            config.difficulty = match name.as_str() {
                "easy" => BotDifficulty::Easy,
                "medium" => BotDifficulty::Medium,
                _ => return Err(ConfigError::InvalidDifficulty(raw)),
            };
        }

        Ok(config)
    }
}
