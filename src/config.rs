//! Environment configuration for the host process.

use crate::types::{Deck, GameConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}'")]
    InvalidValue { var: &'static str, value: String },
    #[error("Failed to read deck {path}: {source}")]
    DeckIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse deck {path}: {source}")]
    DeckFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn parse_var<T: FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        Err(_) => Ok(None),
    }
}

/// Parsed value, or the default (with a warning) when missing or invalid
fn env_or<T: FromStr>(var: &'static str, default: T) -> T {
    match parse_var(var) {
        Ok(Some(value)) => value,
        Ok(None) => default,
        Err(e) => {
            tracing::warn!("{}, using default", e);
            default
        }
    }
}

/// Countdown lengths must be at least one second
fn env_secs(var: &'static str, default: u32) -> u32 {
    match env_or(var, default) {
        0 => {
            tracing::warn!("{} must be positive, using default {}", var, default);
            default
        }
        secs => secs,
    }
}

/// Unset or blank keeps the default; "0" and "false" switch it off
fn env_flag(var: &str, default: bool) -> bool {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => {
            let v = v.trim();
            v != "0" && !v.eq_ignore_ascii_case("false")
        }
        _ => default,
    }
}

impl GameConfig {
    pub fn from_env() -> Self {
        let defaults = GameConfig::default();

        let mut bot_min_delay_ms = env_or("BOT_MIN_DELAY_MS", defaults.bot_min_delay_ms);
        let mut bot_max_delay_ms = env_or("BOT_MAX_DELAY_MS", defaults.bot_max_delay_ms);
        if bot_min_delay_ms > bot_max_delay_ms {
            tracing::warn!(
                "BOT_MIN_DELAY_MS ({}) exceeds BOT_MAX_DELAY_MS ({}), swapping",
                bot_min_delay_ms,
                bot_max_delay_ms
            );
            std::mem::swap(&mut bot_min_delay_ms, &mut bot_max_delay_ms);
        }

        let rng_seed = match parse_var("RNG_SEED") {
            Ok(seed) => seed,
            Err(e) => {
                tracing::warn!("{}, using OS entropy", e);
                None
            }
        };

        Self {
            groom_answer_seconds: env_secs("GROOM_ANSWER_SECONDS", defaults.groom_answer_seconds),
            voting_seconds: env_secs("VOTING_SECONDS", defaults.voting_seconds),
            victim_selection_seconds: env_secs(
                "VICTIM_SELECTION_SECONDS",
                defaults.victim_selection_seconds,
            ),
            correct_vote_reward: env_or("CORRECT_VOTE_REWARD", defaults.correct_vote_reward),
            groom_correct_reward: env_or("GROOM_CORRECT_REWARD", defaults.groom_correct_reward),
            groom_drinks_when_wrong: env_flag(
                "GROOM_DRINKS_WHEN_WRONG",
                defaults.groom_drinks_when_wrong,
            ),
            bot_min_delay_ms,
            bot_max_delay_ms,
            rng_seed,
        }
    }
}

/// Process-level settings that are not part of the game rules
#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    pub bind_addr: SocketAddr,
    /// JSON deck with questions, missions and videos
    pub questions_path: Option<PathBuf>,
}

impl HostConfig {
    pub fn from_env() -> Self {
        let bind_addr = env_or("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 6574)));
        let questions_path = std::env::var("QUESTIONS_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Self {
            bind_addr,
            questions_path,
        }
    }
}

impl Deck {
    pub fn load(path: &Path) -> Result<Deck, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::DeckIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::DeckFormat {
            path: path.to_path_buf(),
            source,
        })
    }
}
