//! Contest rules, bot settings and Telegram credentials.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{DEFAULT_RESULTS_FILE, MAX_SAMPLES, MAX_SAMPLES_CEILING, VOTE_LIMIT};

/// Bounds of the contest shared by the ledger and the reply renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestRules {
    /// Highest valid sample number; samples are numbered from 1.
    pub max_samples: u32,

    /// How many votes each user may cast over the whole contest.
    pub vote_limit: u32,
}

impl Default for ContestRules {
    fn default() -> Self {
        Self {
            max_samples: MAX_SAMPLES,
            vote_limit: VOTE_LIMIT,
        }
    }
}

impl ContestRules {
    /// Creates rules with explicit bounds.
    #[must_use]
    pub const fn new(max_samples: u32, vote_limit: u32) -> Self {
        Self {
            max_samples,
            vote_limit,
        }
    }

    /// Creates rules after checking both bounds.
    ///
    /// `max_samples` must lie in `1..=MAX_SAMPLES_CEILING` since the ledger
    /// keeps one counter per sample. `vote_limit` must be positive.
    pub fn checked(max_samples: u32, vote_limit: u32) -> Result<Self, ConfigError> {
        if max_samples == 0 || max_samples > MAX_SAMPLES_CEILING {
            return Err(ConfigError::InvalidContestRule {
                name: "MAX_SAMPLES",
                value: max_samples.to_string(),
            });
        }
        if vote_limit == 0 {
            return Err(ConfigError::InvalidContestRule {
                name: "VOTE_LIMIT",
                value: vote_limit.to_string(),
            });
        }
        Ok(Self::new(max_samples, vote_limit))
    }

    /// Reads `MAX_SAMPLES` and `VOTE_LIMIT` from the environment.
    ///
    /// Unset variables keep their defaults; anything else must pass [`Self::checked`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_values(
            std::env::var("MAX_SAMPLES").ok().as_deref(),
            std::env::var("VOTE_LIMIT").ok().as_deref(),
        )
    }

    fn from_values(
        max_samples: Option<&str>,
        vote_limit: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Self::checked(
            parse_rule("MAX_SAMPLES", max_samples)?.unwrap_or(defaults.max_samples),
            parse_rule("VOTE_LIMIT", vote_limit)?.unwrap_or(defaults.vote_limit),
        )
    }

    /// Checks whether `sample` is a valid sample number.
    #[must_use]
    pub const fn contains(&self, sample: u32) -> bool {
        sample >= 1 && sample <= self.max_samples
    }
}

fn parse_rule(name: &'static str, raw: Option<&str>) -> Result<Option<u32>, ConfigError> {
    raw.map(|raw| {
        raw.trim()
            .parse()
            .map_err(|_| ConfigError::InvalidContestRule {
                name,
                value: raw.to_owned(),
            })
    })
    .transpose()
}

/// Telegram bot credentials and file locations.
#[derive(Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Bot API token issued by `@BotFather`.
    pub bot_token: String,

    /// Telegram user id of the contest organiser.
    pub admin_id: u64,

    /// Path to the vote snapshot file.
    #[serde(default = "default_results_path")]
    pub results_path: PathBuf,

    /// Optional JSON file with beekeeper contacts.
    #[serde(default)]
    pub beekeepers_path: Option<PathBuf>,
}

fn default_results_path() -> PathBuf {
    PathBuf::from(DEFAULT_RESULTS_FILE)
}

impl BotConfig {
    /// Creates a new configuration with default file locations.
    #[must_use]
    pub fn new(bot_token: String, admin_id: u64) -> Self {
        Self {
            bot_token,
            admin_id,
            results_path: default_results_path(),
            beekeepers_path: None,
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `BOT_TOKEN` and `ADMIN_ID` to be set. `RESULTS_FILE` and
    /// `BEEKEEPERS_FILE` are optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = std::env::var("BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingEnvVar("BOT_TOKEN"))?;

        let admin_id: u64 = std::env::var("ADMIN_ID")
            .map_err(|_| ConfigError::MissingEnvVar("ADMIN_ID"))?
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidAdminId)?;

        let results_path =
            std::env::var("RESULTS_FILE").map_or_else(|_| default_results_path(), PathBuf::from);

        let beekeepers_path = std::env::var("BEEKEEPERS_FILE").ok().map(PathBuf::from);

        Ok(Self {
            bot_token,
            admin_id,
            results_path,
            beekeepers_path,
        })
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("bot_token", &"<redacted>")
            .field("admin_id", &self.admin_id)
            .field("results_path", &self.results_path)
            .field("beekeepers_path", &self.beekeepers_path)
            .finish()
    }
}

/// Runtime tuning for the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Minimum spacing between notifications sent to the organiser.
    #[serde(default = "default_notify_interval")]
    pub notify_interval_ms: u64,

    /// How many samples the results view lists.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_notify_interval() -> u64 {
    1000 // Telegram allows about one message per second to a single chat
}

fn default_top_n() -> usize {
    5
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            notify_interval_ms: default_notify_interval(),
            top_n: default_top_n(),
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables with defaults.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self {
            notify_interval_ms: std::env::var("NOTIFY_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_notify_interval),
            top_n: std::env::var("TOP_N")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_top_n),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid ADMIN_ID format (must be a numeric Telegram user id)")]
    InvalidAdminId,

    #[error(
        "Invalid {name} value {value:?} (samples must be 1..={}, the vote limit positive)",
        MAX_SAMPLES_CEILING
    )]
    InvalidContestRule { name: &'static str, value: String },
}
