//! Configuration module for the honey contest bot.
//!
//! Handles contest rules, bot credentials from the environment,
//! and the beekeeper contact directory shown after a vote.

mod beekeepers;
mod settings;

pub use beekeepers::{BeekeeperDirectory, DirectoryError};
pub use settings::{BotConfig, BotSettings, ConfigError, ContestRules};

/// Number of honey samples in the contest (ids `1..=MAX_SAMPLES`).
pub const MAX_SAMPLES: u32 = 60;

/// Largest sample count accepted from configuration.
pub const MAX_SAMPLES_CEILING: u32 = 10_000;

/// Maximum number of votes a single user may cast.
pub const VOTE_LIMIT: u32 = 7;

/// Default location of the persisted vote snapshot.
pub const DEFAULT_RESULTS_FILE: &str = "honey_votes.json";
