//! Honey Contest Bot - Main Entry Point
//!
//! A Telegram bot that collects votes for numbered honey samples,
//! keeps the tallies on disk and reports the leaders.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use honey_contest_bot::commands::CommandHandler;
use honey_contest_bot::config::{BeekeeperDirectory, BotConfig, BotSettings, ContestRules};
use honey_contest_bot::ledger::VoteLedger;
use honey_contest_bot::telegram::{AdminChat, AdminNotifier, TelegramBot, notice_channel};

/// Telegram bot for a honey tasting contest vote.
#[derive(Parser, Debug)]
#[command(name = "honey_bot")]
#[command(about = "Collect and count honey contest votes over Telegram")]
#[command(version)]
struct Args {
    /// Path to the vote snapshot file (overrides RESULTS_FILE).
    #[arg(short, long)]
    results_file: Option<PathBuf>,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write an example beekeeper contact file and exit.
    #[arg(long)]
    generate_directory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    if args.generate_directory {
        return generate_example_directory();
    }

    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let mut bot_config =
        BotConfig::from_env().context("Failed to load bot configuration from environment")?;
    if let Some(path) = args.results_file {
        bot_config.results_path = path;
    }

    let settings = BotSettings::from_env_with_defaults();
    let rules = ContestRules::from_env().context("Invalid contest rules in environment")?;

    let directory = load_directory(bot_config.beekeepers_path.as_deref(), &rules)?;

    info!(
        "Contest: samples 1..={}, {} votes per user, {} known beekeepers",
        rules.max_samples,
        rules.vote_limit,
        directory.len()
    );

    // Loaded once; every later change goes through the shared lock.
    let ledger = VoteLedger::open(rules, &bot_config.results_path);
    let ledger = Arc::new(RwLock::new(ledger));

    let handler = Arc::new(CommandHandler::new(
        Arc::clone(&ledger),
        directory,
        bot_config.admin_id,
        settings.top_n,
    ));

    let (notifier_handle, notifier_rx) = notice_channel();
    let bot = TelegramBot::new(
        bot_config.bot_token.clone(),
        handler,
        notifier_handle.clone(),
    );

    let notifier = AdminNotifier::new(
        AdminChat::new(bot.inner().clone(), bot_config.admin_id),
        Duration::from_millis(settings.notify_interval_ms),
    );
    let notifier_task = tokio::spawn(async move {
        notifier.run(notifier_rx).await;
    });

    info!("Starting honey contest bot...");
    info!("Bot is running. Use Ctrl+C to stop.");

    bot.run().await;

    info!("Shutting down...");
    notifier_handle.shutdown().await;
    if let Err(e) = notifier_task.await {
        warn!("Notifier task ended abnormally: {}", e);
    }

    let ledger = ledger.read().await;
    ledger.save();
    info!(
        "Final state: {} votes from {} voters",
        ledger.total_votes(),
        ledger.unique_voter_count()
    );

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads and validates the beekeeper directory, or the built-in one.
fn load_directory(
    path: Option<&std::path::Path>,
    rules: &ContestRules,
) -> Result<BeekeeperDirectory> {
    let Some(path) = path else {
        return Ok(BeekeeperDirectory::default());
    };

    let directory = BeekeeperDirectory::load_from_file(path)
        .with_context(|| format!("Failed to load beekeeper directory {}", path.display()))?;
    directory
        .validate(rules)
        .context("Beekeeper directory validation failed")?;

    Ok(directory)
}

/// Generates an example beekeeper directory file.
fn generate_example_directory() -> Result<()> {
    let example = BeekeeperDirectory::example();
    example.save_to_file("beekeepers.example.json")?;

    println!("✓ Example beekeeper directory written to: beekeepers.example.json");
    println!("\nTo use this bot:");
    println!("1. Copy beekeepers.example.json to beekeepers.json and edit the contacts");
    println!("2. Create a .env file with BOT_TOKEN, ADMIN_ID and BEEKEEPERS_FILE=beekeepers.json");
    println!("3. Run: honey_bot");

    Ok(())
}
