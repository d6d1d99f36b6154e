//! sde-watch CLI
//!
//! Control surface for the watcher: run a cycle now, run the daily
//! scheduler in the foreground, edit channel credentials, or inspect the
//! stored snapshot.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use sde_watch::{
    config::{self, ChannelConfig, KEY_CHAT_ID, KEY_TIME, KEY_TOKEN},
    error::{AppError, Result},
    models::Config,
    pipeline::Watcher,
    scheduler::{Scheduler, StartOutcome},
    store::SnapshotStore,
};

/// sde-watch - SDE BU Notification Watcher
#[derive(Parser, Debug)]
#[command(
    name = "sde-watch",
    version,
    about = "Watches the SDE BU notice board and pushes Telegram updates"
)]
struct Cli {
    /// Path to the behavior config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Path to the env file holding credentials and the daily time
    #[arg(short, long, default_value = ".env")]
    env_file: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one check-and-notify cycle now
    Run,

    /// Start the daily scheduler and block until Ctrl-C
    Watch,

    /// Show or edit the channel configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show stored snapshot info
    Status,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the current channel configuration
    Show,

    /// Update one or more channel settings
    Set {
        /// Telegram bot token
        #[arg(long)]
        token: Option<String>,

        /// Telegram chat identifier
        #[arg(long)]
        chat_id: Option<String>,

        /// Daily notification time (HH:MM, 24-hour)
        #[arg(long)]
        time: Option<String>,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("sde-watch starting...");

    let app_config = Config::load_or_default(&cli.config);
    app_config.validate()?;
    config::ensure_default(&cli.env_file)?;

    match cli.command {
        Command::Run => {
            let watcher = Watcher::from_config(&app_config, &cli.env_file)?;
            let outcome = watcher.run_cycle().await;
            log::info!("Cycle finished: {:?}", outcome);
        }

        Command::Watch => {
            let watcher = Arc::new(Watcher::from_config(&app_config, &cli.env_file)?);
            let scheduler = Scheduler::new(
                watcher,
                Duration::from_secs(app_config.scheduler.poll_interval_secs),
            );

            match scheduler.start().await? {
                StartOutcome::Started { at } => {
                    log::info!("Watching; daily check at {}. Ctrl-C to stop.", at)
                }
                StartOutcome::AlreadyRunning => unreachable!("fresh scheduler"),
            }

            tokio::signal::ctrl_c().await?;
            log::info!("Ctrl-C received, stopping scheduler...");
            scheduler.stop().await;
        }

        Command::Config { action } => match action {
            ConfigAction::Show => {
                let channel = ChannelConfig::load(&cli.env_file);
                log::info!(
                    "Bot token: {}",
                    if channel.bot_token.is_empty() {
                        "(not set)"
                    } else {
                        "(set)"
                    }
                );
                log::info!(
                    "Chat id: {}",
                    if channel.chat_id.is_empty() {
                        "(not set)"
                    } else {
                        channel.chat_id.as_str()
                    }
                );
                log::info!("Daily time: {}", channel.daily_time);
            }

            ConfigAction::Set {
                token,
                chat_id,
                time,
            } => {
                if token.is_none() && chat_id.is_none() && time.is_none() {
                    return Err(AppError::config(
                        "Nothing to update: pass --token, --chat-id, or --time",
                    ));
                }

                if let Some(time) = &time {
                    // Reject bad times before touching the file.
                    chrono::NaiveTime::parse_from_str(time, "%H:%M").map_err(|e| {
                        AppError::config(format!("Invalid time '{time}': {e} (expected HH:MM)"))
                    })?;
                }

                if let Some(token) = token {
                    config::update_key(&cli.env_file, KEY_TOKEN, &token)?;
                    log::info!("Bot token updated");
                }
                if let Some(chat_id) = chat_id {
                    config::update_key(&cli.env_file, KEY_CHAT_ID, &chat_id)?;
                    log::info!("Chat id updated");
                }
                if let Some(time) = time {
                    config::update_key(&cli.env_file, KEY_TIME, &time)?;
                    log::info!("Daily time updated (takes effect on next scheduler start)");
                }
            }
        },

        Command::Status => {
            let store = SnapshotStore::new(&app_config.storage);
            let path = store.resolve_path();

            if path.exists() {
                let snapshot = store.load().await;
                log::info!("Snapshot: {:?} ({} items)", path, snapshot.len());
                for (i, item) in snapshot.news.iter().take(5).enumerate() {
                    log::info!("  {}. {}", i + 1, item.title);
                }
                if snapshot.len() > 5 {
                    log::info!("  ... and {} more", snapshot.len() - 5);
                }
            } else {
                log::info!("No snapshot found yet at {:?}.", path);
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
