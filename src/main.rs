//! Nudge Assistant daemon - CLI and dispatcher loop

use chrono::Utc;
use clap::{Parser, Subcommand};
use nudge_assistant::config::Config;
use nudge_assistant::dispatch::NudgeDispatcher;
use nudge_assistant::handler::MessageHandler;
use nudge_assistant::notify;
use nudge_assistant::store::{ReminderStore, Source};
use nudge_assistant::Result;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Nudge Assistant - turn chat messages into scheduled reminder nudges
#[derive(Parser)]
#[command(name = "nudge-assistant")]
#[command(about = "Turn chat messages into scheduled reminder nudges")]
struct Cli {
    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle one inbound message and print the reply
    Handle {
        /// Sender identity token
        #[arg(long)]
        sender: String,

        /// Message text, already transcribed
        text: String,

        /// Mark the message as a transcribed voice note
        #[arg(long)]
        voice: bool,
    },

    /// Run a single dispatcher tick now
    Tick,

    /// Print an owner's pending reminders
    List {
        /// Owner identity token
        #[arg(long)]
        owner: String,
    },

    /// Run the dispatcher loop until the process is stopped
    Run,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = Config::load_or_default(cli.config.as_deref())?;
    let store = ReminderStore::open(&config.db_path)?;

    match cli.command {
        Commands::Handle { sender, text, voice } => cmd_handle(&config, &store, &sender, &text, voice),
        Commands::Tick => cmd_tick(&config, &store),
        Commands::List { owner } => cmd_list(&config, &store, &owner),
        Commands::Run => cmd_run(&config, &store),
    }
}

fn cmd_handle(config: &Config, store: &ReminderStore, sender: &str, text: &str, voice: bool) -> Result<()> {
    let handler = MessageHandler::new(store, config);
    let source = if voice { Source::Voice } else { Source::Text };

    // Store failures become a generic reply; the sender never sees internals
    let reply = match handler.handle(sender, text, source, Utc::now()) {
        Ok(reply) => reply,
        Err(e) => {
            error!("message handling failed: {}", e);
            "Something went wrong on my end. Please try again.".to_string()
        }
    };

    println!("{}", reply);
    Ok(())
}

fn cmd_tick(config: &Config, store: &ReminderStore) -> Result<()> {
    let notifier = notify::from_config(config);
    let dispatcher = NudgeDispatcher::new(store, notifier.as_ref(), config.timezone, config.digest_hour);

    let summary = dispatcher.tick(Utc::now())?;
    println!("tick: {} nudges, {} digests", summary.nudges, summary.digests);
    Ok(())
}

fn cmd_list(config: &Config, store: &ReminderStore, owner: &str) -> Result<()> {
    let reminders = store.list_pending(owner)?;
    if reminders.is_empty() {
        println!("No pending reminders for {}", owner);
        return Ok(());
    }

    for reminder in reminders {
        println!(
            "#{} {} - {}",
            reminder.id,
            reminder.text,
            reminder
                .due_at
                .with_timezone(&config.timezone)
                .format("%a %d %b %H:%M")
        );
    }
    Ok(())
}

fn cmd_run(config: &Config, store: &ReminderStore) -> Result<()> {
    info!(
        "nudge-assistant dispatcher starting (tick every {}s, digest at {:02}:00 {})",
        config.tick_interval_secs, config.digest_hour, config.timezone
    );

    let notifier = notify::from_config(config);
    let dispatcher = NudgeDispatcher::new(store, notifier.as_ref(), config.timezone, config.digest_hour);

    loop {
        match dispatcher.tick(Utc::now()) {
            Ok(summary) if summary.nudges > 0 || summary.digests > 0 => {
                info!("tick: {} nudges, {} digests", summary.nudges, summary.digests);
            }
            Ok(_) => debug!("tick: nothing due"),
            Err(e) => error!("tick failed, will retry next interval: {}", e),
        }

        std::thread::sleep(Duration::from_secs(config.tick_interval_secs));
    }
}
