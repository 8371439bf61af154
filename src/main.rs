//! Gemini Chat - chatrooms with a simulated assistant
//!
//! A terminal chat client that keeps chatrooms and their histories in local
//! storage and answers every message after a short delay.

mod cli;
mod config;
mod feed;
mod models;
mod registry;
mod store;
mod tui;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use store::{FileStore, MemoryStore, SharedStore};
use tui::log_capture::LogBuffer;

#[derive(Parser)]
#[command(name = "gemini-chat")]
#[command(about = "Terminal chatrooms with a simulated Gemini assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory for chatroom data (overrides the config file)
    #[arg(long, global = true, value_name = "DIR")]
    storage: Option<PathBuf>,

    /// Keep everything in memory; nothing is read from or written to disk.
    /// Only valid for the TUI
    #[arg(long, global = true, conflicts_with = "storage")]
    ephemeral: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List chatrooms
    Rooms {
        /// Only show chatrooms whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Create a chatroom
    Create {
        /// Chatroom name
        name: String,
    },

    /// Delete a chatroom (its history is kept)
    Delete {
        /// Chatroom ID (from `rooms` output)
        id: String,
    },

    /// Read messages from a chatroom
    Read {
        /// Chatroom ID (from `rooms` output)
        id: String,

        /// Number of older pages to load first
        #[arg(short, long, default_value = "0")]
        older: usize,
    },

    /// Send a message and wait for the reply
    Send {
        /// Chatroom ID (from `rooms` output)
        id: String,

        /// Message content
        message: String,
    },

    /// Send an image file and wait for the reply
    Attach {
        /// Chatroom ID (from `rooms` output)
        id: String,

        /// Path to a png, jpg, gif, webp, bmp or svg file
        path: PathBuf,
    },

    /// Launch the terminal user interface (default)
    Tui,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    check_ephemeral(&args)?;
    let command = args.command.unwrap_or(Commands::Tui);
    let is_tui = matches!(command, Commands::Tui);

    // Initialize logging. The TUI owns the terminal, so its logs go to the
    // debug log pane instead of stderr.
    let filter = if args.verbose { "debug" } else { "info" };
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());
    let log_buffer = LogBuffer::new();
    if is_tui {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(log_buffer.clone()),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    let config = Config::load()?;
    let store = open_store(args.storage.as_deref(), args.ephemeral, &config)?;

    match command {
        Commands::Rooms { search } => cli::list_rooms(store, search.as_deref())?,
        Commands::Create { name } => cli::create_room(store, &name)?,
        Commands::Delete { id } => cli::delete_room(store, &id)?,
        Commands::Read { id, older } => cli::read_room(store, &id, older).await?,
        Commands::Send { id, message } => cli::send_text(store, &id, &message).await?,
        Commands::Attach { id, path } => cli::attach_image(store, &id, &path).await?,
        Commands::Tui => tui::run(store, config, log_buffer, !args.ephemeral).await?,
    }

    Ok(())
}

/// One-shot commands start from an empty in-memory store and lose their
/// writes on exit, so `--ephemeral` is only accepted for the TUI.
fn check_ephemeral(args: &Cli) -> Result<()> {
    if args.ephemeral && !matches!(args.command, None | Some(Commands::Tui)) {
        bail!("--ephemeral can only be used with the TUI");
    }
    Ok(())
}

/// Pick the backing store: memory, the `--storage` directory, or the
/// configured one.
fn open_store(storage: Option<&Path>, ephemeral: bool, config: &Config) -> Result<SharedStore> {
    if ephemeral {
        tracing::debug!("Using in-memory storage");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let dir = match storage {
        Some(dir) => dir.to_path_buf(),
        None => config.storage_dir().context("Could not determine storage directory")?,
    };
    let store = FileStore::new(dir);
    tracing::debug!("Using storage directory {}", store.dir().display());
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_ephemeral_allowed_for_tui() {
        assert!(check_ephemeral(&parse(&["gemini-chat", "--ephemeral"])).is_ok());
        assert!(check_ephemeral(&parse(&["gemini-chat", "tui", "--ephemeral"])).is_ok());
        assert!(check_ephemeral(&parse(&["gemini-chat", "rooms"])).is_ok());
    }

    #[test]
    fn test_ephemeral_rejected_for_one_shot_commands() {
        let cases: [&[&str]; 4] = [
            &["gemini-chat", "--ephemeral", "rooms"],
            &["gemini-chat", "create", "Trip", "--ephemeral"],
            &["gemini-chat", "send", "1", "hi", "--ephemeral"],
            &["gemini-chat", "read", "1", "--ephemeral"],
        ];
        for args in cases {
            let err = check_ephemeral(&parse(args)).unwrap_err();
            assert!(err.to_string().contains("--ephemeral"));
        }
    }

    #[test]
    fn test_ephemeral_conflicts_with_storage() {
        let args = ["gemini-chat", "--ephemeral", "--storage", "/tmp/x"];
        assert!(Cli::try_parse_from(args).is_err());
    }
}
