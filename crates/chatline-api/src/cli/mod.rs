//! CLI command definitions for the `chatline` binary.
//!
//! `serve` runs the HTTP API; `conversations` and `messages` read the store
//! directly for inspection.

pub mod conversation;
pub mod message;

use clap::{Parser, Subcommand};

use chatline_types::config::{GlobalConfig, StorageBackend};

/// Chat API backend with persistent conversation history.
#[derive(Parser)]
#[command(name = "chatline", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "CHATLINE_LOG_JSON")]
    pub log_json: bool,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, global = true, env = "CHATLINE_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Host to bind to [default: from config.toml, else 127.0.0.1].
        #[arg(long, env = "CHATLINE_HOST")]
        host: Option<String>,

        /// Port to listen on [default: from config.toml, else 5000].
        #[arg(short, long, env = "CHATLINE_PORT")]
        port: Option<u16>,

        /// Keep conversations in memory only (lost on exit).
        #[arg(long)]
        memory: bool,
    },

    /// List a user's conversations, most recent first.
    #[command(alias = "ls")]
    Conversations {
        /// User id to list conversations for.
        #[arg(long)]
        user: i64,
    },

    /// Show the messages of a conversation.
    Messages {
        /// Conversation id.
        #[arg(long)]
        conversation: i64,
    },
}

impl Commands {
    /// Fold command-line overrides into the loaded configuration.
    pub fn apply_overrides(&self, config: &mut GlobalConfig) {
        if let Commands::Serve { host, port, memory } = self {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
            if *memory {
                config.storage.backend = StorageBackend::Memory;
            }
        }
    }
}
