//! CLI definitions for the `reviewbot` binary.
//!
//! Uses clap derive macros. Global flags select config, token and log
//! verbosity; subcommands pick how updates arrive (long polling or webhook).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Collect customer reviews over Telegram.
#[derive(Parser)]
#[command(name = "reviewbot", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (defaults to `config.toml` in the data directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Telegram bot token.
    #[arg(long, global = true, env = "REVIEWBOT_TELEGRAM_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to stdout via OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Receive updates by long polling `getUpdates`.
    Poll,

    /// Receive updates on an HTTP webhook.
    Serve {
        /// Host to bind to (overrides config).
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config).
        #[arg(long)]
        port: Option<u16>,
    },

    /// Manage the Telegram webhook registration.
    Webhook {
        #[command(subcommand)]
        action: WebhookCommand,
    },
}

#[derive(Subcommand)]
pub enum WebhookCommand {
    /// Point Telegram at a public webhook URL.
    Set {
        /// Public HTTPS URL ending in `/telegram/webhook`.
        url: String,
    },

    /// Show the current webhook registration.
    Info,

    /// Remove the webhook (required before `poll`).
    Delete,
}
