//! Infrastructure layer for the review bot.
//!
//! Contains implementations of the ports defined in `reviewbot-core`:
//! SQLite session and review stores, the Telegram Bot API transport and
//! update poller, and the `config.toml` loader.

pub mod config;
pub mod sqlite;
pub mod telegram;
