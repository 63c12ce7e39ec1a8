//! Shared domain types for the review bot.
//!
//! This crate contains the types passed between the session core, the
//! storage layer and the chat transport adapter: per-user session state,
//! inbound events, outbound replies, review records, configuration and the
//! associated error types.
//!
//! Zero infrastructure dependencies -- only serde and thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod reply;
pub mod review;
pub mod session;
