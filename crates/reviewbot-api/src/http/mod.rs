//! HTTP layer: the Telegram webhook receiver and a health check.

pub mod error;
pub mod handlers;
pub mod router;
