//! Session lifecycle and dispatch for the review bot.
//!
//! This crate defines the "ports" (store and transport traits) that the
//! infrastructure layer implements, and the per-user session machinery built
//! on top of them. It depends only on `reviewbot-types` -- never on
//! `reviewbot-infra` or any database/IO crate.

pub mod dispatch;
pub mod repository;
pub mod session;
pub mod transport;
