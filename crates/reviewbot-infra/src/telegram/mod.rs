//! Telegram Bot API adapter.
//!
//! - `client` -- `TelegramTransport`, the production `Transport`
//! - `poller` -- `UpdatePoller`, the long-polling update source
//! - `render` -- reply templates and keyboards
//! - `types` -- wire types and `Update` -> `InboundEvent` conversion

pub mod client;
pub mod poller;
pub mod render;
pub mod types;

pub use client::TelegramTransport;
pub use poller::UpdatePoller;
pub use types::Update;
