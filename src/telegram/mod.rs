//! Telegram Bot API transport: wire types, an HTTP client and the long-poll
//! loop that feeds chat events to the session registry.

pub mod client;
pub mod poller;
pub mod types;

pub use client::TelegramClient;
pub use poller::run_poller;
