//! Per-chat conversation handling: the session state machine, its button
//! tokens and reply rendering, and the registry that keeps one session per
//! chat.

pub mod replies;
pub mod service;
pub mod state;
pub mod tokens;

pub use replies::Reply;
pub use service::*;

#[cfg(test)]
pub use replies::Button;
#[cfg(test)]
pub use state::Session;
#[cfg(test)]
pub use tokens::ButtonToken;
