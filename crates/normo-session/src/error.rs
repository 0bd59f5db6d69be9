//! Error types for normo-session
//!
//! Every gateway failure is collapsed into one fixed, user-facing message per
//! operation. The underlying gateway error stays reachable through `source()`.

use thiserror::Error;

/// Result type alias using normo-session Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by session operations
#[derive(Error, Debug)]
pub enum Error {
    /// Creating a conversation failed
    #[error("Failed to create new conversation")]
    CreateConversation(#[source] normo_api::Error),

    /// Loading a conversation failed
    #[error("Failed to load conversation")]
    LoadConversation(#[source] normo_api::Error),

    /// Sending a message failed
    #[error("Failed to send message")]
    SendMessage(#[source] normo_api::Error),
}

impl Error {
    /// The gateway error behind this failure
    pub fn gateway_error(&self) -> &normo_api::Error {
        match self {
            Error::CreateConversation(e) | Error::LoadConversation(e) | Error::SendMessage(e) => e,
        }
    }
}
