//! Error types for interactive sessions.

use threadcard_core::{ThreadcardError, UserId};
use threadcard_store::StoreError;

use crate::form::FormError;

/// Errors from the chat platform collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat transport error: {0}")]
    Transport(String),
    #[error("unknown channel: {0}")]
    UnknownChannel(String),
}

impl From<ChatError> for ThreadcardError {
    fn from(err: ChatError) -> Self {
        ThreadcardError::Chat(err.to_string())
    }
}

/// Errors that end (or interrupt) an interactive flow.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no response before the step deadline")]
    Timeout,
    #[error("user {0} does not own this session")]
    NotOwner(UserId),
    #[error("invalid session transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl From<ThreadcardError> for SessionError {
    fn from(err: ThreadcardError) -> Self {
        SessionError::Unexpected(err.to_string())
    }
}

impl SessionError {
    /// The notice shown to the user for this error.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Timeout => "⌛ Time is up. The operation was cancelled.".to_string(),
            SessionError::NotOwner(_) => {
                "You cannot interact with another person's menu.".to_string()
            }
            SessionError::Validation(message) => format!("❌ {}", message),
            SessionError::Store(err) => format!("❌ Record store error: {}", err),
            SessionError::Form(err) => format!("❌ {}", err),
            SessionError::InvalidTransition { .. }
            | SessionError::Chat(_)
            | SessionError::Unexpected(_) => "🔴 An unexpected error occurred.".to_string(),
        }
    }
}
