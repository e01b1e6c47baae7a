//! Session error types.

use std::fmt;

/// Session and sessions-provider errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// `init` called on a session that already went through it
    AlreadyInitialized,
    /// Mutation attempted before `init`
    NotInitialized,
    /// No live session for this client identifier
    NotFound(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::AlreadyInitialized => write!(f, "session already initialized"),
            SessionError::NotInitialized => write!(f, "session not yet initialized"),
            SessionError::NotFound(id) => write!(f, "no session found for key {}", id),
        }
    }
}

impl std::error::Error for SessionError {}
