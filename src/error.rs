//! Error types for the chat relay
//!
//! Defines authentication, delivery, application and client errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Credential payload rejected before the password is even compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MalformedCredentials {
    /// Payload did not contain exactly two lines
    #[error("invalid credentials")]
    LineCount,

    /// Username line was blank after trimming
    #[error("username cannot be empty")]
    EmptyUsername,

    /// Password line was blank after trimming
    #[error("password cannot be empty")]
    EmptyPassword,
}

/// Authentication errors
///
/// The display text of each variant is exactly what the rejected client
/// sees after the `error: ` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error(transparent)]
    Malformed(#[from] MalformedCredentials),

    /// Well-formed payload, but the password is not the room secret
    #[error("incorrect password")]
    WrongPassword,
}

impl AuthError {
    pub fn is_malformed(&self) -> bool {
        matches!(self, AuthError::Malformed(_))
    }
}

/// Broadcast delivery errors
///
/// Occurs when a frame cannot be queued for one member during fan-out.
/// Never fatal for the broadcast as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The member's outbox stayed full for the whole delivery timeout
    #[error("outbox full")]
    Backlogged,

    /// The member's writer task has already gone away
    #[error("outbox closed")]
    Disconnected,
}

/// Application-level errors
///
/// Covers fatal server errors (bind, accept) and per-connection
/// failures that end a single session.
#[derive(Debug, Error)]
pub enum AppError {
    /// Listener could not start (fatal)
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Listener failed while running, the serve loop stops
    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    /// Read or write failure on a single connection
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Client failed authentication
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
}

/// Interactive client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Server answered the credentials with an `error:` line
    #[error("server rejected connection: {0}")]
    Rejected(String),

    #[error("unexpected server response: {0}")]
    UnexpectedReply(String),

    #[error("server closed connection")]
    ServerClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Command line errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("expected 5 arguments, got {0}")]
    MissingArguments(usize),

    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("unknown mode '{0}', expected 'server' or 'client'")]
    UnknownMode(String),
}
