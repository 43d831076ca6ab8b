//! Error Handling Guidelines
//!
//! Two error families live here:
//!
//! 1. [`SessionError`] is what callers of the session see: a rejected command
//!    future, a failed connect, a torn-down session. It is `Clone` because a
//!    single fatal cause rejects every outstanding command.
//! 2. [`ActorError`] describes faults inside the session loop itself (an
//!    impossible state transition, a closed channel). These are logged by the
//!    actor runtime and never reach a caller directly.
//!
//! Messages state what failed and, when known, why:
//! - ✅ "Connection error: Connection refused (os error 111)"
//! - ❌ "Error" (too vague)

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced to callers of the session API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The server answered the command with a `4xx`/`5xx` status line.
    ///
    /// Displays as the bare status line, e.g. `400 Unknown command`.
    #[error("{0}")]
    Command(String),

    /// The command was outstanding when `disconnect()` tore the session down
    #[error("Server Disconnected")]
    Disconnected,

    /// Socket-level failure (connect refused, reset, write error)
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server closed the connection while commands were outstanding
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// No byte arrived within the response timeout while commands were in flight
    #[error("Server connection timed out: no data for {0:?}")]
    Timeout(Duration),

    /// The socket opened but the handshake banner never arrived
    #[error("Handshake not completed within {0:?}")]
    HandshakeTimeout(Duration),

    /// The reconnection policy gave up after the configured number of attempts
    #[error("Reconnection abandoned after {0} attempts")]
    RetriesExhausted(u32),

    /// The session loop has shut down; no further work is possible
    #[error("Session closed")]
    SessionClosed,
}

/// Unified error type for actor operations
#[derive(Error, Debug, Clone)]
pub enum ActorError {
    /// State transition was rejected
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    /// Communication channel closed
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(String),
}
