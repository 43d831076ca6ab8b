//! # Control Protocol
//!
//! Type-safe message, state and error definitions for the VTR control
//! session engine.
//!
//! This crate has no dependency on the async runtime or on sockets, which
//! keeps every type here testable in plain unit tests.
//!
//! ## Architecture
//!
//! - **Response**: one decoded server reply (status line plus body)
//! - **SessionEvent**: notifications from the session loop to collaborators
//! - **ConnectionState**: FSM for the control connection (pure logic)
//! - **SessionConfig**: endpoint, timeouts and reconnect policy
//!
//! ## Message Flow
//!
//! ```text
//! caller → submit/connect/disconnect → session loop → socket
//!                                           ↓
//!                                      SessionEvent → collaborators
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod config;
pub mod errors;
pub mod messages;
pub mod response;
pub mod state;

pub use config::{ConfigError, ReconnectStrategy, SessionConfig};
pub use errors::{ActorError, SessionError};
pub use messages::{ConnectOutcome, SessionEvent, SessionSnapshot};
pub use response::{Response, ResponseKind, LINE_TERMINATOR};
pub use state::ConnectionState;
