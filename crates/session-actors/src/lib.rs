//! # Session Actors
//!
//! Client-side session engine for the line-oriented VTR control protocol
//! (Melted and compatible playout servers).
//!
//! ## Components
//!
//! - **SessionActor**: connection FSM, command dispatch and reconnects
//! - **Gate**: single-slot serialization of connect/disconnect sequences
//! - **CommandQueue**: pending and in-flight commands, FIFO pairing
//! - **Watchdog**: response timeout while commands are in flight
//! - **ReconnectPolicy**: delay and attempt budget after a closure
//! - **Session**: the cloneable handle applications hold

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod backoff;
pub mod client;
pub mod connection;
pub mod constants;
pub mod gate;
pub mod messages;
pub mod queue;
pub mod reconnect;
pub mod session_actor;
pub mod watchdog;

pub use client::{ReplyFuture, Session};
pub use messages::SessionMessage;
pub use session_actor::SessionActor;

pub use control_protocol::{
    ConfigError, ConnectOutcome, ConnectionState, ReconnectStrategy, Response, ResponseKind,
    SessionConfig, SessionError, SessionEvent, SessionSnapshot,
};
