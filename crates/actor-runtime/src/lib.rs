//! # Actor Runtime
//!
//! Provides the runtime infrastructure for the session actors.
//!
//! This crate defines:
//! - **Actor trait**: Base trait for all actors with lifecycle methods
//! - **Channels**: Unbounded mailboxes in, bounded lossy event streams out
//! - **Supervision**: Cancellable timers that report back through a mailbox
//! - **Logging**: Injected sinks with a per-instance prefix
//!
//! ## Architecture
//!
//! The actor runtime follows these principles:
//! - **Zero shared state**: Each actor owns its data
//! - **Message passing**: Actors communicate via typed messages
//! - **Sequential processing**: Messages are handled one at a time
//! - **Failure isolation**: Actor errors are logged, never propagated as panics
//!
//! ## Example
//!
//! ```ignore
//! use actor_runtime::{mailbox, Actor};
//!
//! let (mailbox, rx) = mailbox();
//! tokio::spawn(MyActor::new(mailbox.clone()).run(rx));
//! mailbox.send(MyMessage::Start)?;
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod actor;
pub mod channels;
pub mod logging;
pub mod supervision;

pub use actor::Actor;
pub use channels::{event_channel, mailbox, EventSender, Mailbox};
pub use logging::{Level, LogSink, Logger, RecordingSink, TracingSink};
pub use supervision::{spawn_timeout, TimeoutHandle};
