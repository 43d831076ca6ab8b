//! Centralized configuration constants for the session actors
//!
//! Values that are part of the wire protocol or of the public configuration
//! defaults live in `control_protocol::config`. This module holds the sizing
//! of the plumbing between the session loop and its helper tasks.
//!
//! **Before changing any constant:** read its documentation comment and
//! rerun the integration tests, which exercise chunking and backpressure.

/// Channel sizing
pub mod channels {
    /// Capacity of the notification channel handed to the embedder
    ///
    /// **Value**: 256 events
    ///
    /// **Rationale**: Notifications are advisory. A burst of responses on a
    /// fast local server produces one event per settled command, so 256
    /// covers a deep queue settling in a single read plus the handful of
    /// connection events around it. When the embedder stops polling the
    /// channel fills and further events are dropped with a warning; the
    /// session loop never waits on an observer.
    ///
    /// **Used in**: client.rs (`Session::spawn_with_sink`)
    pub const EVENT_CAPACITY: usize = 256;
}

/// Socket I/O
pub mod io {
    /// Size of the buffer each read from the control socket fills
    ///
    /// **Value**: 4096 bytes
    ///
    /// **Rationale**: Control responses are short text lines; the largest
    /// routine frame is a `201 OK` clip listing, typically a few hundred
    /// bytes. One page per read keeps latency low and still coalesces a
    /// long listing into a handful of chunks. The framer copes with any
    /// chunk size, so this only affects how often the loop wakes up.
    ///
    /// **Used in**: connection.rs (`read_loop`)
    pub const READ_CHUNK_SIZE: usize = 4096;
}
