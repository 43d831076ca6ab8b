//! Incremental framing for the VTR control protocol.
//!
//! Bytes arrive from the socket in arbitrary chunks. A [`Framer`] accumulates
//! them and hands back complete frames one at a time, leaving any partial
//! tail buffered for the next arrival.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod handshake;
pub mod lines;
pub mod response;

pub use handshake::BannerScan;
pub use response::{Decoded, ResponseFramer};

/// Trait for converting a stream of bytes into discrete frames.
///
/// Unlike a one-shot `push -> Vec<Frame>`, extraction is pulled one frame at
/// a time so the caller can yield to its scheduler between frames.
pub trait Framer: Send {
    type Frame;

    /// Append a chunk read from the transport.
    fn extend(&mut self, bytes: &[u8]);

    /// Remove and return the next complete frame, if the buffer holds one.
    fn next_frame(&mut self) -> Option<Self::Frame>;

    /// Number of bytes currently buffered.
    fn buffered(&self) -> usize;

    /// Reset internal state (e.g., clear buffers).
    fn reset(&mut self);

    /// Get the name of the framer.
    fn name(&self) -> &'static str;
}
