//! Handshake banner detection.
//!
//! Right after accepting a connection the server writes one readiness line.
//! Nothing may be sent until that line has been seen. Bytes that arrive ahead
//! of the banner are tolerated and dropped.

use crate::lines::{self, TERMINATOR};
use crate::response::ResponseFramer;

/// Result of scanning the receive buffer for the banner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BannerScan {
    /// The banner (and everything before it) was removed from the buffer
    Consumed {
        /// Bytes that preceded the banner and were dropped with it
        skipped: Vec<u8>,
    },
    /// The banner has not fully arrived yet; the buffer is untouched
    Pending,
}

impl BannerScan {
    /// Did the banner arrive somewhere other than the start of the stream?
    pub fn had_offset(&self) -> bool {
        matches!(self, Self::Consumed { skipped } if !skipped.is_empty())
    }
}

impl ResponseFramer {
    /// Look for `banner` followed by `\r\n` anywhere in the buffer.
    ///
    /// On a match the buffer keeps only what followed the banner line, so
    /// responses that arrived in the same chunk are not lost.
    pub fn consume_banner(&mut self, banner: &str) -> BannerScan {
        let mut line = Vec::with_capacity(banner.len() + TERMINATOR.len());
        line.extend_from_slice(banner.as_bytes());
        line.extend_from_slice(TERMINATOR);

        let Some(start) = lines::find(&self.buffer, &line, 0) else {
            return BannerScan::Pending;
        };
        let skipped = self.buffer.drain(..start).collect();
        self.buffer.drain(..line.len());
        BannerScan::Consumed { skipped }
    }
}
