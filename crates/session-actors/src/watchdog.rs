use std::time::Duration;

use actor_runtime::{spawn_timeout, Mailbox, TimeoutHandle};

use crate::messages::SessionMessage;

/// Response timeout: one rearmable deadline per session
///
/// Each arming bumps a generation counter and the timer reports that
/// generation back, so an expiry that was already queued when the watchdog
/// was rearmed or cancelled is recognised as stale.
#[derive(Debug)]
pub struct Watchdog {
    window: Duration,
    pub(crate) generation: u64,
    timer: Option<TimeoutHandle>,
}

impl Watchdog {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            generation: 0,
            timer: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Start a full window from now, replacing any running timer
    pub fn arm(&mut self, mailbox: &Mailbox<SessionMessage>) {
        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        // Replacing the handle drops (and so cancels) the previous timer
        self.timer = Some(spawn_timeout(
            mailbox,
            self.window,
            SessionMessage::WatchdogFired { generation },
        ));
    }

    /// Start a window only if none is running; writes never extend a deadline
    pub fn arm_if_idle(&mut self, mailbox: &Mailbox<SessionMessage>) {
        if !self.is_armed() {
            self.arm(mailbox);
        }
    }

    pub fn cancel(&mut self) {
        self.timer = None;
    }

    /// Accept an expiry if it belongs to the current arming.
    ///
    /// A current expiry disarms the watchdog and returns true.
    pub fn expire(&mut self, generation: u64) -> bool {
        if self.is_armed() && generation == self.generation {
            self.timer = None;
            true
        } else {
            false
        }
    }
}
