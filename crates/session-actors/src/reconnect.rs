use std::time::Duration;

use actor_runtime::{spawn_timeout, Mailbox, TimeoutHandle};
use control_protocol::ReconnectStrategy;

use crate::backoff::calculate_retry_delay;
use crate::messages::SessionMessage;

/// What to do after a connection closed while the session is started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Try again after `delay`; `attempt` counts failures since the last success
    Schedule { delay: Duration, attempt: u32 },
    /// The attempt budget is spent
    GiveUp { attempts: u32 },
}

/// Reconnection Policy
///
/// Counts consecutive closures since the last successful handshake, picks
/// the delay for the next attempt and owns the timer that triggers it.
/// Like the watchdog, every schedule carries a generation so a due message
/// queued before the timer was replaced or cancelled is ignored.
#[derive(Debug)]
pub struct ReconnectPolicy {
    strategy: ReconnectStrategy,
    max_attempts: Option<u32>,
    attempts: u32,
    generation: u64,
    timer: Option<TimeoutHandle>,
}

impl ReconnectPolicy {
    pub fn new(strategy: ReconnectStrategy, max_attempts: Option<u32>) -> Self {
        Self {
            strategy,
            max_attempts,
            attempts: 0,
            generation: 0,
            timer: None,
        }
    }

    pub fn decide(&mut self) -> ReconnectDecision {
        if let Some(max) = self.max_attempts {
            if self.attempts >= max {
                return ReconnectDecision::GiveUp {
                    attempts: self.attempts,
                };
            }
        }
        self.attempts = self.attempts.saturating_add(1);
        ReconnectDecision::Schedule {
            delay: calculate_retry_delay(&self.strategy, self.attempts),
            attempt: self.attempts,
        }
    }

    /// Post `ReconnectDue` to the session after `delay`, replacing any
    /// earlier schedule
    pub fn schedule(&mut self, mailbox: &Mailbox<SessionMessage>, delay: Duration) {
        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        self.timer = Some(spawn_timeout(
            mailbox,
            delay,
            SessionMessage::ReconnectDue { generation },
        ));
    }

    /// Consume a delivered `ReconnectDue`.
    ///
    /// False when the schedule was cancelled or replaced meanwhile.
    pub fn take_due(&mut self, generation: u64) -> bool {
        if self.is_scheduled() && generation == self.generation {
            self.timer = None;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self) {
        self.timer = None;
    }

    /// Handshake succeeded: the next closure starts counting from one again
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn is_scheduled(&self) -> bool {
        self.timer.is_some()
    }
}
