/// Supervision utilities for actor operations
///
/// Provides timeout-based supervision so an actor can bound how long it
/// waits on the network. The timer runs as its own task and reports back
/// through the actor's mailbox, which keeps every state change on the
/// actor's timeline.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::AbortHandle;

use crate::channels::Mailbox;

/// Handle to cancel a timeout operation
///
/// When dropped or explicitly cancelled, the timeout task will not send
/// the timeout message, preventing spurious timeouts after operations complete.
pub struct TimeoutHandle {
    cancelled: Arc<AtomicBool>,
    task: AbortHandle,
}

impl TimeoutHandle {
    /// Cancel the timeout, preventing it from firing
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.task.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for TimeoutHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl Drop for TimeoutHandle {
    fn drop(&mut self) {
        // Auto-cancel when handle is dropped
        self.cancel();
    }
}

/// Spawn a timeout task that sends `message` after `after` has elapsed
///
/// Returns a TimeoutHandle that can be used to cancel the timeout. If the handle
/// is dropped or explicitly cancelled before the timeout fires, no message will
/// be sent. A message that was already queued before cancellation is still
/// delivered, so receivers should tag timeouts with a generation and ignore
/// stale ones.
///
/// Must be called from within a tokio runtime.
pub fn spawn_timeout<M: Send + 'static>(
    mailbox: &Mailbox<M>,
    after: Duration,
    message: M,
) -> TimeoutHandle {
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancel_flag = cancelled.clone();
    let mailbox = mailbox.clone();

    let task = tokio::spawn(async move {
        tokio::time::sleep(after).await;

        // Final check before sending timeout message
        if !cancel_flag.load(Ordering::Acquire) {
            // Receiver gone means the actor already stopped
            let _ = mailbox.send(message);
        }
    });

    TimeoutHandle {
        cancelled,
        task: task.abort_handle(),
    }
}
