use control_protocol::ActorError;
use futures_channel::mpsc;

use crate::log_warn;
use crate::logging::Logger;

/// Sending side of an actor's mailbox
///
/// Mailboxes are unbounded: callers enqueue work without waiting, and the
/// actor drains messages one at a time. Clone is cheap.
pub struct Mailbox<M> {
    tx: mpsc::UnboundedSender<M>,
}

impl<M> Clone for Mailbox<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<M> std::fmt::Debug for Mailbox<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<M> Mailbox<M> {
    pub fn new(tx: mpsc::UnboundedSender<M>) -> Self {
        Self { tx }
    }

    /// Enqueue a message for the actor
    pub fn send(&self, msg: M) -> Result<(), ActorError> {
        self.tx
            .unbounded_send(msg)
            .map_err(|_| ActorError::ChannelClosed("actor mailbox".into()))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Create a mailbox and the receiver to hand to [`Actor::run`](crate::Actor::run)
pub fn mailbox<M>() -> (Mailbox<M>, mpsc::UnboundedReceiver<M>) {
    let (tx, rx) = mpsc::unbounded();
    (Mailbox::new(tx), rx)
}

/// Bounded, lossy event stream from an actor to observers
///
/// An observer that stops polling must never stall the actor, so a full
/// channel drops the event and logs a warning instead of waiting.
pub struct EventSender<E> {
    tx: mpsc::Sender<E>,
    logger: Logger,
}

impl<E: std::fmt::Debug> EventSender<E> {
    /// Publish an event. Returns false when it was dropped.
    pub fn emit(&mut self, event: E) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(e) if e.is_full() => {
                log_warn!(
                    self.logger,
                    "Event channel full, dropping {:?}",
                    e.into_inner()
                );
                false
            }
            // Nobody is listening; events are optional
            Err(_) => false,
        }
    }
}

/// Create an event channel holding at most `capacity` undelivered events
pub fn event_channel<E>(capacity: usize, logger: Logger) -> (EventSender<E>, mpsc::Receiver<E>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender { tx, logger }, rx)
}
