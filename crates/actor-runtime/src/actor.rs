use std::future::Future;

use control_protocol::ActorError;
use futures::stream::StreamExt;
use futures_channel::mpsc;

use crate::logging::Logger;
use crate::{log_debug, log_error};

/// Actor trait for implementing message-driven components
///
/// Actors are independent, stateful components that communicate through
/// message passing. Each actor has its own message queue and processes
/// messages sequentially, so every piece of state the actor owns is touched
/// from exactly one timeline.
///
/// # Lifecycle
///
/// 1. **init()** - Called once before message processing starts
/// 2. **handle()** - Called for each received message
/// 3. **shutdown()** - Called when the actor is stopping
///
/// The loop stops when every sender is gone or when
/// [`should_stop`](Actor::should_stop) reports true after a message.
///
/// # Example
///
/// ```ignore
/// struct Echo {
///     logger: Logger,
/// }
///
/// impl Actor for Echo {
///     type Message = String;
///
///     fn name(&self) -> &'static str {
///         "Echo"
///     }
///
///     fn logger(&self) -> &Logger {
///         &self.logger
///     }
///
///     async fn handle(&mut self, msg: Self::Message) -> Result<(), ActorError> {
///         log_info!(self.logger, "echo {}", msg);
///         Ok(())
///     }
/// }
/// ```
///
/// Every future is `Send`, so a running actor can be handed to
/// `tokio::spawn`. Implementors may still write plain `async fn`.
pub trait Actor: Send + 'static {
    /// Message type this actor processes
    type Message: Send + 'static;

    /// Actor name (used for logging and debugging)
    fn name(&self) -> &'static str;

    /// Logger that receives lifecycle lines and handler errors
    fn logger(&self) -> &Logger;

    /// Initialize the actor before processing messages
    fn init(&mut self) -> impl Future<Output = Result<(), ActorError>> + Send {
        async { Ok(()) }
    }

    /// Handle a single message
    fn handle(
        &mut self,
        msg: Self::Message,
    ) -> impl Future<Output = Result<(), ActorError>> + Send;

    /// Clean up before shutdown
    ///
    /// Called when the actor is stopping. Use this to close connections and
    /// settle outstanding work.
    fn shutdown(&mut self) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Checked after each message; returning true ends the run loop
    fn should_stop(&self) -> bool {
        false
    }

    /// Main actor run loop (provided by runtime)
    ///
    /// This method consumes the actor and runs it to completion.
    /// It handles initialization, message processing, and shutdown.
    fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<Self::Message>,
    ) -> impl Future<Output = ()> + Send
    where
        Self: Sized,
    {
        async move {
            if let Err(e) = self.init().await {
                log_error!(self.logger(), "{} init failed: {}", self.name(), e);
                return;
            }

            log_debug!(self.logger(), "{} started", self.name());

            while let Some(msg) = rx.next().await {
                if let Err(e) = self.handle(msg).await {
                    log_error!(self.logger(), "{} error: {}", self.name(), e);
                }
                if self.should_stop() {
                    break;
                }
            }

            self.shutdown().await;

            log_debug!(self.logger(), "{} stopped", self.name());
        }
    }
}
