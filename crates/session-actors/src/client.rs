use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use actor_runtime::{event_channel, log_info, mailbox, Actor, LogSink, Logger, Mailbox};
use control_protocol::{
    ConfigError, ConnectOutcome, Response, SessionConfig, SessionError, SessionEvent,
    SessionSnapshot,
};
use futures_channel::{mpsc, oneshot};

use crate::constants::channels::EVENT_CAPACITY;
use crate::messages::SessionMessage;
use crate::session_actor::SessionActor;

/// Resolves once the session loop settles a request
///
/// If the loop is gone before it answers, resolves to
/// [`SessionError::SessionClosed`].
#[must_use = "futures do nothing unless polled"]
#[derive(Debug)]
pub struct ReplyFuture<T> {
    rx: oneshot::Receiver<Result<T, SessionError>>,
}

impl<T> Future for ReplyFuture<T> {
    type Output = Result<T, SessionError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(SessionError::SessionClosed)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Sends `Shutdown` when the last [`Session`] clone goes away
struct ShutdownGuard {
    mailbox: Mailbox<SessionMessage>,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        // Loop already gone is fine
        let _ = self.mailbox.send(SessionMessage::Shutdown);
    }
}

/// Handle to one running control session
///
/// Cheap to clone. Every method returns immediately; results arrive through
/// the returned futures. The session loop keeps running until the last
/// clone is dropped, at which point outstanding commands are rejected with
/// [`SessionError::SessionClosed`] and the socket is closed.
///
/// # Example
///
/// ```ignore
/// let (session, mut events) = Session::spawn(SessionConfig::new("localhost", 5250))?;
/// let listing = session.submit("list u0").await?;
/// for clip in &listing.body {
///     println!("{clip}");
/// }
/// ```
#[derive(Clone)]
pub struct Session {
    mailbox: Mailbox<SessionMessage>,
    instance: u64,
    _guard: Arc<ShutdownGuard>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("instance", &self.instance)
            .finish()
    }
}

impl Session {
    /// Start a session that logs through `tracing`
    ///
    /// Must be called from within a tokio runtime. Nothing touches the
    /// network until the first `submit()` or `connect()`.
    pub fn spawn(
        config: SessionConfig,
    ) -> Result<(Self, mpsc::Receiver<SessionEvent>), ConfigError> {
        Self::spawn_with_logger(config, Logger::tracing())
    }

    /// Start a session that logs through `sink`
    pub fn spawn_with_sink(
        config: SessionConfig,
        sink: Arc<dyn LogSink>,
    ) -> Result<(Self, mpsc::Receiver<SessionEvent>), ConfigError> {
        Self::spawn_with_logger(config, Logger::new(sink))
    }

    fn spawn_with_logger(
        config: SessionConfig,
        logger: Logger,
    ) -> Result<(Self, mpsc::Receiver<SessionEvent>), ConfigError> {
        config.validate()?;

        let (mailbox, rx) = mailbox();
        let (events, events_rx) = event_channel(EVENT_CAPACITY, logger.clone());
        let instance = logger.instance();

        log_info!(logger, "Session for {} created", config.endpoint());
        let actor = SessionActor::new(config, logger, mailbox.clone(), events);
        tokio::spawn(actor.run(rx));

        let session = Self {
            mailbox: mailbox.clone(),
            instance,
            _guard: Arc::new(ShutdownGuard { mailbox }),
        };
        Ok((session, events_rx))
    }

    /// Number that prefixes this session's log lines
    pub fn instance(&self) -> u64 {
        self.instance
    }

    fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, SessionError>>) -> SessionMessage,
    ) -> ReplyFuture<T> {
        let (tx, rx) = oneshot::channel();
        // On failure the message, and with it `tx`, is dropped: the future
        // then resolves to SessionClosed
        let _ = self.mailbox.send(build(tx));
        ReplyFuture { rx }
    }

    /// Queue a command line (without terminator)
    ///
    /// Never blocks and never fails up front. Starts connecting if the
    /// session has not been started. The future resolves with the response
    /// frame, or rejects with the error status line or the fatal error that
    /// ended the connection.
    pub fn submit(&self, text: impl Into<String>) -> ReplyFuture<Response> {
        let text = text.into();
        self.request(|reply| SessionMessage::Submit { text, reply })
    }

    /// Open the connection and wait for the handshake banner
    ///
    /// Resolves with [`ConnectOutcome::AlreadyConnected`] when there is
    /// nothing to do. Marks the session started, so later closures are
    /// followed by reconnect attempts.
    pub fn connect(&self) -> ReplyFuture<ConnectOutcome> {
        self.request(|reply| SessionMessage::Connect { reply })
    }

    /// Close the connection and reject everything outstanding with
    /// [`SessionError::Disconnected`]. No reconnect follows until the next
    /// `connect()` or `submit()`.
    pub fn disconnect(&self) -> ReplyFuture<()> {
        self.request(|reply| SessionMessage::Disconnect { reply })
    }

    /// Point-in-time view of the session
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.mailbox
            .send(SessionMessage::Snapshot { reply })
            .map_err(|_| SessionError::SessionClosed)?;
        rx.await.map_err(|_| SessionError::SessionClosed)
    }
}
