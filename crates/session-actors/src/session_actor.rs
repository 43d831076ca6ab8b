use actor_runtime::{
    log_debug, log_error, log_info, log_warn, spawn_timeout, Actor, EventSender, Logger, Mailbox,
    TimeoutHandle,
};
use control_protocol::{
    ActorError, ConnectOutcome, ConnectionState, Response, SessionConfig, SessionError,
    SessionEvent, SessionSnapshot,
};
use framing::{BannerScan, Decoded, Framer, ResponseFramer};
use tokio::net::TcpStream;
use tokio::task::AbortHandle;

use crate::connection::{spawn_connect, Link};
use crate::gate::Gate;
use crate::messages::{Reply, SessionMessage};
use crate::queue::{Command, CommandQueue, Settlement};
use crate::reconnect::{ReconnectDecision, ReconnectPolicy};
use crate::watchdog::Watchdog;

/// Work that must not overlap: at most one runs, the rest wait in the gate
#[derive(Debug)]
enum Sequence {
    /// `None` when the session itself asked (first submit, reconnect timer)
    Connect(Option<Reply<ConnectOutcome>>),
    Disconnect(Reply<()>),
}

impl Sequence {
    fn reject(self, error: SessionError) {
        match self {
            Self::Connect(Some(reply)) => {
                let _ = reply.send(Err(error));
            }
            Self::Connect(None) => {}
            Self::Disconnect(reply) => {
                let _ = reply.send(Err(error));
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SequenceStatus {
    /// Done within the call; the gate can move on
    Finished,
    /// Waiting on the network; the gate stays held
    Running,
}

/// SessionActor owns one control connection and everything riding on it
///
/// Responsibilities:
/// - Drive the connection FSM (see `control_protocol::ConnectionState`)
/// - Serialize connect/disconnect sequences through a single-slot gate
/// - Write queued commands once the handshake banner has been consumed
/// - Pair every inbound frame with the oldest in-flight command
/// - Close the connection when the server goes silent with work in flight
/// - Schedule reconnects after any closure unless stopped by `disconnect()`
///
/// Socket I/O and timers run in helper tasks and report back through the
/// mailbox; this actor is the only place session state changes.
pub struct SessionActor {
    config: SessionConfig,
    logger: Logger,
    mailbox: Mailbox<SessionMessage>,
    events: EventSender<SessionEvent>,

    state: ConnectionState,
    started: bool,

    // Incremented on every connect attempt. Socket and supervision messages
    // carry the epoch they belong to; anything older is stale.
    epoch: u64,
    connector: Option<AbortHandle>,
    link: Option<Link>,
    // Active while Connecting or AwaitingHandshake
    connect_timeout: Option<TimeoutHandle>,
    connect_reply: Option<Reply<ConnectOutcome>>,

    gate: Gate<Sequence>,
    framer: ResponseFramer,
    queue: CommandQueue,
    watchdog: Watchdog,
    reconnect: ReconnectPolicy,

    stopping: bool,
}

impl SessionActor {
    pub fn new(
        config: SessionConfig,
        logger: Logger,
        mailbox: Mailbox<SessionMessage>,
        events: EventSender<SessionEvent>,
    ) -> Self {
        let watchdog = Watchdog::new(config.timeout());
        let reconnect = ReconnectPolicy::new(config.reconnect, config.max_reconnect_attempts);
        Self {
            config,
            logger,
            mailbox,
            events,
            state: ConnectionState::Disconnected,
            started: false,
            epoch: 0,
            connector: None,
            link: None,
            connect_timeout: None,
            connect_reply: None,
            gate: Gate::new(),
            framer: ResponseFramer::new(),
            queue: CommandQueue::new(),
            watchdog,
            reconnect,
            stopping: false,
        }
    }

    /// Non-critical: a full or abandoned event channel never stalls the loop
    fn emit(&mut self, event: SessionEvent) {
        self.events.emit(event);
    }

    /// Attempt to transition to a new state
    ///
    /// Returns Ok if transition is valid, Err otherwise
    fn transition(&mut self, new_state: ConnectionState) -> Result<(), ActorError> {
        if !self.state.can_transition_to(new_state) {
            return Err(ActorError::InvalidTransition(format!(
                "{:?} → {:?}",
                self.state, new_state
            )));
        }

        let old_state = self.state;
        self.state = new_state;

        // Connect supervision only covers the states that wait on the network
        if !new_state.is_connecting() {
            self.connect_timeout = None;
        }

        log_debug!(self.logger, "State: {:?} → {:?}", old_state, new_state);
        self.emit(SessionEvent::StateChanged { state: new_state });
        Ok(())
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            connected: self.state.is_connected(),
            started: self.started,
            pending: self.queue.pending_len(),
            in_flight: self.queue.in_flight_len(),
            errors: self.queue.errors().to_vec(),
            buffered: self.framer.buffered(),
            watchdog_armed: self.watchdog.is_armed(),
            reconnect_scheduled: self.reconnect.is_scheduled(),
        }
    }

    fn handle_submit(&mut self, text: String, reply: Reply<Response>) -> Result<(), ActorError> {
        log_debug!(self.logger, "Queueing command {:?}", text);
        self.queue.push(Command::new(text, reply));

        if self.state.is_connected() {
            self.drain();
        } else if !self.started {
            self.started = true;
            self.request(Sequence::Connect(None))?;
        }
        Ok(())
    }

    fn handle_connect(&mut self, reply: Reply<ConnectOutcome>) -> Result<(), ActorError> {
        self.started = true;
        self.request(Sequence::Connect(Some(reply)))
    }

    fn handle_disconnect(&mut self, reply: Reply<()>) -> Result<(), ActorError> {
        // Stop retrying right away, even if the disconnect itself has to wait
        self.started = false;
        self.reconnect.cancel();
        self.request(Sequence::Disconnect(reply))
    }

    /// Run `sequence` now if the gate is free, otherwise queue it
    fn request(&mut self, sequence: Sequence) -> Result<(), ActorError> {
        let Some(sequence) = self.gate.acquire(sequence) else {
            log_debug!(self.logger, "Sequence queued behind the one in progress");
            return Ok(());
        };
        if self.run_sequence(sequence)? == SequenceStatus::Finished {
            self.release_gate()?;
        }
        Ok(())
    }

    /// Hand the gate to waiting sequences until one has to wait on the network
    fn release_gate(&mut self) -> Result<(), ActorError> {
        let mut next = self.gate.release();
        while let Some(sequence) = next {
            next = match self.run_sequence(sequence)? {
                SequenceStatus::Finished => self.gate.release(),
                SequenceStatus::Running => None,
            };
        }
        Ok(())
    }

    fn run_sequence(&mut self, sequence: Sequence) -> Result<SequenceStatus, ActorError> {
        match sequence {
            Sequence::Connect(reply) => {
                if self.state.is_connected() {
                    log_debug!(self.logger, "Already connected to {}", self.config.endpoint());
                    if let Some(reply) = reply {
                        let _ = reply.send(Ok(ConnectOutcome::AlreadyConnected));
                    }
                    return Ok(SequenceStatus::Finished);
                }
                self.started = true;
                self.begin_connect(reply)?;
                Ok(SequenceStatus::Running)
            }
            Sequence::Disconnect(reply) => {
                self.run_disconnect(reply)?;
                Ok(SequenceStatus::Finished)
            }
        }
    }

    fn begin_connect(&mut self, reply: Option<Reply<ConnectOutcome>>) -> Result<(), ActorError> {
        self.transition(ConnectionState::Connecting)?;
        self.connect_reply = reply;
        self.epoch = self.epoch.wrapping_add(1);
        self.framer.reset();

        log_info!(self.logger, "Connecting to {}", self.config.endpoint());
        self.emit(SessionEvent::StartConnection);

        self.connector = Some(spawn_connect(
            self.config.host.clone(),
            self.config.port,
            self.epoch,
            &self.mailbox,
        ));
        self.connect_timeout = Some(spawn_timeout(
            &self.mailbox,
            self.config.connect_timeout(),
            SessionMessage::ConnectTimeout { epoch: self.epoch },
        ));
        Ok(())
    }

    fn handle_socket_opened(
        &mut self,
        epoch: u64,
        result: Result<TcpStream, String>,
    ) -> Result<(), ActorError> {
        if epoch != self.epoch || self.state != ConnectionState::Connecting {
            // Dropping the stream closes it
            log_debug!(self.logger, "Ignoring socket from stale attempt {}", epoch);
            return Ok(());
        }
        self.connector = None;

        match result {
            Ok(stream) => {
                if let Err(e) = stream.set_nodelay(true) {
                    log_warn!(self.logger, "Failed to set TCP_NODELAY: {}", e);
                }
                self.link = Some(Link::open(stream, epoch, &self.mailbox));
                self.transition(ConnectionState::AwaitingHandshake)?;
                log_debug!(self.logger, "Socket open, waiting for {:?}", self.config.banner);
                Ok(())
            }
            Err(reason) => {
                log_error!(
                    self.logger,
                    "Could not connect to {}: {}",
                    self.config.endpoint(),
                    reason
                );
                self.connection_lost(SessionError::Connection(reason), true)
            }
        }
    }

    async fn handle_data(&mut self, epoch: u64, bytes: Vec<u8>) -> Result<(), ActorError> {
        if epoch != self.epoch || self.link.is_none() {
            log_debug!(self.logger, "Ignoring {} bytes from stale attempt {}", bytes.len(), epoch);
            return Ok(());
        }

        log_debug!(self.logger, "Received {} bytes", bytes.len());
        self.framer.extend(&bytes);

        match self.state {
            ConnectionState::AwaitingHandshake => {
                let scan = self.framer.consume_banner(&self.config.banner);
                match &scan {
                    BannerScan::Pending => return Ok(()),
                    BannerScan::Consumed { skipped } if scan.had_offset() => {
                        log_warn!(
                            self.logger,
                            "Handshake banner found at offset {}, dropped {:?}",
                            skipped.len(),
                            String::from_utf8_lossy(skipped)
                        );
                    }
                    BannerScan::Consumed { .. } => {}
                }
                self.complete_handshake()?;
            }
            ConnectionState::Connected => {
                // Any inbound chunk counts as life, frame or not
                if self.queue.has_in_flight() {
                    self.watchdog.arm(&self.mailbox);
                }
            }
            _ => return Ok(()),
        }

        self.process_frames().await;
        Ok(())
    }

    fn complete_handshake(&mut self) -> Result<(), ActorError> {
        self.transition(ConnectionState::Connected)?;
        log_info!(self.logger, "Connected to {}", self.config.endpoint());

        self.reconnect.reset();
        self.emit(SessionEvent::Connected);
        if let Some(reply) = self.connect_reply.take() {
            let _ = reply.send(Ok(ConnectOutcome::Connected));
        }

        self.drain();
        self.release_gate()
    }

    /// Extract and dispatch every complete frame in the buffer
    async fn process_frames(&mut self) {
        while let Some(decoded) = self.framer.next_frame() {
            match decoded {
                Decoded::Response(response) => self.dispatch(response),
                Decoded::Unrecognized(line) => {
                    log_warn!(self.logger, "Discarding unrecognized line {:?}", line);
                }
            }
            if self.framer.buffered() > 0 {
                tokio::task::yield_now().await;
            }
        }

        if !self.queue.has_in_flight() {
            self.watchdog.cancel();
        }
    }

    fn dispatch(&mut self, response: Response) {
        match self.queue.settle(response) {
            Settlement::Resolved { command, response } => {
                log_debug!(self.logger, "{:?} answered {:?}", command, response.status);
                self.emit(SessionEvent::CommandResponse { command, response });
            }
            Settlement::Rejected { command, status } => {
                log_warn!(self.logger, "Command {:?} failed: {}", command, status);
                self.emit(SessionEvent::CommandError { command, status });
            }
            Settlement::Desync(response) => {
                log_warn!(
                    self.logger,
                    "Response {:?} arrived with no command in flight, discarding",
                    response.status
                );
            }
        }
    }

    /// Write every pending command, oldest first
    fn drain(&mut self) {
        if !self.state.is_connected() {
            return;
        }
        let Some(link) = self.link.as_ref() else {
            return;
        };

        while let Some(command) = self.queue.next_pending() {
            if let Err(e) = link.write_line(command.text()) {
                // The writer reports its own failure as a closed socket
                log_warn!(self.logger, "Cannot write {:?}: {}", command.text(), e);
                self.queue.unsend(command);
                break;
            }
            log_debug!(self.logger, "Sent {:?}", command.text());
            self.queue.mark_in_flight(command);
            self.watchdog.arm_if_idle(&self.mailbox);
        }
    }

    /// Drop the socket and everything tied to it
    fn close_link(&mut self) {
        self.link = None;
        if let Some(connector) = self.connector.take() {
            connector.abort();
        }
        self.connect_timeout = None;
        self.watchdog.cancel();
        self.framer.reset();
    }

    /// Drop the socket and fail everything outstanding with `cause`
    ///
    /// Passes through Closing when a socket existed and always ends in
    /// Disconnected. Notifications are left to the caller. Returns the
    /// number of commands rejected.
    fn teardown(&mut self, cause: &SessionError) -> Result<usize, ActorError> {
        let had_socket = self.state.has_socket();
        if had_socket {
            self.transition(ConnectionState::Closing)?;
        }
        self.close_link();

        let rejected = self.queue.reject_all(cause);
        if let Some(reply) = self.connect_reply.take() {
            let _ = reply.send(Err(cause.clone()));
        }

        if had_socket {
            self.transition(ConnectionState::Disconnected)?;
        }
        Ok(rejected)
    }

    /// No reconnect may follow until the next `connect()` or `submit()`
    fn stop(&mut self) {
        self.started = false;
        self.reconnect.cancel();
    }

    /// Common closure path for socket errors, peer close and timeouts
    fn connection_lost(&mut self, error: SessionError, had_error: bool) -> Result<(), ActorError> {
        if !self.state.has_socket() {
            return Ok(());
        }
        let was_connecting = self.state.is_connecting();

        if had_error {
            log_error!(
                self.logger,
                "Connection to {} closed with error: {}",
                self.config.endpoint(),
                error
            );
        } else {
            log_info!(self.logger, "Connection to {} closed", self.config.endpoint());
        }

        let decision = self.started.then(|| self.reconnect.decide());
        let cause = match decision {
            Some(ReconnectDecision::GiveUp { attempts }) => SessionError::RetriesExhausted(attempts),
            _ => error.clone(),
        };

        let rejected = self.teardown(&cause)?;
        if rejected > 0 {
            log_warn!(self.logger, "Rejected {} outstanding commands: {}", rejected, cause);
        }
        if had_error {
            self.emit(SessionEvent::ConnectionError {
                message: error.to_string(),
            });
        }
        self.emit(SessionEvent::Disconnected);

        match decision {
            Some(ReconnectDecision::Schedule { delay, attempt }) => {
                log_info!(self.logger, "Reconnecting in {:?} (attempt {})", delay, attempt);
                self.reconnect.schedule(&self.mailbox, delay);
                self.emit(SessionEvent::ReconnectScheduled {
                    delay,
                    attempt,
                    had_error,
                });
            }
            Some(ReconnectDecision::GiveUp { attempts }) => {
                log_error!(
                    self.logger,
                    "Giving up on {} after {} reconnect attempts",
                    self.config.endpoint(),
                    attempts
                );
                self.stop();
            }
            None => {}
        }

        if was_connecting {
            self.release_gate()?;
        }
        Ok(())
    }

    fn run_disconnect(&mut self, reply: Reply<()>) -> Result<(), ActorError> {
        self.stop();

        let had_socket = self.state.has_socket();
        if had_socket {
            log_info!(self.logger, "Disconnecting from {}", self.config.endpoint());
        }
        let rejected = self.teardown(&SessionError::Disconnected)?;
        if rejected > 0 {
            log_debug!(self.logger, "Rejected {} outstanding commands on disconnect", rejected);
        }
        if had_socket {
            log_info!(self.logger, "Disconnected from {}", self.config.endpoint());
            self.emit(SessionEvent::Disconnected);
        }

        let _ = reply.send(Ok(()));
        Ok(())
    }

    fn handle_socket_closed(&mut self, epoch: u64, error: Option<String>) -> Result<(), ActorError> {
        if epoch != self.epoch || self.link.is_none() {
            return Ok(());
        }
        match error {
            None => self.connection_lost(SessionError::ConnectionClosed, false),
            Some(reason) => self.connection_lost(SessionError::Connection(reason), true),
        }
    }

    fn handle_watchdog(&mut self, generation: u64) -> Result<(), ActorError> {
        if !self.watchdog.expire(generation) {
            log_debug!(self.logger, "Ignoring stale watchdog expiry {}", generation);
            return Ok(());
        }
        if !self.state.is_connected() || !self.queue.has_in_flight() {
            return Ok(());
        }

        let after = self.watchdog.window();
        log_error!(self.logger, "Server connection timed out: no data for {:?}", after);
        self.emit(SessionEvent::Timeout { after });
        self.connection_lost(SessionError::Timeout(after), true)
    }

    fn handle_connect_timeout(&mut self, epoch: u64) -> Result<(), ActorError> {
        if epoch != self.epoch || !self.state.is_connecting() {
            return Ok(());
        }

        let after = self.config.connect_timeout();
        log_error!(
            self.logger,
            "No handshake from {} within {:?} ({})",
            self.config.endpoint(),
            after,
            self.state
        );
        self.connection_lost(SessionError::HandshakeTimeout(after), true)
    }

    fn handle_reconnect_due(&mut self, generation: u64) -> Result<(), ActorError> {
        if !self.reconnect.take_due(generation) {
            log_debug!(self.logger, "Ignoring stale reconnect timer {}", generation);
            return Ok(());
        }
        if !self.started || self.state != ConnectionState::Disconnected {
            log_debug!(self.logger, "Reconnect no longer needed in state {:?}", self.state);
            return Ok(());
        }
        self.request(Sequence::Connect(None))
    }
}

impl Actor for SessionActor {
    type Message = SessionMessage;

    fn name(&self) -> &'static str {
        "SessionActor"
    }

    fn logger(&self) -> &Logger {
        &self.logger
    }

    async fn handle(&mut self, msg: SessionMessage) -> Result<(), ActorError> {
        match msg {
            SessionMessage::Submit { text, reply } => self.handle_submit(text, reply),
            SessionMessage::Connect { reply } => self.handle_connect(reply),
            SessionMessage::Disconnect { reply } => self.handle_disconnect(reply),
            SessionMessage::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
                Ok(())
            }
            SessionMessage::SocketOpened { epoch, result } => {
                self.handle_socket_opened(epoch, result)
            }
            SessionMessage::Data { epoch, bytes } => self.handle_data(epoch, bytes).await,
            SessionMessage::SocketClosed { epoch, error } => self.handle_socket_closed(epoch, error),
            SessionMessage::WatchdogFired { generation } => self.handle_watchdog(generation),
            SessionMessage::ConnectTimeout { epoch } => self.handle_connect_timeout(epoch),
            SessionMessage::ReconnectDue { generation } => self.handle_reconnect_due(generation),
            SessionMessage::Shutdown => {
                self.stopping = true;
                Ok(())
            }
        }
    }

    fn should_stop(&self) -> bool {
        self.stopping
    }

    async fn shutdown(&mut self) {
        self.stop();

        let had_socket = self.state.has_socket();
        let rejected = match self.teardown(&SessionError::SessionClosed) {
            Ok(rejected) => rejected,
            Err(e) => {
                log_error!(self.logger, "Teardown on shutdown failed: {}", e);
                0
            }
        };
        if had_socket {
            self.emit(SessionEvent::Disconnected);
        }
        for sequence in self.gate.close() {
            sequence.reject(SessionError::SessionClosed);
        }

        log_info!(self.logger, "Session closed, {} commands abandoned", rejected);
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::constants::channels::EVENT_CAPACITY;
    use actor_runtime::{event_channel, mailbox, Level, RecordingSink};
    use control_protocol::ReconnectStrategy;
    use futures::stream::StreamExt;
    use futures_channel::{mpsc, oneshot};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    struct Harness {
        actor: SessionActor,
        rx: mpsc::UnboundedReceiver<SessionMessage>,
        events: mpsc::Receiver<SessionEvent>,
        sink: Arc<RecordingSink>,
    }

    impl Harness {
        fn new(config: SessionConfig) -> Self {
            let sink = Arc::new(RecordingSink::default());
            let logger = Logger::new(sink.clone());
            let (mailbox, rx) = mailbox();
            let (events_tx, events) = event_channel(EVENT_CAPACITY, logger.clone());
            Self {
                actor: SessionActor::new(config, logger, mailbox, events_tx),
                rx,
                events,
                sink,
            }
        }

        async fn send(&mut self, msg: SessionMessage) {
            self.actor.handle(msg).await.unwrap();
        }

        /// Feed bytes as if the reader task had delivered them
        async fn feed(&mut self, bytes: &[u8]) {
            let epoch = self.actor.epoch;
            self.send(SessionMessage::Data {
                epoch,
                bytes: bytes.to_vec(),
            })
            .await;
        }

        /// Wait for the connector task and hand its result to the actor
        async fn deliver_socket(&mut self) {
            loop {
                let msg = self.rx.next().await.unwrap();
                if matches!(msg, SessionMessage::SocketOpened { .. }) {
                    self.send(msg).await;
                    return;
                }
            }
        }

        fn events(&mut self) -> Vec<SessionEvent> {
            std::iter::from_fn(|| self.events.try_next().ok().flatten()).collect()
        }
    }

    type Outcome<T> = oneshot::Receiver<Result<T, SessionError>>;

    fn submit(text: &str) -> (SessionMessage, Outcome<Response>) {
        let (reply, rx) = oneshot::channel();
        (
            SessionMessage::Submit {
                text: text.into(),
                reply,
            },
            rx,
        )
    }

    fn connect() -> (SessionMessage, Outcome<ConnectOutcome>) {
        let (reply, rx) = oneshot::channel();
        (SessionMessage::Connect { reply }, rx)
    }

    fn disconnect() -> (SessionMessage, Outcome<()>) {
        let (reply, rx) = oneshot::channel();
        (SessionMessage::Disconnect { reply }, rx)
    }

    fn settled<T>(rx: &mut Outcome<T>) -> Option<Result<T, SessionError>> {
        rx.try_recv().unwrap()
    }

    /// A harness that has consumed the banner, plus the server side socket
    async fn connected() -> (Harness, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut h = Harness::new(SessionConfig::new("127.0.0.1", port));

        let (msg, mut outcome) = connect();
        h.send(msg).await;
        h.deliver_socket().await;
        let (server, _) = listener.accept().await.unwrap();
        h.feed(b"100 VTR Ready\r\n").await;

        assert_eq!(settled(&mut outcome), Some(Ok(ConnectOutcome::Connected)));
        (h, server)
    }

    async fn read_exact(server: &mut TcpStream, len: usize) -> String {
        let mut buf = vec![0u8; len];
        server.read_exact(&mut buf).await.unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn test_initial_state() {
        let h = Harness::new(SessionConfig::default());
        let snapshot = h.actor.snapshot();
        assert_eq!(snapshot.state, ConnectionState::Disconnected);
        assert!(!snapshot.connected);
        assert!(!snapshot.started);
        assert_eq!(snapshot.pending, 0);
    }

    #[tokio::test]
    async fn test_first_submit_starts_connecting() {
        let mut h = Harness::new(SessionConfig::new("127.0.0.1", 9));
        let (msg, _outcome) = submit("uls");
        h.send(msg).await;

        let snapshot = h.actor.snapshot();
        assert_eq!(snapshot.state, ConnectionState::Connecting);
        assert!(snapshot.started);
        assert_eq!(snapshot.pending, 1);
        assert!(h.actor.gate.is_held());

        let events = h.events();
        assert_eq!(
            events,
            vec![
                SessionEvent::StateChanged {
                    state: ConnectionState::Connecting
                },
                SessionEvent::StartConnection,
            ]
        );
    }

    #[tokio::test]
    async fn test_handshake_then_already_connected() {
        let (mut h, _server) = connected().await;
        assert!(h.actor.snapshot().connected);
        assert!(!h.actor.gate.is_held());

        let (msg, mut outcome) = connect();
        h.send(msg).await;
        assert_eq!(
            settled(&mut outcome),
            Some(Ok(ConnectOutcome::AlreadyConnected))
        );
    }

    #[tokio::test]
    async fn test_commands_written_in_order_and_paired_across_chunks() {
        let (mut h, mut server) = connected().await;

        let (load, mut first) = submit("load u0 a.mp4");
        let (play, mut second) = submit("play u0");
        h.send(load).await;
        h.send(play).await;

        assert_eq!(
            read_exact(&mut server, 24).await,
            "load u0 a.mp4\r\nplay u0\r\n"
        );
        assert_eq!(h.actor.snapshot().in_flight, 2);
        assert!(h.actor.watchdog.is_armed());

        h.feed(b"200 OK\r\n20").await;
        assert_eq!(settled(&mut first).unwrap().unwrap().to_string(), "200 OK");
        assert!(settled(&mut second).is_none());
        assert!(h.actor.watchdog.is_armed());

        h.feed(b"0 OK\r\n").await;
        assert_eq!(settled(&mut second).unwrap().unwrap().status, "200 OK");
        assert!(!h.actor.watchdog.is_armed());
    }

    #[tokio::test]
    async fn test_error_frame_rejects_and_records() {
        let (mut h, _server) = connected().await;
        let (msg, mut outcome) = submit("no_such_command");
        h.send(msg).await;
        h.feed(b"400 Unknown command\r\n").await;

        let err = settled(&mut outcome).unwrap().unwrap_err();
        assert_eq!(err, SessionError::Command("400 Unknown command".into()));
        assert_eq!(h.actor.snapshot().errors, vec!["400 Unknown command"]);
        assert!(h.events().contains(&SessionEvent::CommandError {
            command: "no_such_command".into(),
            status: "400 Unknown command".into(),
        }));
    }

    #[tokio::test]
    async fn test_frame_without_command_warns() {
        let (mut h, _server) = connected().await;
        h.feed(b"200 OK\r\n").await;
        assert_eq!(h.sink.count(Level::Warn, "no command in flight"), 1);
        assert!(h.actor.snapshot().errors.is_empty());
    }

    #[tokio::test]
    async fn test_unrecognized_line_is_discarded() {
        let (mut h, _server) = connected().await;
        let (msg, mut outcome) = submit("usta u0");
        h.send(msg).await;
        h.feed(b"garbage\r\n202 OK\r\n0 U0 playing\r\n").await;

        assert!(h.sink.contains("Discarding unrecognized line \"garbage\""));
        assert_eq!(
            settled(&mut outcome).unwrap().unwrap().body,
            vec!["0 U0 playing"]
        );
    }

    #[tokio::test]
    async fn test_banner_offset_is_tolerated() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut h = Harness::new(SessionConfig::new("127.0.0.1", port));

        let (msg, mut outcome) = connect();
        h.send(msg).await;
        h.deliver_socket().await;
        h.feed(b"junk\r\n100 VTR").await;
        assert_eq!(h.actor.state, ConnectionState::AwaitingHandshake);
        h.feed(b" Ready\r\n").await;

        assert_eq!(settled(&mut outcome), Some(Ok(ConnectOutcome::Connected)));
        assert_eq!(h.sink.count(Level::Warn, "Handshake banner found at offset 6"), 1);
    }

    #[tokio::test]
    async fn test_banner_at_start_logs_no_offset() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut h = Harness::new(SessionConfig::new("127.0.0.1", port));

        let (msg, mut outcome) = connect();
        h.send(msg).await;
        h.deliver_socket().await;
        h.feed(b"100 VTR Ready\r\n").await;

        assert_eq!(settled(&mut outcome), Some(Ok(ConnectOutcome::Connected)));
        assert_eq!(h.sink.count(Level::Warn, "Handshake banner found at offset"), 0);
    }

    #[tokio::test]
    async fn test_stale_data_is_ignored() {
        let (mut h, _server) = connected().await;
        let (msg, mut outcome) = submit("uls");
        h.send(msg).await;

        let stale = h.actor.epoch - 1;
        h.send(SessionMessage::Data {
            epoch: stale,
            bytes: b"200 OK\r\n".to_vec(),
        })
        .await;
        assert!(settled(&mut outcome).is_none());
        assert_eq!(h.actor.snapshot().in_flight, 1);
    }

    #[tokio::test]
    async fn test_watchdog_expiry_rejects_and_schedules_reconnect() {
        let (mut h, _server) = connected().await;
        let (first, mut flying) = submit("play u0");
        h.send(first).await;
        // Both commands go out at once; the write does not rearm the deadline
        let (second, mut also_flying) = submit("stop u0");
        h.send(second).await;

        let generation = h.actor.watchdog.generation;
        h.send(SessionMessage::WatchdogFired {
            generation: generation.wrapping_sub(1),
        })
        .await;
        assert!(h.actor.snapshot().connected, "stale expiry must be ignored");

        h.events();
        h.send(SessionMessage::WatchdogFired { generation }).await;

        let window = Duration::from_millis(2000);
        assert_eq!(
            settled(&mut flying),
            Some(Err(SessionError::Timeout(window)))
        );
        assert_eq!(
            settled(&mut also_flying),
            Some(Err(SessionError::Timeout(window)))
        );

        let snapshot = h.actor.snapshot();
        assert_eq!(snapshot.state, ConnectionState::Disconnected);
        assert!(snapshot.reconnect_scheduled);
        assert!(snapshot.started);

        let events = h.events();
        assert!(events.contains(&SessionEvent::Timeout { after: window }));
        assert!(events.contains(&SessionEvent::ReconnectScheduled {
            delay: Duration::from_millis(500),
            attempt: 1,
            had_error: true,
        }));
    }

    #[tokio::test]
    async fn test_disconnect_rejects_everything_and_stops() {
        let (mut h, _server) = connected().await;
        let (msg, mut outcome) = submit("uls");
        h.send(msg).await;

        let (msg, mut done) = disconnect();
        h.send(msg).await;

        assert_eq!(settled(&mut done), Some(Ok(())));
        assert_eq!(settled(&mut outcome), Some(Err(SessionError::Disconnected)));

        let snapshot = h.actor.snapshot();
        assert!(!snapshot.connected);
        assert!(!snapshot.started);
        assert!(!snapshot.reconnect_scheduled);
        assert!(h.events().contains(&SessionEvent::Disconnected));
    }

    #[tokio::test]
    async fn test_disconnect_waits_for_running_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut h = Harness::new(SessionConfig::new("127.0.0.1", port));

        let (msg, mut connecting) = connect();
        h.send(msg).await;
        let (msg, mut second_connect) = connect();
        h.send(msg).await;
        let (msg, mut done) = disconnect();
        h.send(msg).await;
        assert_eq!(h.actor.gate.waiting(), 2);
        assert!(settled(&mut done).is_none());

        h.deliver_socket().await;
        h.feed(b"100 VTR Ready\r\n").await;

        // The gate ran the queued sequences in arrival order
        assert_eq!(settled(&mut connecting), Some(Ok(ConnectOutcome::Connected)));
        assert_eq!(
            settled(&mut second_connect),
            Some(Ok(ConnectOutcome::AlreadyConnected))
        );
        assert_eq!(settled(&mut done), Some(Ok(())));
        assert_eq!(h.actor.state, ConnectionState::Disconnected);
        assert!(!h.actor.gate.is_held());
    }

    #[tokio::test]
    async fn test_refused_connect_rejects_and_retries() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut h = Harness::new(SessionConfig::new("127.0.0.1", port));

        let (msg, mut outcome) = connect();
        h.send(msg).await;
        h.deliver_socket().await;

        assert!(matches!(
            settled(&mut outcome),
            Some(Err(SessionError::Connection(_)))
        ));
        assert!(!h.actor.gate.is_held());
        assert!(h.actor.reconnect.is_scheduled());
        assert!(h
            .events()
            .iter()
            .any(|e| matches!(e, SessionEvent::ConnectionError { .. })));
    }

    #[tokio::test]
    async fn test_retry_budget_exhausted() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = SessionConfig::new("127.0.0.1", port)
            .with_reconnect(ReconnectStrategy::Fixed { delay_ms: 10 })
            .with_max_reconnect_attempts(0);
        let mut h = Harness::new(config);

        let (msg, mut outcome) = submit("uls");
        h.send(msg).await;
        h.deliver_socket().await;

        assert_eq!(
            settled(&mut outcome),
            Some(Err(SessionError::RetriesExhausted(0)))
        );
        let snapshot = h.actor.snapshot();
        assert!(!snapshot.started);
        assert!(!snapshot.reconnect_scheduled);
        assert!(h.sink.contains("Giving up"));
    }

    #[tokio::test]
    async fn test_peer_close_is_not_an_error() {
        let (mut h, _server) = connected().await;
        h.events();
        let epoch = h.actor.epoch;
        h.send(SessionMessage::SocketClosed { epoch, error: None })
            .await;

        let events = h.events();
        assert!(!events
            .iter()
            .any(|e| matches!(e, SessionEvent::ConnectionError { .. })));
        assert!(events.contains(&SessionEvent::ReconnectScheduled {
            delay: Duration::from_millis(500),
            attempt: 1,
            had_error: false,
        }));
    }

    #[tokio::test]
    async fn test_reconnect_due_ignored_after_disconnect() {
        let mut h = Harness::new(SessionConfig::new("127.0.0.1", 9));
        h.send(SessionMessage::ReconnectDue { generation: 1 }).await;
        assert_eq!(h.actor.state, ConnectionState::Disconnected);
        assert!(!h.actor.gate.is_held());
    }

    #[tokio::test]
    async fn test_shutdown_rejects_outstanding_work() {
        let mut h = Harness::new(SessionConfig::new("127.0.0.1", 9));
        let (msg, mut outcome) = submit("uls");
        h.send(msg).await;
        let (msg, mut queued) = connect();
        h.send(msg).await;

        h.send(SessionMessage::Shutdown).await;
        assert!(h.actor.should_stop());
        h.actor.shutdown().await;

        assert_eq!(settled(&mut outcome), Some(Err(SessionError::SessionClosed)));
        assert_eq!(settled(&mut queued), Some(Err(SessionError::SessionClosed)));
    }
}
