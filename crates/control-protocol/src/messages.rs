use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::response::Response;
use crate::state::ConnectionState;

/// How a `connect()` request settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectOutcome {
    /// A new connection was opened and the banner consumed
    Connected,
    /// The session was already connected; nothing was done
    AlreadyConnected,
}

/// Notifications from the session loop to collaborators
///
/// Delivery is best effort: when the notification channel is full the event
/// is dropped and a warning is logged, the session itself never blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// Connection state has changed
    StateChanged { state: ConnectionState },

    /// A socket-level connect attempt is starting
    StartConnection,

    /// Banner consumed, commands can flow
    Connected,

    /// The socket is gone (explicit disconnect, error, timeout or peer close)
    Disconnected,

    /// A connect attempt or live connection failed at socket level
    ConnectionError { message: String },

    /// A reconnect attempt has been scheduled after `delay`
    ReconnectScheduled {
        delay: Duration,
        attempt: u32,
        had_error: bool,
    },

    /// A command was resolved with a success frame
    CommandResponse { command: String, response: Response },

    /// A command was rejected with an error frame
    CommandError { command: String, status: String },

    /// The response watchdog fired
    Timeout { after: Duration },
}

/// Point-in-time view of the session aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    /// Socket open and banner consumed
    pub connected: bool,
    /// A connect workflow was requested and not stopped by `disconnect()`
    pub started: bool,
    /// Commands not yet written to the socket
    pub pending: usize,
    /// Commands written and awaiting their frame
    pub in_flight: usize,
    /// Status lines of every error frame paired with a command, oldest first
    pub errors: Vec<String>,
    /// Bytes held in the receive buffer
    pub buffered: usize,
    pub watchdog_armed: bool,
    pub reconnect_scheduled: bool,
}
