use control_protocol::{ConnectOutcome, Response, SessionError, SessionSnapshot};
use futures_channel::oneshot;
use tokio::net::TcpStream;

/// One-shot result handle a caller waits on
pub type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// Everything the session loop reacts to
///
/// Caller requests, socket activity and timer expiries all arrive through
/// this one mailbox, which is what orders data, timeouts and closures
/// deterministically.
pub enum SessionMessage {
    /// Queue a command line
    Submit {
        text: String,
        reply: Reply<Response>,
    },
    Connect {
        reply: Reply<ConnectOutcome>,
    },
    Disconnect {
        reply: Reply<()>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },

    /// Socket-level connect finished for connection attempt `epoch`
    SocketOpened {
        epoch: u64,
        result: Result<TcpStream, String>,
    },
    /// Bytes read from the socket of attempt `epoch`
    Data { epoch: u64, bytes: Vec<u8> },
    /// The socket of attempt `epoch` is gone; `error` is `None` for a clean EOF
    SocketClosed { epoch: u64, error: Option<String> },

    /// Response watchdog expired
    WatchdogFired { generation: u64 },
    /// Connect supervision expired for attempt `epoch`
    ConnectTimeout { epoch: u64 },
    /// The reconnect delay scheduled as `generation` has elapsed
    ReconnectDue { generation: u64 },

    /// Last handle dropped
    Shutdown,
}

// Manual Debug implementation: reply handles and sockets are not interesting
impl std::fmt::Debug for SessionMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submit { text, .. } => f.debug_struct("Submit").field("text", text).finish(),
            Self::Connect { .. } => write!(f, "Connect"),
            Self::Disconnect { .. } => write!(f, "Disconnect"),
            Self::Snapshot { .. } => write!(f, "Snapshot"),
            Self::SocketOpened { epoch, result } => f
                .debug_struct("SocketOpened")
                .field("epoch", epoch)
                .field("ok", &result.is_ok())
                .finish(),
            Self::Data { epoch, bytes } => f
                .debug_struct("Data")
                .field("epoch", epoch)
                .field("len", &bytes.len())
                .finish(),
            Self::SocketClosed { epoch, error } => f
                .debug_struct("SocketClosed")
                .field("epoch", epoch)
                .field("error", error)
                .finish(),
            Self::WatchdogFired { generation } => f
                .debug_struct("WatchdogFired")
                .field("generation", generation)
                .finish(),
            Self::ConnectTimeout { epoch } => f
                .debug_struct("ConnectTimeout")
                .field("epoch", epoch)
                .finish(),
            Self::ReconnectDue { generation } => f
                .debug_struct("ReconnectDue")
                .field("generation", generation)
                .finish(),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}
