/// # Connection State Machine
///
/// One control connection per session moves through these states. The
/// session loop is the only owner of the current state, and every change
/// goes through [`ConnectionState::can_transition_to`].
///
/// ## State Transition Diagram
///
/// ```text
///        connect()          socket open          banner consumed
///  ┌──────────────┐   ┌────────────┐   ┌───────────────────┐   ┌───────────┐
///  │ Disconnected │──►│ Connecting │──►│ AwaitingHandshake │──►│ Connected │
///  └──────▲───────┘   └─────┬──────┘   └─────────┬─────────┘   └─────┬─────┘
///         │                 │ error               │ error / timeout   │ disconnect()
///         │                 │                     │                   │ error / timeout
///         │           ┌─────▼─────────────────────▼───────────────────▼─┐
///         └───────────┤                     Closing                      │
///                     └──────────────────────────────────────────────────┘
/// ```
///
/// ## State Invariants
///
/// - **Disconnected**: no socket, commands accumulate in the pending queue
/// - **Connecting**: socket-level connect in progress, gate held
/// - **AwaitingHandshake**: socket open, waiting for the banner line, gate held
/// - **Connected**: banner consumed, pending queue drains immediately
/// - **Closing**: socket being torn down; outstanding work is being settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ConnectionState {
    /// No socket, ready to connect
    Disconnected,

    /// Socket-level connect in progress
    Connecting,

    /// Socket open, banner not yet received
    AwaitingHandshake,

    /// Banner consumed, commands may be written
    Connected,

    /// Tearing the socket down
    Closing,
}

impl ConnectionState {
    /// `connected == true` iff the socket is open and the banner was consumed
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Is a connect sequence running (and therefore holding the gate)?
    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting | Self::AwaitingHandshake)
    }

    /// Does this state own a live (or opening) socket?
    pub fn has_socket(&self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::AwaitingHandshake | Self::Connected
        )
    }

    /// Short human-readable status text
    pub fn status_text(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting...",
            Self::AwaitingHandshake => "Waiting for server banner...",
            Self::Connected => "Connected",
            Self::Closing => "Closing...",
        }
    }

    /// Validate if transition to new_state is allowed from current state
    pub fn can_transition_to(&self, new_state: ConnectionState) -> bool {
        use ConnectionState::*;

        match (self, new_state) {
            // From Disconnected
            (Disconnected, Connecting) => true,
            (Disconnected, Disconnected) => true, // Idempotent (no-op)

            // From Connecting
            (Connecting, AwaitingHandshake) => true, // Socket opened
            (Connecting, Closing) => true,           // Connect failed or cancelled

            // From AwaitingHandshake
            (AwaitingHandshake, Connected) => true, // Banner consumed
            (AwaitingHandshake, Closing) => true,   // Error before banner

            // From Connected
            (Connected, Closing) => true, // disconnect(), error or timeout

            // From Closing
            (Closing, Disconnected) => true,

            _ => false,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.status_text())
    }
}
