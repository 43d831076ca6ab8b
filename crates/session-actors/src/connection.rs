//! Socket plumbing for one connection attempt.
//!
//! The session loop never awaits the network. Connecting, reading and
//! writing each run in their own task and report back through the mailbox,
//! tagged with the attempt's epoch so that late messages from a torn-down
//! socket are recognisable.

use actor_runtime::Mailbox;
use control_protocol::{ActorError, LINE_TERMINATOR};
use futures::stream::StreamExt;
use futures_channel::mpsc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::AbortHandle;

use crate::constants::io::READ_CHUNK_SIZE;
use crate::messages::SessionMessage;

/// Start a socket-level connect; the outcome arrives as `SocketOpened`
pub fn spawn_connect(
    host: String,
    port: u16,
    epoch: u64,
    mailbox: &Mailbox<SessionMessage>,
) -> AbortHandle {
    let mailbox = mailbox.clone();
    tokio::spawn(async move {
        let result = TcpStream::connect((host.as_str(), port))
            .await
            .map_err(|e| e.to_string());
        let _ = mailbox.send(SessionMessage::SocketOpened { epoch, result });
    })
    .abort_handle()
}

/// An open control socket, split into a reader task and a writer task
///
/// Dropping the link aborts both tasks, which closes the socket.
pub struct Link {
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    reader: AbortHandle,
    writer: AbortHandle,
}

impl Link {
    pub fn open(stream: TcpStream, epoch: u64, mailbox: &Mailbox<SessionMessage>) -> Self {
        let (read_half, write_half) = stream.into_split();
        let (outbound, outbound_rx) = mpsc::unbounded();

        let reader = tokio::spawn(read_loop(read_half, epoch, mailbox.clone())).abort_handle();
        let writer =
            tokio::spawn(write_loop(write_half, outbound_rx, epoch, mailbox.clone())).abort_handle();

        Self {
            outbound,
            reader,
            writer,
        }
    }

    /// Queue one command line, terminator appended
    pub fn write_line(&self, text: &str) -> Result<(), ActorError> {
        let mut line = Vec::with_capacity(text.len() + LINE_TERMINATOR.len());
        line.extend_from_slice(text.as_bytes());
        line.extend_from_slice(LINE_TERMINATOR.as_bytes());
        self.outbound
            .unbounded_send(line)
            .map_err(|_| ActorError::Transport("socket writer has stopped".into()))
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link").finish_non_exhaustive()
    }
}

async fn read_loop(mut socket: OwnedReadHalf, epoch: u64, mailbox: Mailbox<SessionMessage>) {
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    loop {
        match socket.read(&mut buf).await {
            Ok(0) => {
                let _ = mailbox.send(SessionMessage::SocketClosed { epoch, error: None });
                return;
            }
            Ok(n) => {
                let bytes = buf.get(..n).unwrap_or_default().to_vec();
                if mailbox.send(SessionMessage::Data { epoch, bytes }).is_err() {
                    // Session gone
                    return;
                }
            }
            Err(e) => {
                let _ = mailbox.send(SessionMessage::SocketClosed {
                    epoch,
                    error: Some(e.to_string()),
                });
                return;
            }
        }
    }
}

async fn write_loop(
    mut socket: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    epoch: u64,
    mailbox: Mailbox<SessionMessage>,
) {
    while let Some(line) = outbound.next().await {
        if let Err(e) = socket.write_all(&line).await {
            let _ = mailbox.send(SessionMessage::SocketClosed {
                epoch,
                error: Some(e.to_string()),
            });
            return;
        }
    }
    let _ = socket.shutdown().await;
}
