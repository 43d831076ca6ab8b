//! Scripted stand-in for a VTR control server.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use futures::stream::StreamExt;
use futures_channel::mpsc;
use session_actors::{SessionConfig, SessionEvent};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::time::timeout;

pub const BANNER: &[u8] = b"100 VTR Ready\r\n";

/// Upper bound for anything a test waits on
pub const PATIENCE: Duration = Duration::from_secs(5);

pub struct FakeServer {
    listener: TcpListener,
    port: u16,
}

impl FakeServer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Should bind a local port");
        let port = listener.local_addr().expect("Should have an address").port();
        Self { listener, port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Config pointing at this server, with defaults otherwise
    pub fn config(&self) -> SessionConfig {
        SessionConfig::new("127.0.0.1", self.port)
    }

    pub async fn accept(&self) -> ServerConn {
        self.try_accept(PATIENCE)
            .await
            .expect("Session should have connected")
    }

    pub async fn try_accept(&self, within: Duration) -> Option<ServerConn> {
        let (stream, _) = timeout(within, self.listener.accept()).await.ok()?.ok()?;
        let (read_half, write_half) = stream.into_split();
        Some(ServerConn {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }

    /// Accept and send the handshake banner
    pub async fn accept_ready(&self) -> ServerConn {
        let mut conn = self.accept().await;
        conn.send(BANNER).await;
        conn
    }
}

pub struct ServerConn {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl ServerConn {
    pub async fn send(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.expect("Should write");
        self.writer.flush().await.expect("Should flush");
    }

    /// Send one byte per write, pausing so reads cannot coalesce them
    pub async fn trickle(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.send(std::slice::from_ref(byte)).await;
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    /// Next command line without its terminator; `None` once the client closed
    pub async fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        let read = timeout(PATIENCE, self.reader.read_line(&mut line))
            .await
            .expect("Client should have written a line")
            .ok()?;
        if read == 0 {
            return None;
        }
        assert!(line.ends_with("\r\n"), "command not CRLF terminated: {line:?}");
        line.truncate(line.len() - 2);
        Some(line)
    }
}

/// Wait for the first event matching `wanted`, skipping the rest
pub async fn wait_for(
    events: &mut mpsc::Receiver<SessionEvent>,
    wanted: impl Fn(&SessionEvent) -> bool,
) -> SessionEvent {
    timeout(PATIENCE, async {
        loop {
            let event = events.next().await.expect("Event stream ended");
            if wanted(&event) {
                return event;
            }
        }
    })
    .await
    .expect("Expected event did not arrive")
}
