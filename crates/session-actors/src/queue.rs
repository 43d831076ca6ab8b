//! Pending and in-flight command lists.
//!
//! A command is *pending* until its line has been handed to the socket and
//! *in flight* until its response frame arrives. Both lists are FIFO, and
//! because the server answers strictly in send order, every frame settles
//! the head of the in-flight list.

use std::collections::VecDeque;

use control_protocol::{Response, SessionError};

use crate::messages::Reply;

/// Command text paired with the handle its caller is waiting on
#[derive(Debug)]
pub struct Command {
    text: String,
    reply: Reply<Response>,
}

impl Command {
    pub fn new(text: impl Into<String>, reply: Reply<Response>) -> Self {
        Self {
            text: text.into(),
            reply,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Settle with a success frame. Consumes the command, so it settles once.
    pub fn resolve(self, response: Response) -> String {
        // A caller that dropped its future no longer cares
        let _ = self.reply.send(Ok(response));
        self.text
    }

    /// Settle with an error. Consumes the command, so it settles once.
    pub fn reject(self, error: SessionError) -> String {
        let _ = self.reply.send(Err(error));
        self.text
    }
}

/// What became of one inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// The head in-flight command resolved with `response`
    Resolved { command: String, response: Response },
    /// The head in-flight command rejected with an error status
    Rejected { command: String, status: String },
    /// Nothing was in flight; the frame was discarded
    Desync(Response),
}

#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: VecDeque<Command>,
    in_flight: VecDeque<Command>,
    errors: Vec<String>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue at the tail of the pending list
    pub fn push(&mut self, command: Command) {
        self.pending.push_back(command);
    }

    /// Take the oldest pending command for writing
    pub fn next_pending(&mut self) -> Option<Command> {
        self.pending.pop_front()
    }

    /// Put a command whose write could not be queued back at the head
    pub fn unsend(&mut self, command: Command) {
        self.pending.push_front(command);
    }

    /// Record that `command` has been written to the socket
    pub fn mark_in_flight(&mut self, command: Command) {
        self.in_flight.push_back(command);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Status lines of every error frame paired with a command, oldest first
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Pair a frame with the oldest in-flight command.
    ///
    /// Error frames reject the command with their status line and are
    /// appended to the error log; every other frame resolves it.
    pub fn settle(&mut self, response: Response) -> Settlement {
        let Some(command) = self.in_flight.pop_front() else {
            return Settlement::Desync(response);
        };

        if response.is_error() {
            let status = response.status.clone();
            self.errors.push(status.clone());
            let command = command.reject(SessionError::Command(status.clone()));
            Settlement::Rejected { command, status }
        } else {
            let command = command.resolve(response.clone());
            Settlement::Resolved { command, response }
        }
    }

    /// Reject every in-flight command. Returns how many were rejected.
    pub fn reject_in_flight(&mut self, error: &SessionError) -> usize {
        let count = self.in_flight.len();
        for command in self.in_flight.drain(..) {
            command.reject(error.clone());
        }
        count
    }

    /// Reject every in-flight command, then every pending one, in order
    pub fn reject_all(&mut self, error: &SessionError) -> usize {
        let mut count = self.reject_in_flight(error);
        for command in self.pending.drain(..) {
            command.reject(error.clone());
            count += 1;
        }
        count
    }
}
