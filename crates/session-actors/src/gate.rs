use std::collections::VecDeque;

/// Single-slot gate serializing connect and disconnect sequences
///
/// At most one sequence holds the slot. Requests arriving while it is held
/// wait in FIFO order; releasing the slot hands it straight to the oldest
/// waiter, so the slot is never observed free while work is waiting.
#[derive(Debug)]
pub struct Gate<T> {
    held: bool,
    waiting: VecDeque<T>,
}

impl<T> Default for Gate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Gate<T> {
    pub fn new() -> Self {
        Self {
            held: false,
            waiting: VecDeque::new(),
        }
    }

    /// Take the slot for `request`.
    ///
    /// Returns the request back when the slot was free (the caller now holds
    /// it and must run the request); otherwise queues it and returns `None`.
    pub fn acquire(&mut self, request: T) -> Option<T> {
        if self.held {
            self.waiting.push_back(request);
            None
        } else {
            self.held = true;
            Some(request)
        }
    }

    /// Release the slot.
    ///
    /// Returns the next waiting request, which now holds the slot.
    pub fn release(&mut self) -> Option<T> {
        let next = self.waiting.pop_front();
        self.held = next.is_some();
        next
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn waiting(&self) -> usize {
        self.waiting.len()
    }

    /// Empty the gate, returning every queued request
    pub fn close(&mut self) -> Vec<T> {
        self.held = false;
        self.waiting.drain(..).collect()
    }
}
