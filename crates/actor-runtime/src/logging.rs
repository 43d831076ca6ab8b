//! Leveled logging through an injected sink.
//!
//! The session never decides where log lines go. It calls into a
//! [`LogSink`] supplied by the embedding application; [`TracingSink`] (the
//! default) forwards to `tracing`, and [`RecordingSink`] keeps lines in
//! memory for tests.
//!
//! Every line is prefixed with the owning session's instance number so
//! output from several sessions in one process can be told apart.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
}

/// Logging capability injected into a session
pub trait LogSink: Send + Sync {
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Forwards to the `tracing` macros; install any subscriber to see output
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }
}

/// Keeps every line in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<(Level, String)>>,
}

impl RecordingSink {
    fn push(&self, level: Level, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }

    /// All recorded lines, oldest first
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Does any line contain `needle`?
    pub fn contains(&self, needle: &str) -> bool {
        self.lines()
            .iter()
            .any(|(_, line)| line.contains(needle))
    }

    /// Number of lines at `level` containing `needle`
    pub fn count(&self, level: Level, needle: &str) -> usize {
        self.lines()
            .iter()
            .filter(|(l, line)| *l == level && line.contains(needle))
            .count()
    }
}

impl LogSink for RecordingSink {
    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }

    fn warn(&self, message: &str) {
        self.push(Level::Warn, message);
    }

    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }

    fn debug(&self, message: &str) {
        self.push(Level::Debug, message);
    }
}

/// Cheap-to-clone handle pairing a sink with an instance number
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
    instance: u64,
}

impl Logger {
    /// Wrap `sink`, taking the next process-wide instance number
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Logger over [`TracingSink`]
    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingSink))
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        let line = format!("{}: {}", self.instance, args);
        match level {
            Level::Error => self.sink.error(&line),
            Level::Warn => self.sink.warn(&line),
            Level::Info => self.sink.info(&line),
            Level::Debug => self.sink.debug(&line),
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("instance", &self.instance)
            .field("sink", &"<dyn LogSink>")
            .finish()
    }
}

/// Log error-level message
///
/// Use for failures that end a connection or a session
#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)*) => {
        $logger.log($crate::logging::Level::Error, format_args!($($arg)*))
    };
}

/// Log warning-level message
///
/// Use for recoverable errors and unexpected conditions
#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $logger.log($crate::logging::Level::Warn, format_args!($($arg)*))
    };
}

/// Log info-level message
///
/// Use for state changes and connection milestones
#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $logger.log($crate::logging::Level::Info, format_args!($($arg)*))
    };
}

/// Log debug-level message
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.log($crate::logging::Level::Debug, format_args!($($arg)*))
    };
}
