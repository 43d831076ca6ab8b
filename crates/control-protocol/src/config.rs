//! Session configuration
//!
//! All durations are carried as milliseconds so the configuration can be
//! loaded from JSON/TOML/YAML by the embedding application without custom
//! duration parsing.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default server host
pub const DEFAULT_HOST: &str = "localhost";

/// Default server control port
pub const DEFAULT_PORT: u16 = 5250;

/// Default response timeout: maximum silence while commands are in flight
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Default budget for socket connect plus banner
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

/// Default fixed delay between a closure and the next connect attempt
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 500;

/// Readiness line the server sends right after accepting a connection
pub const DEFAULT_BANNER: &str = "100 VTR Ready";

/// How the delay before each reconnect attempt is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconnectStrategy {
    /// Same delay before every attempt
    Fixed { delay_ms: u64 },
    /// `base_ms * 2^(attempt - 1)`, capped at `max_ms`
    Exponential { base_ms: u64, max_ms: u64 },
}

impl Default for ReconnectStrategy {
    fn default() -> Self {
        Self::Fixed {
            delay_ms: DEFAULT_RECONNECT_DELAY_MS,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Configuration error: host must not be empty")]
    EmptyHost,

    #[error("Configuration error: port must be non-zero")]
    ZeroPort,

    #[error("Configuration error: {0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("Configuration error: handshake banner must not be empty")]
    EmptyBanner,
}

/// Endpoint, timeouts and reconnect behaviour for one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    /// Response timeout in milliseconds
    pub timeout_ms: u64,
    /// Socket connect plus banner budget in milliseconds
    pub connect_timeout_ms: u64,
    pub reconnect: ReconnectStrategy,
    /// Stop reconnecting after this many consecutive failed attempts (`None` = never)
    pub max_reconnect_attempts: Option<u32>,
    /// Handshake banner line, without terminator
    pub banner: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            reconnect: ReconnectStrategy::default(),
            max_reconnect_attempts: None,
            banner: DEFAULT_BANNER.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = duration_ms(timeout);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn with_reconnect(mut self, strategy: ReconnectStrategy) -> Self {
        self.reconnect = strategy;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = Some(attempts);
        self
    }

    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = banner.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// `host:port`, as used in log lines
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("timeout_ms"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("connect_timeout_ms"));
        }
        if self.banner.is_empty() {
            return Err(ConfigError::EmptyBanner);
        }
        Ok(())
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
