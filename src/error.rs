//! Error types for the engine.
//!
//! Transient failures (socket, timeout) are recovered by the reconnect loop and
//! never reach handler code. Only [`Error::RetryExhausted`] and
//! [`ConfigError`] surface to the embedding application as terminal failures.

use thiserror::Error;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Connect, read or write failure on the server socket.
    #[error("socket error: {0}")]
    Socket(#[from] std::io::Error),

    /// Connecting took longer than the configured timeout.
    #[error("timed out connecting to {addr}")]
    Timeout { addr: String },

    /// Every reconnect attempt failed; the client is now stopped for good.
    #[error("gave up after {attempts} failed connection attempts")]
    RetryExhausted { attempts: u32 },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// A line that could not be split into sender and command.
///
/// Never fatal: the offending line is logged and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty line")]
    Empty,

    #[error("too few header tokens in {0:?}")]
    TooFewTokens(String),
}

/// Framing failure while reassembling input lines.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("line exceeds maximum length ({0} bytes)")]
    LineTooLong(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Invalid configuration, rejected before any connection attempt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("read timeout must be a positive number of seconds, got {0}")]
    NonPositiveTimeout(f64),

    #[error("retry count must be at least 1")]
    ZeroRetries,

    #[error("host is required")]
    EmptyHost,

    #[error("nickname is required")]
    EmptyNickname,

    #[error("nickname {0:?} contains whitespace or control characters")]
    InvalidNickname(String),
}

pub type Result<T> = std::result::Result<T, Error>;
