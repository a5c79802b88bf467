//! Error types for the SNTP probe
//!
//! Every variant means the same thing to callers: the probe produced no
//! usable answer. The distinction exists only for logging.

/// Errors from a single SNTP probe.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("time server socket error: {0}")]
    Socket(String),

    #[error("timed out waiting for time server reply")]
    Timeout,

    #[error("malformed time server reply: {0}")]
    MalformedReply(String),
}

/// Result alias for probe operations.
pub type Result<T> = std::result::Result<T, Error>;
