//! Error types for OAuth operations
//!
//! Three categories, kept distinct so callers can react precisely:
//! transport failures (further classified for user messaging), responses
//! that cannot be parsed, and OAuth-level protocol violations. Nothing is
//! retried at this layer.

/// How a transport failure relates to connectivity.
///
/// Drives the caller-facing message: "no connection" vs "service down"
/// vs a generic I/O failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkKind {
    /// No usable route from this host (name resolution failed, network or
    /// host unreachable)
    NoNetwork,
    /// The host is routable but the server did not answer (connection
    /// refused, request timed out)
    ServerUnreachable,
    /// Any other transport-level failure
    OtherIo,
}

impl NetworkKind {
    pub fn label(&self) -> &'static str {
        match self {
            NetworkKind::NoNetwork => "no_network",
            NetworkKind::ServerUnreachable => "server_unreachable",
            NetworkKind::OtherIo => "other_io",
        }
    }
}

/// Errors from OAuth signing and HTTP operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("network failure ({}): {message}", kind.label())]
    Network { kind: NetworkKind, message: String },

    #[error("malformed server response: {0}")]
    MalformedResponse(String),

    #[error("OAuth protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Wrap a reqwest transport error with its connectivity classification.
    pub(crate) fn from_transport(context: &str, err: &reqwest::Error) -> Self {
        Error::Network {
            kind: classify_transport_error(err),
            message: format!("{context}: {err}"),
        }
    }
}

/// Result alias for OAuth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classify a reqwest transport error into a [`NetworkKind`].
///
/// Timeouts and refused connections mean the server side is the problem;
/// unreachable-network and name-resolution failures mean the local host has
/// no connectivity. Everything else is undifferentiated I/O.
pub fn classify_transport_error(err: &reqwest::Error) -> NetworkKind {
    if err.is_timeout() {
        return NetworkKind::ServerUnreachable;
    }
    if err.is_connect() {
        if let Some(io) = io_cause(err) {
            return match io.kind() {
                std::io::ErrorKind::NetworkUnreachable
                | std::io::ErrorKind::HostUnreachable
                | std::io::ErrorKind::NetworkDown => NetworkKind::NoNetwork,
                _ => NetworkKind::ServerUnreachable,
            };
        }
        // Name resolution failures surface as connect errors with no
        // io::Error in the chain
        return NetworkKind::NoNetwork;
    }
    NetworkKind::OtherIo
}

/// Walk the source chain looking for the underlying io::Error.
fn io_cause(err: &reqwest::Error) -> Option<&std::io::Error> {
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return Some(io);
        }
        source = cause.source();
    }
    None
}
