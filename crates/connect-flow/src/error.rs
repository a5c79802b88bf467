//! Flow error taxonomy
//!
//! Every failure mode a login attempt can end in, typed so hosts can show
//! targeted messages. None of these are retried internally; the whole
//! flow is restarted from scratch if the caller decides to try again.

use connect_oauth::NetworkKind;

use crate::store::StoreError;

/// Terminal failure of one login attempt.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("local clock is {offset_millis} ms off the server clock, outside the acceptable window")]
    ClockSkew { offset_millis: i64 },

    #[error("network failure ({}): {message}", kind.label())]
    Network { kind: NetworkKind, message: String },

    #[error("OAuth protocol violation: {0}")]
    Protocol(String),

    #[error("post-login registration step failed: {0}")]
    Registration(String),

    #[error("token store failure: {0}")]
    Store(String),

    #[error("a login flow is already in progress")]
    AlreadyInProgress,
}

impl From<connect_oauth::Error> for FlowError {
    fn from(err: connect_oauth::Error) -> Self {
        match err {
            connect_oauth::Error::Network { kind, message } => {
                FlowError::Network { kind, message }
            }
            connect_oauth::Error::MalformedResponse(message) => {
                FlowError::Protocol(format!("malformed response: {message}"))
            }
            connect_oauth::Error::Protocol(message) => FlowError::Protocol(message),
        }
    }
}

impl From<StoreError> for FlowError {
    fn from(err: StoreError) -> Self {
        FlowError::Store(err.to_string())
    }
}
