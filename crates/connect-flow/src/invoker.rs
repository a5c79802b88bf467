//! Signed calls to protected resources
//!
//! Once a login flow has succeeded, backend services are invoked with
//! requests signed by the stored access pair. Credential problems are
//! detected before any network traffic: a missing or incomplete pair is
//! `AuthInvalid`, and the caller's only remedy is to run the login flow
//! again.

use std::sync::Arc;

use tracing::debug;

use crate::exchange::TokenExchange;
use crate::session;
use crate::store::TokenStore;

use connect_oauth::NetworkKind;

/// Errors from a protected-resource call.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// Stored credentials missing or incomplete; re-run the login flow.
    #[error("stored login credentials are missing or incomplete")]
    AuthInvalid,

    #[error("network failure ({}): {message}", kind.label())]
    Network { kind: NetworkKind, message: String },

    #[error("OAuth protocol error: {0}")]
    Protocol(String),

    #[error("token store failure: {0}")]
    Store(String),
}

impl From<connect_oauth::Error> for InvokeError {
    fn from(err: connect_oauth::Error) -> Self {
        match err {
            connect_oauth::Error::Network { kind, message } => {
                InvokeError::Network { kind, message }
            }
            connect_oauth::Error::MalformedResponse(message) => {
                InvokeError::Protocol(format!("malformed response: {message}"))
            }
            connect_oauth::Error::Protocol(message) => InvokeError::Protocol(message),
        }
    }
}

/// Invokes backend services with the stored login.
pub struct ProtectedResourceInvoker {
    exchange: Arc<dyn TokenExchange>,
    store: Arc<dyn TokenStore>,
}

impl ProtectedResourceInvoker {
    pub fn new(exchange: Arc<dyn TokenExchange>, store: Arc<dyn TokenStore>) -> Self {
        Self { exchange, store }
    }

    pub async fn get(&self, url: &str) -> Result<String, InvokeError> {
        self.call("GET", url, None).await
    }

    pub async fn post(&self, url: &str, body: String) -> Result<String, InvokeError> {
        self.call("POST", url, Some(body)).await
    }

    pub async fn patch(&self, url: &str, body: String) -> Result<String, InvokeError> {
        self.call("PATCH", url, Some(body)).await
    }

    /// Load the access pair and invoke the resource with a signed request.
    pub async fn call(
        &self,
        method: &str,
        url: &str,
        body: Option<String>,
    ) -> Result<String, InvokeError> {
        let access = session::stored_access_pair(self.store.as_ref())
            .await
            .map_err(|e| InvokeError::Store(e.to_string()))?
            .ok_or(InvokeError::AuthInvalid)?;

        debug!(method, url, "invoking protected resource");
        let response = self.exchange.invoke(&access, method, url, body).await?;
        Ok(response)
    }
}
