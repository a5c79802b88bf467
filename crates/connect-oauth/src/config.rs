//! Consumer and service-provider configuration
//!
//! Everything the signer and the login flow need is fixed for the lifetime
//! of the process and validated once at construction. Missing or malformed
//! fields are a fatal configuration error: no flow may start without a
//! complete set.

use common::{Error as CommonError, Secret};

/// Consumer registration data plus the callback the provider redirects to
/// after authorization.
///
/// The callback may use a custom scheme (`app://...`); it is matched by
/// prefix against the URLs the user agent reaches.
#[derive(Debug)]
pub struct ConsumerConfig {
    pub consumer_key: String,
    pub consumer_secret: Secret<String>,
    pub callback_url: String,
}

/// Full URLs of the provider's OAuth endpoints.
#[derive(Debug, Clone)]
pub struct ServiceEndpoints {
    pub request_token_url: String,
    pub access_token_url: String,
    /// Authorization page the user agent is sent to.
    pub authorize_url: String,
    /// Prefix the provider redirects to when the user refuses.
    pub denied_url: String,
}

/// Immutable process-wide OAuth configuration.
#[derive(Debug)]
pub struct ConnectConfig {
    pub consumer: ConsumerConfig,
    pub endpoints: ServiceEndpoints,
}

impl ConnectConfig {
    /// Validate and freeze the configuration.
    ///
    /// Every field is mandatory. Endpoint URLs must carry an http(s)
    /// scheme; the callback and denied URLs only need to be non-empty
    /// prefixes.
    pub fn new(
        consumer: ConsumerConfig,
        endpoints: ServiceEndpoints,
    ) -> common::Result<Self> {
        require("consumer_key", &consumer.consumer_key)?;
        require("consumer_secret", consumer.consumer_secret.expose())?;
        require("callback_url", &consumer.callback_url)?;
        require_http_url("request_token_url", &endpoints.request_token_url)?;
        require_http_url("access_token_url", &endpoints.access_token_url)?;
        require_http_url("authorize_url", &endpoints.authorize_url)?;
        require("denied_url", &endpoints.denied_url)?;
        Ok(Self {
            consumer,
            endpoints,
        })
    }
}

fn require(field: &str, value: &str) -> common::Result<()> {
    if value.trim().is_empty() {
        return Err(CommonError::Config(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_http_url(field: &str, value: &str) -> common::Result<()> {
    require(field, value)?;
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(CommonError::Config(format!(
            "{field} must start with http:// or https://, got: {value}"
        )));
    }
    Ok(())
}
