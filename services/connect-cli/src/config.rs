//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The consumer secret is loaded from the CONNECT_CONSUMER_SECRET env var
//! or from consumer.secret_file, never stored in the TOML directly to
//! avoid leaking secrets.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::Secret;
use connect_oauth::{ConnectConfig, ConsumerConfig, ServiceEndpoints};
use serde::Deserialize;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub consumer: ConsumerSection,
    pub server: ServerSection,
    pub callback: CallbackSection,
    pub store: StoreSection,
}

/// Consumer registration data
#[derive(Debug, Deserialize)]
pub struct ConsumerSection {
    pub key: String,
    #[serde(skip)]
    pub secret: Option<Secret<String>>,
    /// Path to a file containing the consumer secret (alternative to the
    /// CONNECT_CONSUMER_SECRET env var)
    #[serde(default)]
    pub secret_file: Option<PathBuf>,
}

/// Identity provider endpoints, composed as `https://{host}{path}`
#[derive(Debug, Deserialize)]
pub struct ServerSection {
    pub host: String,
    #[serde(default = "default_request_token_path")]
    pub request_token_path: String,
    #[serde(default = "default_access_token_path")]
    pub access_token_path: String,
    #[serde(default = "default_authorize_path")]
    pub authorize_path: String,
}

/// Loopback listener the provider redirects back to
#[derive(Debug, Deserialize)]
pub struct CallbackSection {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_callback_path")]
    pub path: String,
    #[serde(default = "default_denied_path")]
    pub denied_path: String,
}

/// Token store location
#[derive(Debug, Deserialize)]
pub struct StoreSection {
    pub path: PathBuf,
}

fn default_request_token_path() -> String {
    "/oauth/request_token".into()
}

fn default_access_token_path() -> String {
    "/oauth/access_token".into()
}

fn default_authorize_path() -> String {
    "/oauth/authorize".into()
}

fn default_callback_path() -> String {
    "/callback".into()
}

fn default_denied_path() -> String {
    "/denied".into()
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment
    /// variables.
    ///
    /// Consumer secret resolution order:
    /// 1. CONNECT_CONSUMER_SECRET env var
    /// 2. consumer.secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.consumer.key.trim().is_empty() {
            return Err(common::Error::Config("consumer.key must not be empty".into()));
        }
        if config.server.host.trim().is_empty() {
            return Err(common::Error::Config("server.host must not be empty".into()));
        }
        if config.server.host.contains("://") {
            return Err(common::Error::Config(format!(
                "server.host must be a bare hostname, got: {}",
                config.server.host
            )));
        }
        for (field, value) in [
            ("server.request_token_path", &config.server.request_token_path),
            ("server.access_token_path", &config.server.access_token_path),
            ("server.authorize_path", &config.server.authorize_path),
            ("callback.path", &config.callback.path),
            ("callback.denied_path", &config.callback.denied_path),
        ] {
            if !value.starts_with('/') {
                return Err(common::Error::Config(format!(
                    "{field} must start with '/', got: {value}"
                )));
            }
        }

        // Resolve consumer secret: env var takes precedence over file
        if let Ok(secret) = std::env::var("CONNECT_CONSUMER_SECRET") {
            config.consumer.secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.consumer.secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read consumer secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.consumer.secret = Some(Secret::new(secret));
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONNECT_CONFIG env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONNECT_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("connect.toml")
    }

    /// URL of the loopback callback endpoint.
    pub fn callback_url(&self) -> String {
        format!("http://{}{}", self.callback.listen_addr, self.callback.path)
    }

    /// URL the provider redirects to on user refusal.
    pub fn denied_url(&self) -> String {
        format!(
            "http://{}{}",
            self.callback.listen_addr, self.callback.denied_path
        )
    }

    /// Build the validated OAuth configuration for the flow.
    pub fn connect_config(&self) -> common::Result<Arc<ConnectConfig>> {
        let secret = self.consumer.secret.as_ref().ok_or_else(|| {
            common::Error::Config(
                "consumer secret missing: set CONNECT_CONSUMER_SECRET or consumer.secret_file"
                    .into(),
            )
        })?;

        let host = &self.server.host;
        let config = ConnectConfig::new(
            ConsumerConfig {
                consumer_key: self.consumer.key.clone(),
                consumer_secret: secret.clone(),
                callback_url: self.callback_url(),
            },
            ServiceEndpoints {
                request_token_url: format!("https://{host}{}", self.server.request_token_path),
                access_token_url: format!("https://{host}{}", self.server.access_token_path),
                authorize_url: format!("https://{host}{}", self.server.authorize_path),
                denied_url: self.denied_url(),
            },
        )?;
        Ok(Arc::new(config))
    }
}
