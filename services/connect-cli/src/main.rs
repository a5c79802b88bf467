//! Web SSO Connect demo host
//!
//! Command-line host exercising the library end to end:
//! 1. Runs the full login flow with a loopback listener as the user agent
//! 2. Reports login status from the stored session
//! 3. Makes signed GET calls against protected resources
//! 4. Logs out by clearing the stored session
//!
//! Configuration comes from a TOML file (see `Config`); the consumer
//! secret is supplied via CONNECT_CONSUMER_SECRET or a secret file.

mod browser;
mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use clock_sync::SntpClient;
use connect_flow::{
    AuthFlowController, FileTokenStore, FlowOutcome, ProtectedResourceInvoker, SntpClockGate,
};
use connect_oauth::OAuthClient;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::browser::LoopbackBrowser;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // CLI: <command> [args] plus a simple --config flag
    let args: Vec<String> = std::env::args().collect();
    let mut cli_config_path = None;
    let mut positional: Vec<&str> = Vec::new();
    let mut i = 1;
    while i < args.len() {
        if args[i] == "--config" {
            cli_config_path = args.get(i + 1).map(String::as_str);
            i += 2;
            continue;
        }
        positional.push(args[i].as_str());
        i += 1;
    }

    if positional.is_empty() {
        print_usage();
        return Ok(());
    }

    let config_path = Config::resolve_path(cli_config_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    info!(
        path = %config_path.display(),
        host = %config.server.host,
        callback = %config.callback_url(),
        "configuration loaded"
    );

    let store = Arc::new(
        FileTokenStore::load(config.store.path.clone())
            .await
            .with_context(|| format!("failed to open store {}", config.store.path.display()))?,
    );

    match positional.first().copied() {
        Some("login") => login(&config, store).await,
        Some("logout") => {
            connect_flow::log_out(store.as_ref())
                .await
                .context("failed to clear stored session")?;
            println!("Logged out.");
            Ok(())
        }
        Some("status") => {
            let logged_in = connect_flow::is_user_logged_in(store.as_ref())
                .await
                .context("failed to read stored session")?;
            println!(
                "{}",
                if logged_in {
                    "Logged in."
                } else {
                    "Not logged in."
                }
            );
            Ok(())
        }
        Some("get") => {
            let url = positional
                .get(1)
                .copied()
                .context("usage: connect-cli get <url>")?;
            invoke_get(&config, store, url).await
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

/// Shared HTTP client with a bounded per-request timeout.
fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .context("failed to build HTTP client")
}

/// Run one complete login flow to a terminal outcome.
async fn login(config: &Config, store: Arc<FileTokenStore>) -> Result<()> {
    let connect_config = config.connect_config()?;
    let client = Arc::new(OAuthClient::new(connect_config.clone(), http_client()?));
    let browser = Arc::new(LoopbackBrowser::new(
        config.callback.listen_addr,
        config.callback.path.clone(),
        config.callback.denied_path.clone(),
    ));
    let clock = Arc::new(SntpClockGate::new(SntpClient::default()));

    let controller = AuthFlowController::new(connect_config, client, clock, browser, store);

    match controller.run().await {
        FlowOutcome::Success => {
            println!("Login succeeded.");
            Ok(())
        }
        FlowOutcome::Denied => {
            println!("Authorization was denied.");
            std::process::exit(2);
        }
        FlowOutcome::Cancelled => {
            println!("Login was cancelled.");
            std::process::exit(3);
        }
        FlowOutcome::Failed(err) => Err(err).context("login flow failed"),
    }
}

/// Signed GET against a protected resource using the stored session.
async fn invoke_get(config: &Config, store: Arc<FileTokenStore>, url: &str) -> Result<()> {
    let connect_config = config.connect_config()?;
    let client = Arc::new(OAuthClient::new(connect_config, http_client()?));
    let invoker = ProtectedResourceInvoker::new(client, store);

    let body = invoker
        .get(url)
        .await
        .with_context(|| format!("signed GET {url} failed"))?;
    println!("{body}");
    Ok(())
}

fn print_usage() {
    println!(
        "usage: connect-cli [--config <path>] <command>\n\n\
         commands:\n\
         \x20 login           run the web login flow\n\
         \x20 logout          clear the stored session\n\
         \x20 status          report whether a user is logged in\n\
         \x20 get <url>       signed GET against a protected resource"
    );
}
