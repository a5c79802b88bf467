//! Loopback user agent
//!
//! Implements the flow's `AuthorizationBrowser` seam with a short-lived
//! HTTP listener: the authorization URL is printed for the user to open in
//! their own browser, and the provider's redirect back to the loopback
//! address is the terminal navigation. Only the configured callback and
//! denied prefixes count; anything else (favicon probes, stray requests)
//! is answered with 404 and ignored.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use connect_flow::{AuthorizationBrowser, Navigation};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

const DONE_PAGE: &str = "<!DOCTYPE html>\
<html><head><title>Login</title></head>\
<body><p>You can close this window and return to the application.</p></body></html>";

/// Captures the provider's redirect on a loopback listener.
pub struct LoopbackBrowser {
    listen_addr: SocketAddr,
    callback_path: String,
    denied_path: String,
}

#[derive(Clone)]
struct CaptureState {
    base: String,
    callback_path: String,
    denied_path: String,
    tx: tokio::sync::mpsc::Sender<String>,
}

impl LoopbackBrowser {
    pub fn new(listen_addr: SocketAddr, callback_path: String, denied_path: String) -> Self {
        Self {
            listen_addr,
            callback_path,
            denied_path,
        }
    }

    async fn capture(&self, authorize_url: &str) -> Navigation {
        let listener = match TcpListener::bind(self.listen_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(addr = %self.listen_addr, error = %e, "cannot bind callback listener");
                return Navigation::Dismissed;
            }
        };

        let (tx, mut rx) = tokio::sync::mpsc::channel::<String>(1);
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let state = CaptureState {
            base: format!("http://{}", self.listen_addr),
            callback_path: self.callback_path.clone(),
            denied_path: self.denied_path.clone(),
            tx,
        };
        let app = Router::new()
            .fallback(capture_handler)
            .layer(tower::limit::ConcurrencyLimitLayer::new(8))
            .with_state(state);

        let server = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await;
            if let Err(e) = result {
                error!(error = %e, "callback listener failed");
            }
        });

        info!(addr = %self.listen_addr, "waiting for authorization redirect");
        println!("Open this URL in your browser to continue:\n\n  {authorize_url}\n");

        let navigation = match rx.recv().await {
            Some(url) => Navigation::ReachedUrl(url),
            // Sender dropped without a capture: listener died
            None => Navigation::Dismissed,
        };

        let _ = shutdown_tx.send(());
        let _ = server.await;
        navigation
    }
}

impl AuthorizationBrowser for LoopbackBrowser {
    fn open<'a>(
        &'a self,
        authorize_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Navigation> + Send + 'a>> {
        Box::pin(self.capture(authorize_url))
    }
}

/// Forward terminal navigations to the waiting flow; 404 everything else.
async fn capture_handler(State(state): State<CaptureState>, uri: Uri) -> Response {
    let path = uri.path();
    if !path.starts_with(&state.callback_path) && !path.starts_with(&state.denied_path) {
        debug!(%uri, "ignoring non-terminal request");
        return StatusCode::NOT_FOUND.into_response();
    }

    let full_url = format!("{}{uri}", state.base);
    debug!(url = %full_url, "terminal navigation captured");
    // Only the first terminal navigation matters; later hits are answered
    // but not forwarded
    let _ = state.tx.try_send(full_url);
    Html(DONE_PAGE).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run_capture(
        path_and_query: &str,
    ) -> (Navigation, SocketAddr) {
        // Bind an ephemeral port first so the test knows where to aim
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = probe.local_addr().unwrap();
        drop(probe);

        let browser = LoopbackBrowser::new(addr, "/callback".into(), "/denied".into());
        let target = format!("http://{addr}{path_and_query}");

        let request = tokio::spawn(async move {
            // Give the listener a moment to come up, then hit it
            for _ in 0..50 {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                if let Ok(response) = reqwest::get(&target).await {
                    return Some(response.status());
                }
            }
            None
        });

        let navigation = browser.capture("https://host/authorize?oauth_token=rt1").await;
        let status = request.await.unwrap();
        assert!(status.is_some(), "redirect request never reached listener");
        (navigation, addr)
    }

    #[tokio::test]
    async fn captures_callback_redirect() {
        let (navigation, addr) =
            run_capture("/callback?oauth_token=rt1&oauth_verifier=v1").await;
        assert_eq!(
            navigation,
            Navigation::ReachedUrl(format!(
                "http://{addr}/callback?oauth_token=rt1&oauth_verifier=v1"
            ))
        );
    }

    #[tokio::test]
    async fn captures_denied_redirect() {
        let (navigation, addr) = run_capture("/denied").await;
        assert_eq!(
            navigation,
            Navigation::ReachedUrl(format!("http://{addr}/denied"))
        );
    }

    #[tokio::test]
    async fn ignores_unrelated_requests() {
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = probe.local_addr().unwrap();
        drop(probe);

        let browser = LoopbackBrowser::new(addr, "/callback".into(), "/denied".into());

        let requests = tokio::spawn(async move {
            for _ in 0..50 {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                // A favicon probe must be ignored, then the real callback lands
                if let Ok(response) =
                    reqwest::get(format!("http://{addr}/favicon.ico")).await
                {
                    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
                    let done = reqwest::get(format!(
                        "http://{addr}/callback?oauth_token=rt1&oauth_verifier=v1"
                    ))
                    .await
                    .unwrap();
                    assert_eq!(done.status(), reqwest::StatusCode::OK);
                    return;
                }
            }
            panic!("listener never came up");
        });

        let navigation = browser.capture("https://host/authorize").await;
        requests.await.unwrap();
        match navigation {
            Navigation::ReachedUrl(url) => assert!(url.contains("/callback?")),
            other => panic!("expected callback capture, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unbindable_address_dismisses() {
        // Hold the port so the browser cannot bind it
        let holder = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = holder.local_addr().unwrap();

        let browser = LoopbackBrowser::new(addr, "/callback".into(), "/denied".into());
        let navigation = browser.capture("https://host/authorize").await;
        assert_eq!(navigation, Navigation::Dismissed);
    }
}
