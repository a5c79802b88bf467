//! OAuth 1.0a HTTP client
//!
//! The three provider interactions: obtaining a request token, exchanging
//! an authorized request token for an access token, and invoking a
//! protected resource. Token endpoint responses are form-encoded bodies
//! (`oauth_token=...&oauth_token_secret=...`).
//!
//! No call is retried here; failures carry their classification and the
//! caller decides whether to restart.

use std::sync::Arc;

use tracing::debug;

use crate::config::{ConnectConfig, ServiceEndpoints};
use crate::error::{Error, Result};
use crate::signer::{self, RequestSigner};

/// Token/secret pair issued by the provider's token endpoints.
///
/// Used for both the transient request pair and the durable access pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub token: String,
    pub secret: String,
}

/// Signed-request client bound to one consumer configuration.
pub struct OAuthClient {
    config: Arc<ConnectConfig>,
    http: reqwest::Client,
}

impl OAuthClient {
    pub fn new(config: Arc<ConnectConfig>, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    pub fn config(&self) -> &ConnectConfig {
        &self.config
    }

    /// Obtain a request token, declaring the configured callback so the
    /// provider knows where to send the user agent after authorization.
    pub async fn get_request_token(&self) -> Result<TokenPair> {
        let url = self.signer().signed_url(
            "GET",
            &self.config.endpoints.request_token_url,
            &[(
                signer::OAUTH_CALLBACK,
                self.config.consumer.callback_url.as_str(),
            )],
        )?;
        let body = self.execute("GET", &url, None).await?;
        let pair = parse_token_response(&body)?;
        debug!(token = %pair.token, "request token obtained");
        Ok(pair)
    }

    /// Exchange an authorized request pair plus verifier for an access pair.
    pub async fn get_access_token(
        &self,
        request: &TokenPair,
        verifier: &str,
    ) -> Result<TokenPair> {
        let url = self
            .signer()
            .with_token(&request.token, &request.secret)
            .signed_url(
                "GET",
                &self.config.endpoints.access_token_url,
                &[(signer::OAUTH_VERIFIER, verifier)],
            )?;
        let body = self.execute("GET", &url, None).await?;
        let pair = parse_token_response(&body)?;
        debug!(token = %pair.token, "access token obtained");
        Ok(pair)
    }

    /// Invoke a protected resource with a request signed by the access
    /// pair. The optional body is sent raw; it is not form data and does
    /// not participate in the signature.
    pub async fn invoke(
        &self,
        access: &TokenPair,
        method: &str,
        url: &str,
        body: Option<String>,
    ) -> Result<String> {
        let signed = self
            .signer()
            .with_token(&access.token, &access.secret)
            .signed_url(method, url, &[])?;
        self.execute(method, &signed, body).await
    }

    fn signer(&self) -> RequestSigner<'_> {
        RequestSigner::new(
            &self.config.consumer.consumer_key,
            self.config.consumer.consumer_secret.expose(),
        )
    }

    async fn execute(&self, method: &str, url: &str, body: Option<String>) -> Result<String> {
        let method = reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|_| Error::Protocol(format!("unsupported HTTP method: {method}")))?;

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::from_transport("sending signed request", &e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::MalformedResponse(format!("reading response body: {e}")))?;

        if !status.is_success() {
            return Err(Error::Protocol(format!(
                "server returned {status}: {text}"
            )));
        }
        Ok(text)
    }
}

/// Authorization page URL for a freshly issued request token.
///
/// The token goes in verbatim; the callback is percent-encoded. Matches
/// the provider's expected shape:
/// `{authorize}?oauth_token={token}&oauth_callback={encoded-callback}`.
pub fn authorize_url(
    endpoints: &ServiceEndpoints,
    callback_url: &str,
    request_token: &str,
) -> String {
    format!(
        "{}?oauth_token={}&oauth_callback={}",
        endpoints.authorize_url,
        request_token,
        signer::percent_encode(callback_url)
    )
}

/// Parse a form-encoded token endpoint body into a [`TokenPair`].
fn parse_token_response(body: &str) -> Result<TokenPair> {
    let mut token = None;
    let mut secret = None;
    for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
        match key.as_ref() {
            "oauth_token" => token = Some(value.into_owned()),
            "oauth_token_secret" => secret = Some(value.into_owned()),
            _ => {}
        }
    }
    match (token, secret) {
        (Some(token), Some(secret)) if !token.is_empty() && !secret.is_empty() => {
            Ok(TokenPair { token, secret })
        }
        _ => Err(Error::MalformedResponse(format!(
            "token endpoint response missing oauth_token/oauth_token_secret: {body}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConsumerConfig, ServiceEndpoints};
    use common::Secret;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn endpoints_at(base: &str) -> ServiceEndpoints {
        ServiceEndpoints {
            request_token_url: format!("{base}/oauth/request_token"),
            access_token_url: format!("{base}/oauth/access_token"),
            authorize_url: format!("{base}/oauth/authorize"),
            denied_url: format!("{base}/oauth/denied"),
        }
    }

    fn client_at(base: &str) -> OAuthClient {
        let config = ConnectConfig::new(
            ConsumerConfig {
                consumer_key: "ck".into(),
                consumer_secret: Secret::new("cs".into()),
                callback_url: "app://cb".into(),
            },
            endpoints_at(base),
        )
        .unwrap();
        OAuthClient::new(Arc::new(config), reqwest::Client::new())
    }

    /// One-shot HTTP server returning a canned status and body; yields the
    /// base URL and the request line it saw.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::sync::oneshot::Receiver<String>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            // Read until the client has been silent briefly; headers and
            // body may arrive in separate segments
            let mut collected = Vec::new();
            loop {
                let mut chunk = [0u8; 1024];
                match tokio::time::timeout(
                    std::time::Duration::from_millis(200),
                    stream.read(&mut chunk),
                )
                .await
                {
                    Ok(Ok(0)) | Err(_) => break,
                    Ok(Ok(n)) => collected.extend_from_slice(&chunk[..n]),
                    Ok(Err(_)) => break,
                }
            }
            let request = String::from_utf8_lossy(&collected).to_string();
            let response = format!(
                "{status_line}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            let _ = tx.send(request);
        });

        (format!("http://{addr}"), rx)
    }

    #[test]
    fn parse_token_response_valid() {
        let pair =
            parse_token_response("oauth_token=rt1&oauth_token_secret=rs1&oauth_callback_confirmed=true")
                .unwrap();
        assert_eq!(pair.token, "rt1");
        assert_eq!(pair.secret, "rs1");
    }

    #[test]
    fn parse_token_response_decodes_escapes() {
        let pair = parse_token_response("oauth_token=a%2Fb&oauth_token_secret=s%20s").unwrap();
        assert_eq!(pair.token, "a/b");
        assert_eq!(pair.secret, "s s");
    }

    #[test]
    fn parse_token_response_missing_secret() {
        let err = parse_token_response("oauth_token=rt1").unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn parse_token_response_empty_values() {
        let err = parse_token_response("oauth_token=&oauth_token_secret=").unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn parse_token_response_garbage() {
        assert!(parse_token_response("<html>502 Bad Gateway</html>").is_err());
    }

    #[test]
    fn authorize_url_shape() {
        let endpoints = ServiceEndpoints {
            request_token_url: "https://host/oauth/request_token".into(),
            access_token_url: "https://host/oauth/access_token".into(),
            authorize_url: "https://host/authorize".into(),
            denied_url: "https://host/denied".into(),
        };
        assert_eq!(
            authorize_url(&endpoints, "app://cb", "rt1"),
            "https://host/authorize?oauth_token=rt1&oauth_callback=app%3A%2F%2Fcb"
        );
    }

    #[tokio::test]
    async fn get_request_token_roundtrip() {
        let (base, seen) =
            serve_once("HTTP/1.1 200 OK", "oauth_token=rt1&oauth_token_secret=rs1").await;
        let client = client_at(&base);

        let pair = client.get_request_token().await.unwrap();
        assert_eq!(pair.token, "rt1");
        assert_eq!(pair.secret, "rs1");

        let request = seen.await.unwrap();
        assert!(request.starts_with("GET /oauth/request_token?"));
        assert!(request.contains("oauth_consumer_key=ck"));
        assert!(request.contains("oauth_callback=app%3A%2F%2Fcb"));
        assert!(request.contains("oauth_signature="));
        assert!(
            !request.contains("oauth_token="),
            "request-token call must not carry a token"
        );
    }

    #[tokio::test]
    async fn get_access_token_sends_request_pair_and_verifier() {
        let (base, seen) =
            serve_once("HTTP/1.1 200 OK", "oauth_token=at1&oauth_token_secret=as1").await;
        let client = client_at(&base);

        let request_pair = TokenPair {
            token: "rt1".into(),
            secret: "rs1".into(),
        };
        let pair = client.get_access_token(&request_pair, "v1").await.unwrap();
        assert_eq!(pair.token, "at1");
        assert_eq!(pair.secret, "as1");

        let request = seen.await.unwrap();
        assert!(request.contains("oauth_token=rt1"));
        assert!(request.contains("oauth_verifier=v1"));
    }

    #[tokio::test]
    async fn invoke_posts_raw_body() {
        let (base, seen) = serve_once("HTTP/1.1 200 OK", "{\"ok\":true}").await;
        let client = client_at(&base);
        let access = TokenPair {
            token: "at1".into(),
            secret: "as1".into(),
        };

        let body = client
            .invoke(
                &access,
                "POST",
                &format!("{base}/v1/items"),
                Some("{\"name\":\"x\"}".into()),
            )
            .await
            .unwrap();
        assert_eq!(body, "{\"ok\":true}");

        let request = seen.await.unwrap();
        assert!(request.starts_with("POST /v1/items?"));
        assert!(request.contains("oauth_token=at1"));
        assert!(request.ends_with("{\"name\":\"x\"}"));
    }

    #[tokio::test]
    async fn non_success_status_is_protocol_error() {
        let (base, _seen) =
            serve_once("HTTP/1.1 401 Unauthorized", "signature_invalid").await;
        let client = client_at(&base);

        let err = client.get_request_token().await.unwrap_err();
        match err {
            Error::Protocol(message) => {
                assert!(message.contains("401"), "got: {message}");
                assert!(message.contains("signature_invalid"), "got: {message}");
            }
            other => panic!("expected Protocol, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn connection_failure_is_network_error() {
        let client = client_at("http://127.0.0.1:1");
        let err = client.get_request_token().await.unwrap_err();
        assert!(matches!(err, Error::Network { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn invoke_rejects_unknown_method() {
        let client = client_at("http://127.0.0.1:1");
        let access = TokenPair {
            token: "at1".into(),
            secret: "as1".into(),
        };
        let err = client
            .invoke(&access, "GE T", "http://127.0.0.1:1/x", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
