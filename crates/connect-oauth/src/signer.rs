//! OAuth 1.0a request signing (RFC 5849, HMAC-SHA1)
//!
//! Produces fully signed URLs: the protocol parameters and the signature
//! are appended to the query string, because the target provider does not
//! read the Authorization header form. The signature base string covers the
//! request method, the base URL, and every query parameter. A raw request
//! body is not form data and stays outside the signature.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rand::RngExt;
use sha1::Sha1;

use crate::error::{Error, Result};

type HmacSha1 = Hmac<Sha1>;

/// RFC 5849 section 3.6: everything outside the unreserved set is escaped.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Protocol parameter names.
pub const OAUTH_CALLBACK: &str = "oauth_callback";
pub const OAUTH_TOKEN: &str = "oauth_token";
pub const OAUTH_VERIFIER: &str = "oauth_verifier";
const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
const OAUTH_NONCE: &str = "oauth_nonce";
const OAUTH_SIGNATURE: &str = "oauth_signature";
const OAUTH_SIGNATURE_METHOD: &str = "oauth_signature_method";
const OAUTH_TIMESTAMP: &str = "oauth_timestamp";
const OAUTH_VERSION: &str = "oauth_version";

const SIGNATURE_METHOD: &str = "HMAC-SHA1";

/// Percent-encode a string per RFC 5849.
pub fn percent_encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

/// Credentials participating in one signature.
///
/// The token is absent only for the request-token call; every later call
/// signs with a request or access pair on top of the consumer pair.
pub struct RequestSigner<'a> {
    consumer_key: &'a str,
    consumer_secret: &'a str,
    token: Option<&'a str>,
    token_secret: Option<&'a str>,
}

impl<'a> RequestSigner<'a> {
    pub fn new(consumer_key: &'a str, consumer_secret: &'a str) -> Self {
        Self {
            consumer_key,
            consumer_secret,
            token: None,
            token_secret: None,
        }
    }

    pub fn with_token(mut self, token: &'a str, token_secret: &'a str) -> Self {
        self.token = Some(token);
        self.token_secret = Some(token_secret);
        self
    }

    /// Sign `method` on `url` and return the URL with all protocol
    /// parameters (including the signature) in the query string. `extra`
    /// carries the per-operation parameter: `oauth_callback` when asking
    /// for a request token, `oauth_verifier` when exchanging it.
    pub fn signed_url(&self, method: &str, url: &str, extra: &[(&str, &str)]) -> Result<String> {
        self.signed_url_at(method, url, extra, &generate_nonce(), unix_timestamp())
    }

    /// Deterministic core of `signed_url`; nonce and timestamp injected.
    fn signed_url_at(
        &self,
        method: &str,
        url: &str,
        extra: &[(&str, &str)],
        nonce: &str,
        timestamp: u64,
    ) -> Result<String> {
        let parsed = url::Url::parse(url)
            .map_err(|e| Error::Protocol(format!("unsignable URL {url}: {e}")))?;
        let base_url = base_string_url(&parsed);

        let timestamp = timestamp.to_string();
        let mut params: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        params.push((OAUTH_CONSUMER_KEY.into(), self.consumer_key.into()));
        params.push((OAUTH_NONCE.into(), nonce.into()));
        params.push((OAUTH_SIGNATURE_METHOD.into(), SIGNATURE_METHOD.into()));
        params.push((OAUTH_TIMESTAMP.into(), timestamp));
        params.push((OAUTH_VERSION.into(), "1.0".into()));
        if let Some(token) = self.token {
            params.push((OAUTH_TOKEN.into(), token.into()));
        }
        for (k, v) in extra {
            params.push(((*k).into(), (*v).into()));
        }

        let signature = self.signature(method, &base_url, &params);
        params.push((OAUTH_SIGNATURE.into(), signature));

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        Ok(format!("{base_url}?{query}"))
    }

    /// `base64(HMAC-SHA1(signing_key, signature_base_string))`
    fn signature(&self, method: &str, base_url: &str, params: &[(String, String)]) -> String {
        let base = signature_base_string(method, base_url, params);
        let key = format!(
            "{}&{}",
            percent_encode(self.consumer_secret),
            percent_encode(self.token_secret.unwrap_or(""))
        );
        let mut mac =
            HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length");
        mac.update(base.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

/// `METHOD&encoded(base_url)&encoded(normalized_params)` per RFC 5849
/// section 3.4.1. Parameters are individually encoded first, then sorted by
/// encoded name and value.
fn signature_base_string(method: &str, base_url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();
    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(base_url),
        percent_encode(&normalized)
    )
}

/// Scheme, host, optional non-default port, and path; query and fragment
/// are excluded from the base string.
fn base_string_url(url: &url::Url) -> String {
    let scheme = url.scheme();
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{scheme}://{host}:{port}{}", url.path()),
        None => format!("{scheme}://{host}{}", url.path()),
    }
}

/// Random per-request nonce, hex-encoded.
fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Local clock as unix seconds, the value the provider checks against its
/// acceptance window.
fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_encode_unreserved_untouched() {
        assert_eq!(percent_encode("Az09-._~"), "Az09-._~");
    }

    #[test]
    fn percent_encode_reserved_characters() {
        assert_eq!(percent_encode("app://cb"), "app%3A%2F%2Fcb");
        assert_eq!(percent_encode("a b+c"), "a%20b%2Bc");
        assert_eq!(percent_encode("k=v&x"), "k%3Dv%26x");
    }

    #[test]
    fn percent_encode_utf8_bytes() {
        assert_eq!(percent_encode("maçã"), "ma%C3%A7%C3%A3");
    }

    #[test]
    fn base_string_url_strips_query_and_default_port() {
        let url = url::Url::parse("https://id.example.com:443/oauth/request_token?a=1#frag")
            .unwrap();
        assert_eq!(
            base_string_url(&url),
            "https://id.example.com/oauth/request_token"
        );
    }

    #[test]
    fn base_string_url_keeps_explicit_port() {
        let url = url::Url::parse("http://127.0.0.1:8910/callback").unwrap();
        assert_eq!(base_string_url(&url), "http://127.0.0.1:8910/callback");
    }

    #[test]
    fn base_string_sorts_encoded_parameters() {
        let params = vec![
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "1".to_string()),
            ("a".to_string(), "0".to_string()),
        ];
        let base = signature_base_string("get", "https://h/p", &params);
        assert_eq!(base, "GET&https%3A%2F%2Fh%2Fp&a%3D0%26a%3D1%26b%3D2");
    }

    #[test]
    fn hmac_sha1_known_vector() {
        // HMAC-SHA1("key", "The quick brown fox jumps over the lazy dog")
        let mut mac = HmacSha1::new_from_slice(b"key").unwrap();
        mac.update(b"The quick brown fox jumps over the lazy dog");
        let tag = STANDARD.encode(mac.finalize().into_bytes());
        assert_eq!(tag, "3nybhbi3iqa8ino29wqQcBydtNk=");
    }

    #[test]
    fn signed_url_is_deterministic_for_fixed_nonce_and_timestamp() {
        let signer = RequestSigner::new("ck", "cs");
        let a = signer
            .signed_url_at(
                "GET",
                "https://id.example.com/oauth/request_token",
                &[(OAUTH_CALLBACK, "app://cb")],
                "feedface",
                1_700_000_000,
            )
            .unwrap();
        let b = signer
            .signed_url_at(
                "GET",
                "https://id.example.com/oauth/request_token",
                &[(OAUTH_CALLBACK, "app://cb")],
                "feedface",
                1_700_000_000,
            )
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn signed_url_carries_protocol_parameters() {
        let signer = RequestSigner::new("ck", "cs").with_token("at1", "as1");
        let signed = signer
            .signed_url("GET", "https://api.example.com/v1/items?page=2", &[])
            .unwrap();

        assert!(signed.starts_with("https://api.example.com/v1/items?"));
        assert!(signed.contains("page=2"), "original query kept: {signed}");
        assert!(signed.contains("oauth_consumer_key=ck"));
        assert!(signed.contains("oauth_token=at1"));
        assert!(signed.contains("oauth_signature_method=HMAC-SHA1"));
        assert!(signed.contains("oauth_version=1.0"));
        assert!(signed.contains("oauth_timestamp="));
        assert!(signed.contains("oauth_nonce="));
        assert!(signed.contains("oauth_signature="));
    }

    #[test]
    fn signed_url_without_token_omits_oauth_token() {
        let signer = RequestSigner::new("ck", "cs");
        let signed = signer
            .signed_url(
                "GET",
                "https://id.example.com/oauth/request_token",
                &[(OAUTH_CALLBACK, "app://cb")],
            )
            .unwrap();
        assert!(!signed.contains("oauth_token="));
        assert!(signed.contains("oauth_callback=app%3A%2F%2Fcb"));
    }

    #[test]
    fn token_secret_changes_signature() {
        let url = "https://api.example.com/v1/items";
        let a = RequestSigner::new("ck", "cs")
            .with_token("t", "secret-one")
            .signed_url_at("GET", url, &[], "feedface", 1_700_000_000)
            .unwrap();
        let b = RequestSigner::new("ck", "cs")
            .with_token("t", "secret-two")
            .signed_url_at("GET", url, &[], "feedface", 1_700_000_000)
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn nonces_do_not_repeat() {
        assert_ne!(generate_nonce(), generate_nonce());
        assert_eq!(generate_nonce().len(), 32);
    }

    #[test]
    fn unsignable_url_is_a_protocol_error() {
        let signer = RequestSigner::new("ck", "cs");
        let err = signer.signed_url("GET", "not a url", &[]).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
