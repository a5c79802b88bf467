//! Token-service seam between the flow and the OAuth client
//!
//! The controller and invoker depend on this trait instead of the concrete
//! HTTP client, so hosts and tests can substitute doubles and the flow's
//! call-ordering guarantees can be asserted without a network.
//!
//! Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
//! (`Arc<dyn TokenExchange>`).

use std::future::Future;
use std::pin::Pin;

use connect_oauth::{OAuthClient, Result, TokenPair};

/// The three signed operations the flow performs against the provider.
pub trait TokenExchange: Send + Sync {
    /// Obtain a request token, declaring the configured callback.
    fn request_token<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<TokenPair>> + Send + 'a>>;

    /// Exchange an authorized request pair plus verifier for an access pair.
    fn access_token<'a>(
        &'a self,
        request: &'a TokenPair,
        verifier: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TokenPair>> + Send + 'a>>;

    /// Invoke a protected resource signed with the access pair.
    fn invoke<'a>(
        &'a self,
        access: &'a TokenPair,
        method: &'a str,
        url: &'a str,
        body: Option<String>,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;
}

impl TokenExchange for OAuthClient {
    fn request_token<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<TokenPair>> + Send + 'a>> {
        Box::pin(self.get_request_token())
    }

    fn access_token<'a>(
        &'a self,
        request: &'a TokenPair,
        verifier: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TokenPair>> + Send + 'a>> {
        Box::pin(self.get_access_token(request, verifier))
    }

    fn invoke<'a>(
        &'a self,
        access: &'a TokenPair,
        method: &'a str,
        url: &'a str,
        body: Option<String>,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(OAuthClient::invoke(self, access, method, url, body))
    }
}
