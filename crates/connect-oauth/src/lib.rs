//! OAuth 1.0a client library
//!
//! Builds and sends HMAC-SHA1-signed requests for the three-legged login
//! flow and for protected resource calls. This crate is a standalone
//! library with no knowledge of the flow orchestration; it can be tested
//! and used independently.
//!
//! Operation sequence during a login:
//! 1. Flow calls `OAuthClient::get_request_token()` (signed with the
//!    consumer credentials only, declaring the callback)
//! 2. User authorizes via the URL from `authorize_url()`
//! 3. Flow calls `OAuthClient::get_access_token()` with the request pair
//!    and the verifier captured from the callback redirect
//! 4. Later API calls go through `OAuthClient::invoke()` signed with the
//!    stored access pair
//!
//! The service provider only reads OAuth parameters from the URL query
//! string, so every signed request carries its protocol parameters there
//! rather than in an Authorization header.

pub mod client;
pub mod config;
pub mod error;
pub mod signer;

pub use client::{OAuthClient, TokenPair, authorize_url};
pub use config::{ConnectConfig, ConsumerConfig, ServiceEndpoints};
pub use error::{Error, NetworkKind, Result, classify_transport_error};
