//! User-agent and post-login seams
//!
//! The flow never renders anything. It hands the authorization URL to a
//! host-supplied user agent and suspends until that collaborator reports
//! the one terminal navigation it observed: either the callback redirect
//! or the denied page. How the host catches redirects (embedded web view,
//! loopback server, manual paste) is its own business.

use std::future::Future;
use std::pin::Pin;

/// Terminal event reported by the user agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// The user agent reached `url`, a callback or denied prefix.
    ReachedUrl(String),
    /// The hosting surface went away before any terminal navigation.
    /// The flow ends as Cancelled, never as an error.
    Dismissed,
}

/// Displays the authorization page and reports the terminal navigation.
pub trait AuthorizationBrowser: Send + Sync {
    fn open<'a>(
        &'a self,
        authorize_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Navigation> + Send + 'a>>;
}

/// Optional caller-supplied step that runs after the access pair is
/// persisted. The user is only marked registered once this confirms; a
/// controller without a hook confirms automatically.
pub trait PostLoginHook: Send + Sync {
    fn confirm<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;
}
