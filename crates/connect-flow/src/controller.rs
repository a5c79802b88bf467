//! Login flow state machine
//!
//! One `run()` call drives a complete three-legged login:
//!
//! ```text
//! Idle → CheckingClock → ObtainingRequestToken → AwaitingUserAuthorization
//!      → CapturingCallback → ExchangingToken → Completed(*)
//! ```
//!
//! Stages execute strictly in order; no two network steps of the same
//! attempt are ever in flight together. Every attempt is independent: the
//! transient request pair is cleared at every terminal state, so a failed
//! attempt leaves nothing behind and a retry restarts from the top.
//! Starting a second attempt while one is in flight is rejected.

use std::sync::Arc;

use connect_oauth::{ConnectConfig, TokenPair, authorize_url};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::browser::{AuthorizationBrowser, Navigation, PostLoginHook};
use crate::clock::ClockGate;
use crate::error::FlowError;
use crate::exchange::TokenExchange;
use crate::session;
use crate::store::{TokenStore, keys};

/// Terminal result of one login attempt, the only artifact callers see.
#[derive(Debug)]
pub enum FlowOutcome {
    /// Access pair persisted and registration confirmed.
    Success,
    /// The user refused at the authorization page. Not an error.
    Denied,
    /// The hosting surface went away before a terminal navigation.
    Cancelled,
    /// Any typed failure; the caller decides whether to restart the flow.
    Failed(FlowError),
}

impl FlowOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            FlowOutcome::Success => "success",
            FlowOutcome::Denied => "denied",
            FlowOutcome::Cancelled => "cancelled",
            FlowOutcome::Failed(_) => "failed",
        }
    }
}

/// Stage names for trace output; the flow advances through them in order.
#[derive(Debug, Clone, Copy)]
enum FlowStage {
    CheckingClock,
    ObtainingRequestToken,
    AwaitingUserAuthorization,
    CapturingCallback,
    ExchangingToken,
}

impl FlowStage {
    fn label(self) -> &'static str {
        match self {
            FlowStage::CheckingClock => "checking_clock",
            FlowStage::ObtainingRequestToken => "obtaining_request_token",
            FlowStage::AwaitingUserAuthorization => "awaiting_user_authorization",
            FlowStage::CapturingCallback => "capturing_callback",
            FlowStage::ExchangingToken => "exchanging_token",
        }
    }
}

/// Orchestrates one login flow over the injected collaborators.
pub struct AuthFlowController {
    config: Arc<ConnectConfig>,
    exchange: Arc<dyn TokenExchange>,
    clock: Arc<dyn ClockGate>,
    browser: Arc<dyn AuthorizationBrowser>,
    store: Arc<dyn TokenStore>,
    post_login: Option<Arc<dyn PostLoginHook>>,
    in_flight: Mutex<()>,
}

impl AuthFlowController {
    pub fn new(
        config: Arc<ConnectConfig>,
        exchange: Arc<dyn TokenExchange>,
        clock: Arc<dyn ClockGate>,
        browser: Arc<dyn AuthorizationBrowser>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            config,
            exchange,
            clock,
            browser,
            store,
            post_login: None,
            in_flight: Mutex::new(()),
        }
    }

    /// Attach a caller-supplied registration step; the user is only marked
    /// registered once it confirms.
    pub fn with_post_login_hook(mut self, hook: Arc<dyn PostLoginHook>) -> Self {
        self.post_login = Some(hook);
        self
    }

    /// Run one complete login attempt to a terminal outcome.
    ///
    /// At most one attempt per controller may be in flight; a concurrent
    /// call is rejected with `AlreadyInProgress` rather than superseding
    /// the running one.
    pub async fn run(&self) -> FlowOutcome {
        let Ok(_guard) = self.in_flight.try_lock() else {
            return FlowOutcome::Failed(FlowError::AlreadyInProgress);
        };

        let outcome = match self.drive().await {
            Ok(outcome) => outcome,
            Err(err) => FlowOutcome::Failed(err),
        };

        // The request pair never survives a terminal state
        if let Err(err) = self.discard_request_pair().await {
            warn!(error = %err, "failed to clear request pair after flow");
        }

        info!(outcome = outcome.label(), "login flow completed");
        outcome
    }

    async fn drive(&self) -> Result<FlowOutcome, FlowError> {
        debug!(stage = FlowStage::CheckingClock.label(), "flow started");
        match self.clock.check().await {
            Ok(offset) if !offset.is_within_acceptable_offset() => {
                warn!(
                    offset_millis = offset.offset_millis,
                    "local clock outside the signature acceptance window"
                );
                return Err(FlowError::ClockSkew {
                    offset_millis: offset.offset_millis,
                });
            }
            Ok(offset) => {
                debug!(offset_millis = offset.offset_millis, "clock within window");
            }
            // Advisory probe: no answer means proceed
            Err(err) => {
                warn!(error = %err, "clock probe unavailable, proceeding with login");
            }
        }

        debug!(stage = FlowStage::ObtainingRequestToken.label(), "requesting token");
        let request_pair = self.exchange.request_token().await?;
        self.store
            .set(keys::REQUEST_TOKEN, &request_pair.token)
            .await?;
        self.store
            .set(keys::REQUEST_SECRET, &request_pair.secret)
            .await?;

        let authorize = authorize_url(
            &self.config.endpoints,
            &self.config.consumer.callback_url,
            &request_pair.token,
        );
        debug!(
            stage = FlowStage::AwaitingUserAuthorization.label(),
            url = %authorize,
            "handing off to user agent"
        );
        let url = match self.browser.open(&authorize).await {
            Navigation::ReachedUrl(url) => url,
            Navigation::Dismissed => return Ok(FlowOutcome::Cancelled),
        };

        debug!(
            stage = FlowStage::CapturingCallback.label(),
            url = %url,
            "terminal navigation observed"
        );
        if url.starts_with(&self.config.endpoints.denied_url) {
            return Ok(FlowOutcome::Denied);
        }
        if !url.starts_with(&self.config.consumer.callback_url) {
            return Err(FlowError::Protocol(format!(
                "terminal URL matches neither callback nor denied prefix: {url}"
            )));
        }

        let (returned_token, verifier) = extract_callback_params(&url)?;
        if returned_token != request_pair.token {
            return Err(FlowError::Protocol(format!(
                "callback oauth_token {returned_token} does not match the issued request token"
            )));
        }

        debug!(stage = FlowStage::ExchangingToken.label(), "exchanging verifier");
        let access_pair = self.exchange.access_token(&request_pair, &verifier).await?;
        self.store_access_pair(&access_pair).await?;

        if let Some(hook) = &self.post_login {
            hook.confirm().await.map_err(FlowError::Registration)?;
        }
        session::set_user_registered(self.store.as_ref(), true).await?;

        Ok(FlowOutcome::Success)
    }

    async fn store_access_pair(&self, pair: &TokenPair) -> Result<(), FlowError> {
        // Two independent writes; readers treat a torn pair as absent
        self.store.set(keys::USER_TOKEN, &pair.token).await?;
        self.store.set(keys::USER_SECRET, &pair.secret).await?;
        Ok(())
    }

    async fn discard_request_pair(&self) -> Result<(), FlowError> {
        self.store.remove(keys::REQUEST_TOKEN).await?;
        self.store.remove(keys::REQUEST_SECRET).await?;
        Ok(())
    }
}

/// Pull `oauth_token` and `oauth_verifier` out of the callback URL.
fn extract_callback_params(url: &str) -> Result<(String, String), FlowError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| FlowError::Protocol(format!("unparsable callback URL {url}: {e}")))?;
    let mut token = None;
    let mut verifier = None;
    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            "oauth_token" => token = Some(value.into_owned()),
            "oauth_verifier" => verifier = Some(value.into_owned()),
            _ => {}
        }
    }
    match (token, verifier) {
        (Some(token), Some(verifier)) => Ok((token, verifier)),
        _ => Err(FlowError::Protocol(format!(
            "callback missing oauth_token or oauth_verifier: {url}"
        ))),
    }
}
