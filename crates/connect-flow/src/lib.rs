//! Web login flow orchestration
//!
//! Drives the OAuth 1.0a three-legged login end to end and owns the stored
//! session afterwards. The pieces a host must supply are narrow trait
//! seams: a user agent that can display the authorization page and report
//! the terminal navigation, a durable key-value store, and optionally a
//! post-login registration step.
//!
//! Flow lifecycle:
//! 1. `AuthFlowController::run()` probes the clock gate (advisory: only a
//!    confirmed out-of-window clock aborts)
//! 2. Obtains a request token and persists the transient pair
//! 3. Hands the authorization URL to the [`AuthorizationBrowser`] and
//!    suspends until a terminal navigation arrives
//! 4. Captures the callback, verifies the returned token, exchanges the
//!    verifier for an access pair
//! 5. Persists the access pair, runs the post-login hook, marks the user
//!    registered, and reports a [`FlowOutcome`]
//!
//! Every attempt is independent: the request pair never survives a
//! terminal state, and a second `run()` on a busy controller is rejected.
//! [`ProtectedResourceInvoker`] makes signed API calls with the stored
//! session once a flow has succeeded.

pub mod browser;
pub mod clock;
pub mod controller;
pub mod error;
pub mod exchange;
pub mod invoker;
pub mod session;
pub mod store;

pub use browser::{AuthorizationBrowser, Navigation, PostLoginHook};
pub use clock::{ClockGate, SntpClockGate};
pub use controller::{AuthFlowController, FlowOutcome};
pub use error::FlowError;
pub use exchange::TokenExchange;
pub use invoker::{InvokeError, ProtectedResourceInvoker};
pub use session::{is_user_logged_in, log_out, stored_access_pair};
pub use store::{FileTokenStore, MemoryTokenStore, StoreError, TokenStore, keys};
