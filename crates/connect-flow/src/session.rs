//! Stored-session helpers
//!
//! Login state lives entirely in the token store. A user counts as logged
//! in only when a complete access pair is stored AND the registered flag
//! is set; an interrupted flow can leave one without the other, and both
//! readings must treat that as "not logged in".

use connect_oauth::TokenPair;
use tracing::debug;

use crate::store::{StoreError, TokenStore, keys};

/// The stored access pair, or `None` when either half is missing or empty.
///
/// The pair is written as two independent keys, so a partial write is a
/// reachable state and reads as absent.
pub async fn stored_access_pair(
    store: &dyn TokenStore,
) -> Result<Option<TokenPair>, StoreError> {
    let token = store.get(keys::USER_TOKEN).await?;
    let secret = store.get(keys::USER_SECRET).await?;
    match (token, secret) {
        (Some(token), Some(secret)) if !token.is_empty() && !secret.is_empty() => {
            Ok(Some(TokenPair { token, secret }))
        }
        _ => Ok(None),
    }
}

/// Whether the post-login registration step has confirmed.
pub async fn is_user_registered(store: &dyn TokenStore) -> Result<bool, StoreError> {
    Ok(store.get(keys::USER_REGISTERED).await?.as_deref() == Some("true"))
}

pub async fn set_user_registered(
    store: &dyn TokenStore,
    registered: bool,
) -> Result<(), StoreError> {
    store
        .set(keys::USER_REGISTERED, if registered { "true" } else { "false" })
        .await
}

/// Logged in = complete access pair AND registered flag.
pub async fn is_user_logged_in(store: &dyn TokenStore) -> Result<bool, StoreError> {
    Ok(stored_access_pair(store).await?.is_some() && is_user_registered(store).await?)
}

/// Clear every stored credential and reset the registered flag.
pub async fn log_out(store: &dyn TokenStore) -> Result<(), StoreError> {
    debug!("clearing stored session");
    set_user_registered(store, false).await?;
    store.remove(keys::REQUEST_TOKEN).await?;
    store.remove(keys::REQUEST_SECRET).await?;
    store.remove(keys::USER_TOKEN).await?;
    store.remove(keys::USER_SECRET).await?;
    Ok(())
}
