//! Durable token storage
//!
//! The flow treats persistence as a plain namespaced string map: `get`,
//! `set`, `remove`, nothing else. There is no cross-key atomicity: a
//! token/secret pair is written as two independent `set` calls, and
//! readers treat an incomplete pair as absent.
//!
//! `FileTokenStore` is the standard implementation: a JSON file holding
//! the map, all writes serialized through a tokio Mutex and persisted via
//! atomic temp-file + rename so a crash never leaves a torn file.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::sync::Mutex;
use tracing::{debug, info};

/// Keys the login flow uses within the store namespace.
pub mod keys {
    /// Transient pair, held only while a flow awaits its callback.
    pub const REQUEST_TOKEN: &str = "request_token";
    pub const REQUEST_SECRET: &str = "request_secret";
    /// Durable access pair.
    pub const USER_TOKEN: &str = "user_token";
    pub const USER_SECRET: &str = "user_secret";
    /// `"true"` once the post-login step has confirmed.
    pub const USER_REGISTERED: &str = "user_registered";
}

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(String),

    #[error("corrupt store file: {0}")]
    Corrupt(String),
}

/// Namespaced durable string map consumed by the flow.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn TokenStore>`).
pub trait TokenStore: Send + Sync {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, StoreError>> + Send + 'a>>;

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;

    fn remove<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;
}

/// File-backed store: one JSON object per namespace file.
pub struct FileTokenStore {
    path: PathBuf,
    state: Mutex<HashMap<String, String>>,
}

impl FileTokenStore {
    /// Load the store from the given file path.
    ///
    /// A missing file is a cold start: the store begins empty and the file
    /// is created on the first write.
    pub async fn load(path: PathBuf) -> Result<Self, StoreError> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| StoreError::Io(format!("reading store file: {e}")))?;
            let entries: HashMap<String, String> = serde_json::from_str(&contents)
                .map_err(|e| StoreError::Corrupt(format!("parsing store file: {e}")))?;
            info!(path = %path.display(), entries = entries.len(), "loaded token store");
            entries
        } else {
            info!(path = %path.display(), "store file not found, starting empty");
            HashMap::new()
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }
}

impl TokenStore for FileTokenStore {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state.get(key).cloned())
        })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.insert(key.to_owned(), value.to_owned());
            write_atomic(&self.path, &state).await
        })
    }

    fn remove<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if state.remove(key).is_some() {
                write_atomic(&self.path, &state).await?;
            }
            Ok(())
        })
    }
}

/// Write the map to disk atomically.
///
/// Writes a temp file in the same directory, then renames it over the
/// target. Permissions are 0600 since the file holds token secrets.
async fn write_atomic(path: &Path, data: &HashMap<String, String>) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| StoreError::Corrupt(format!("serializing store: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| StoreError::Io("store path has no parent directory".into()))?;
    let tmp_path = dir.join(format!(".tokens.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| StoreError::Io(format!("writing temp store file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| StoreError::Io(format!("setting store file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| StoreError::Io(format!("renaming temp store file: {e}")))?;

    debug!(path = %path.display(), "persisted token store");
    Ok(())
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryTokenStore {
    state: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, StoreError>> + Send + 'a>> {
        Box::pin(async move { Ok(self.state.lock().await.get(key).cloned()) })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(async move {
            self.state
                .lock()
                .await
                .insert(key.to_owned(), value.to_owned());
            Ok(())
        })
    }

    fn remove<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(async move {
            self.state.lock().await.remove(key);
            Ok(())
        })
    }
}
