//! Session credential storage.
//!
//! The login flow writes the bearer token; everything else only reads it.
//! The one exception is an authorization failure, which clears the token so
//! the operator has to log in again.

use crate::config::Config;
use crate::sync::scope::{TeardownReason, ViewScope};

use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

// ============================================================================
// Token Store
// ============================================================================

/// Storage for the backend bearer token.
pub trait TokenStore: Send + Sync {
    /// The current token, if one is stored.
    fn load(&self) -> Option<String>;

    /// Forget the stored token.
    fn clear(&self);
}

/// In-process token store, used when the token comes from the environment
/// and in tests.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.trim().is_empty())),
        }
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn clear(&self) {
        self.token.write().take();
    }
}

/// Token persisted as a single line in a file under the state directory.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Persist a token obtained from the login flow.
    pub fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }
        std::fs::write(&self.path, token.trim())
            .with_context(|| format!("Cannot write token file '{}'", self.path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Cannot restrict '{}'", self.path.display()))?;
        }

        info!("Session token saved to {}", self.path.display());
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        let token = content.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!("Session token removed from {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove token file {}: {}", self.path.display(), e),
        }
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Read handle onto the token store shared by the poller, the subscriber
/// and the pairing controller.
#[derive(Clone)]
pub struct Credentials {
    store: Arc<dyn TokenStore>,
}

impl Credentials {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// `PAIRWATCH_TOKEN` if set, otherwise the token file written by login.
    pub fn from_config(config: &Config) -> Self {
        match &config.env_token {
            Some(token) => Self::fixed(token.clone()),
            None => Self::new(Arc::new(FileTokenStore::new(config.token_file()))),
        }
    }

    /// Credentials backed by a fixed in-memory token.
    pub fn fixed(token: impl Into<String>) -> Self {
        Self::new(Arc::new(MemoryTokenStore::new(Some(token.into()))))
    }

    pub fn token(&self) -> Option<String> {
        self.store.load()
    }

    /// Escalate an authorization failure: forget the token and close the
    /// scope that was using it.
    pub fn revoke(&self, scope: Option<&ViewScope>) {
        warn!("Backend rejected the session credential; clearing it");
        self.store.clear();
        if let Some(scope) = scope {
            scope.close(TeardownReason::Unauthorized);
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("present", &self.store.load().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_ignores_blank_tokens() {
        assert!(MemoryTokenStore::new(Some("  ".into())).load().is_none());
        assert_eq!(
            MemoryTokenStore::new(Some("abc".into())).load().as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn file_store_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested").join("token"));

        assert!(store.load().is_none());
        store.save("secret\n").unwrap();
        assert_eq!(store.load().as_deref(), Some("secret"));

        store.clear();
        assert!(store.load().is_none());
        // Clearing twice is harmless.
        store.clear();
    }

    #[test]
    fn env_token_takes_precedence_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.state_dir = dir.path().to_path_buf();
        FileTokenStore::new(config.token_file()).save("from-file").unwrap();

        assert_eq!(Credentials::from_config(&config).token().as_deref(), Some("from-file"));

        config.env_token = Some("from-env".into());
        assert_eq!(Credentials::from_config(&config).token().as_deref(), Some("from-env"));
    }

    #[test]
    fn revoke_clears_token_and_closes_scope() {
        let creds = Credentials::fixed("abc");
        let scope = ViewScope::new();

        creds.revoke(Some(&scope));

        assert!(creds.token().is_none());
        assert_eq!(scope.reason(), Some(TeardownReason::Unauthorized));
    }
}
