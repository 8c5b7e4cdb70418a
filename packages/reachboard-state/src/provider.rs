//! Contracts for the collaborators the state layer talks to.
//!
//! - [`DataProvider`]: the remote analytics source, one call per domain
//! - [`AuthProvider`]: login, session check and logout
//! - [`CredentialStore`]: where the single opaque session token lives

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::User;
use crate::error::AuthError;
use crate::models::Domain;

/// Remote source of analytics data.
///
/// Returns loosely shaped JSON; the orchestrator decodes and validates it.
/// The error's display text becomes the domain's `error` message.
#[async_trait]
pub trait DataProvider: Send + Sync + 'static {
    async fn fetch(&self, domain: Domain) -> Result<Value>;
}

/// What a successful login hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginGrant {
    pub token: String,
    pub user: User,
}

#[async_trait]
pub trait AuthProvider: Send + Sync + 'static {
    async fn login(&self, identifier: &str, secret: &str) -> Result<LoginGrant, AuthError>;

    /// Resolve the user a stored token belongs to. `Ok(None)` means the token
    /// is no longer valid.
    async fn check_session(&self, token: &str) -> Result<Option<User>, AuthError>;

    async fn logout(&self) -> Result<(), AuthError>;
}

/// Persistence for the session token.
pub trait CredentialStore: Send + Sync + 'static {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

// =============================================================================
// In-memory credentials
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `token` already stored, as after a previous login.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        // Recover from poisoning; the slot holds no invariants.
        self.token.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.slot().clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.slot() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}

// =============================================================================
// File-backed credentials
// =============================================================================

/// Keeps the token in a plain file. A missing or blank file means no token.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read token from {}", self.path.display())),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        // Owner-only, also for a file created earlier with looser bits.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to restrict {}", self.path.display()))?;
        }

        file.write_all(token.as_bytes())
            .with_context(|| format!("Failed to write token to {}", self.path.display()))
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove token at {}", self.path.display())),
        }
    }
}
