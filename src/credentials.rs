use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

/// Opaque connect credential. Debug output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSecret(String);

impl ConnectionSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ConnectionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConnectionSecret(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("no connection secret stored")]
    Missing,

    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Secure credential storage, consumed through this seam only. Key storage
/// and biometric gating live behind it, outside this layer.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn connection_secret(&self) -> Result<ConnectionSecret, CredentialError>;
}

/// File-backed store used by the CLI. The secret is the trimmed file body.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn connection_secret(&self) -> Result<ConnectionSecret, CredentialError> {
        let body = std::fs::read_to_string(&self.path).map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                CredentialError::Missing
            } else {
                CredentialError::Unavailable(format!("read {}: {err}", self.path.display()))
            }
        })?;

        let secret = body.trim();
        if secret.is_empty() {
            return Err(CredentialError::Missing);
        }
        Ok(ConnectionSecret::new(secret))
    }
}

/// In-memory store for tests; `empty()` simulates a wallet with no stored
/// credential.
pub struct MemoryCredentialStore {
    secret: Option<ConnectionSecret>,
}

impl MemoryCredentialStore {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(ConnectionSecret::new(secret)),
        }
    }

    pub fn empty() -> Self {
        Self { secret: None }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn connection_secret(&self) -> Result<ConnectionSecret, CredentialError> {
        self.secret.clone().ok_or(CredentialError::Missing)
    }
}
