//! Storage tiers for the persisted credential.
//!
//! Two logical slots (`token` + `expiresAt`) exist per tier. The durable
//! tier survives restarts and backs "remember me"; the ephemeral tier lives
//! only as long as the client. At most one tier is authoritative at a time.

use std::path::PathBuf;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The persisted credential plus its paired expiry marker (epoch millis).
/// The marker lets `restore` drop a stale remember-me without decoding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub token: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
}

pub trait CredentialVault: Send + Sync {
    fn store(&self, credential: &StoredCredential) -> Result<()>;
    fn load(&self) -> Result<Option<StoredCredential>>;
    fn erase(&self) -> Result<()>;
}

/// Ephemeral tier: gone when the process is.
#[derive(Default)]
pub struct MemoryVault {
    slot: Mutex<Option<StoredCredential>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialVault for MemoryVault {
    fn store(&self, credential: &StoredCredential) -> Result<()> {
        *self.slot.lock() = Some(credential.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<StoredCredential>> {
        Ok(self.slot.lock().clone())
    }

    fn erase(&self) -> Result<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}

/// Durable tier: one small JSON file, rewritten whole on every store.
pub struct FileVault {
    path: PathBuf,
}

impl FileVault {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl CredentialVault for FileVault {
    fn store(&self, credential: &StoredCredential) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating {}", dir.display()))?;
            }
        }
        let bytes = serde_json::to_vec(credential)?;
        std::fs::write(&self.path, bytes)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }

    fn load(&self) -> Result<Option<StoredCredential>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()))
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(c) => Ok(Some(c)),
            Err(e) => {
                // A corrupt slot is treated as absent rather than fatal.
                warn!(path = %self.path.display(), error = %e, "unreadable credential slot");
                Ok(None)
            }
        }
    }

    fn erase(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("erasing {}", self.path.display())),
        }
    }
}
