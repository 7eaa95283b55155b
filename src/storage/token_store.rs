use crate::constants::TOKEN_STORAGE_KEY;
use crate::error::AppError;
use crate::session::interface::BearerToken;
use crate::storage::config::StorageConfig;
use crate::utils::sync::MutexExt;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Holds the single bearer token of the signed-in user.
#[cfg_attr(test, mockall::automock)]
pub trait TokenStore: Send + Sync {
    fn token(&self) -> Option<BearerToken>;

    fn set_token(&self, token: &BearerToken) -> Result<(), AppError>;

    fn clear(&self) -> Result<(), AppError>;
}

#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    token: Mutex<Option<BearerToken>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: BearerToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }
}

impl TokenStore for InMemoryTokenStore {
    fn token(&self) -> Option<BearerToken> {
        self.token.lock_or_recover().clone()
    }

    fn set_token(&self, token: &BearerToken) -> Result<(), AppError> {
        *self.token.lock_or_recover() = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        *self.token.lock_or_recover() = None;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    #[serde(rename = "BearerToken")]
    bearer_token: BearerToken,
}

/// Keeps the token in a small JSON file so it survives restarts.
///
/// A missing, unreadable or corrupt file reads as "no token".
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.token_path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn token(&self) -> Option<BearerToken> {
        let _guard = self.lock.lock_or_recover();
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read token file {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str::<StoredToken>(&raw) {
            Ok(stored) => Some(stored.bearer_token),
            Err(e) => {
                warn!("Ignoring corrupt token file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn set_token(&self, token: &BearerToken) -> Result<(), AppError> {
        let _guard = self.lock.lock_or_recover();
        let stored = StoredToken {
            bearer_token: token.clone(),
        };
        let json = serde_json::to_string(&stored)
            .map_err(|e| AppError::Storage(format!("Failed to serialize {TOKEN_STORAGE_KEY}: {e}")))?;

        // write-then-rename so a crash never leaves half a token behind
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Stored bearer token {} at {}", token, self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        let _guard = self.lock.lock_or_recover();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
