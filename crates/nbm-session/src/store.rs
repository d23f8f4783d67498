//! Durable storage for the cached credential
//!
//! The store holds at most one [`Credential`], under [`CREDENTIAL_KEY`]. Entries are only ever
//! written after a successful, non-empty acquisition, and are only removed by an explicit
//! [`CredentialStore::clear`].

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::Credential;

/// Key under which the credential is persisted
pub const CREDENTIAL_KEY: &str = "cookies";

const STORE_DIR_NAME: &str = "nbm";
const STORE_FILE_NAME: &str = "session.json";

/// An error resulting from operations on a credential store.
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    /// Config directory not found (XDG_CONFIG_HOME, HOME or APPDATA not set).
    #[error("Config directory not found (set XDG_CONFIG_HOME, HOME or APPDATA)")]
    ConfigDirUnavailable,

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document is not valid JSON.
    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    /// The document exists but the credential entry is not a string.
    #[error("Stored credential entry is malformed")]
    MalformedEntry,

    /// Empty credentials are never persisted.
    #[error("Refusing to persist an empty credential")]
    EmptyCredential,
}

/// Key/value persistence for the cached credential
///
/// Implementations must guarantee that the next [`load`](CredentialStore::load) reflects the most
/// recent successful [`save`](CredentialStore::save).
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns the cached credential, or `None` if nothing has been written
    async fn load(&self) -> Result<Option<Credential>, CredentialStoreError>;

    /// Replaces the cached credential
    async fn save(&self, credential: Credential) -> Result<(), CredentialStoreError>;

    /// Removes the cached credential, returning whether one was present
    async fn clear(&self) -> Result<bool, CredentialStoreError>;
}

/// In-memory store, shared between clones
#[derive(Debug, Default, Clone)]
pub struct InMemoryCredentialStore {
    value: Arc<RwLock<Option<Credential>>>,
}

impl InMemoryCredentialStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `credential`
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            value: Arc::new(RwLock::new(Some(credential))),
        }
    }
}

#[async_trait::async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self) -> Result<Option<Credential>, CredentialStoreError> {
        Ok(self.value.read().await.clone())
    }

    async fn save(&self, credential: Credential) -> Result<(), CredentialStoreError> {
        if credential.is_empty() {
            return Err(CredentialStoreError::EmptyCredential);
        }
        *self.value.write().await = Some(credential);
        Ok(())
    }

    async fn clear(&self) -> Result<bool, CredentialStoreError> {
        Ok(self.value.write().await.take().is_some())
    }
}

/// Store backed by a JSON document on disk
///
/// The document is a single JSON object; the credential lives under [`CREDENTIAL_KEY`] and any
/// other keys are preserved across writes. Writes go to a temporary sibling file which is then
/// renamed over the document, so readers never observe a partially written entry.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at [`FileCredentialStore::default_path`]
    pub fn open_default() -> Result<Self, CredentialStoreError> {
        Ok(Self::new(Self::default_path()?))
    }

    /// Default document location
    ///
    /// `$XDG_CONFIG_HOME/nbm/session.json`, falling back to `$HOME/.config/nbm/session.json` and
    /// then `%APPDATA%\nbm\session.json`.
    pub fn default_path() -> Result<PathBuf, CredentialStoreError> {
        let dir = resolve_config_dir(
            non_empty_env("XDG_CONFIG_HOME"),
            non_empty_env("HOME"),
            non_empty_env("APPDATA"),
        )?;
        Ok(dir.join(STORE_FILE_NAME))
    }

    /// Location of the backing document
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<Option<Map<String, Value>>, CredentialStoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(Some(Map::new()));
        }

        Ok(Some(serde_json::from_str(&contents)?))
    }

    async fn write_document(
        &self,
        document: &Map<String, Value>,
    ) -> Result<(), CredentialStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent).await?;
        }

        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        let contents = serde_json::to_vec_pretty(document)?;
        tokio::fs::write(&temp_path, contents).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        debug!(path = %self.path.display(), "Wrote credential store");
        Ok(())
    }
}

#[async_trait::async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Credential>, CredentialStoreError> {
        let Some(document) = self.read_document().await? else {
            return Ok(None);
        };

        match document.get(CREDENTIAL_KEY) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) if value.is_empty() => Ok(None),
            Some(Value::String(value)) => Ok(Some(Credential::new(value.clone()))),
            Some(_) => Err(CredentialStoreError::MalformedEntry),
        }
    }

    async fn save(&self, credential: Credential) -> Result<(), CredentialStoreError> {
        if credential.is_empty() {
            return Err(CredentialStoreError::EmptyCredential);
        }

        // An unreadable document is replaced rather than blocking the write.
        let mut document = match self.read_document().await {
            Ok(document) => document.unwrap_or_default(),
            Err(CredentialStoreError::Serde(e)) => {
                warn!(
                    path = %self.path.display(),
                    "Replacing unreadable credential store: {e}"
                );
                Map::new()
            }
            Err(e) => return Err(e),
        };

        document.insert(
            CREDENTIAL_KEY.to_owned(),
            Value::String(credential.into_inner()),
        );
        self.write_document(&document).await
    }

    async fn clear(&self) -> Result<bool, CredentialStoreError> {
        let Some(mut document) = self.read_document().await? else {
            return Ok(false);
        };

        if document.remove(CREDENTIAL_KEY).is_none() {
            return Ok(false);
        }

        self.write_document(&document).await?;
        Ok(true)
    }
}

fn non_empty_env(name: &str) -> Option<PathBuf> {
    let value: OsString = std::env::var_os(name)?;
    if value.to_string_lossy().trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(value))
}

fn resolve_config_dir(
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
    app_data: Option<PathBuf>,
) -> Result<PathBuf, CredentialStoreError> {
    if let Some(xdg) = xdg_config_home {
        return Ok(xdg.join(STORE_DIR_NAME));
    }
    if let Some(home) = home {
        return Ok(home.join(".config").join(STORE_DIR_NAME));
    }
    if let Some(app_data) = app_data {
        return Ok(app_data.join(STORE_DIR_NAME));
    }

    Err(CredentialStoreError::ConfigDirUnavailable)
}

/// Ensure the store directory exists with owner-only permissions
async fn ensure_dir(dir: &Path) -> Result<(), CredentialStoreError> {
    if tokio::fs::try_exists(dir).await? {
        return Ok(());
    }

    tokio::fs::create_dir_all(dir).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        tokio::fs::set_permissions(dir, perms).await?;
    }

    Ok(())
}
