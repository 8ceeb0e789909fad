// crab-client/src/credential.rs
// 凭证存储 - 内存 / JSON 文件

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ClientResult;

/// Opaque bearer credential.
///
/// The client never inspects it; invalidity is only learned from a rejected
/// request.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl From<&str> for Credential {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for Credential {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// Holder of the current access credential.
///
/// No expiry logic: entries live until overwritten or cleared.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<Credential>;
    fn set(&self, credential: Credential) -> ClientResult<()>;
    /// Remove the credential and any cached session artifacts
    fn clear(&self) -> ClientResult<()>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    current: RwLock<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: impl Into<Credential>) -> Self {
        Self {
            current: RwLock::new(Some(credential.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<Credential> {
        self.current.read().clone()
    }

    fn set(&self, credential: Credential) -> ClientResult<()> {
        *self.current.write() = Some(credential);
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        *self.current.write() = None;
        Ok(())
    }
}

/// On-disk session record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    access_token: String,
    saved_at: i64,
}

/// JSON file backed store, so a restart keeps the session.
///
/// Reads are served from memory; the file is only touched on set/clear.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    current: RwLock<Option<Credential>>,
}

impl FileCredentialStore {
    /// Open the store at `path`, loading a previously saved session if any.
    ///
    /// An unreadable or corrupt file is treated as "no session".
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = match Self::load(&path) {
            Ok(session) => session.map(|s| Credential::new(s.access_token)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Discarding unreadable session cache");
                None
            }
        };
        Self {
            path,
            current: RwLock::new(current),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> ClientResult<Option<StoredSession>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, credential: &Credential) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let session = StoredSession {
            access_token: credential.as_str().to_string(),
            saved_at: chrono::Utc::now().timestamp_millis(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&session)?)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<Credential> {
        self.current.read().clone()
    }

    fn set(&self, credential: Credential) -> ClientResult<()> {
        let mut current = self.current.write();
        self.save(&credential)?;
        *current = Some(credential);
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        let mut current = self.current.write();
        *current = None;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
