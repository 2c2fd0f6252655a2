//! SMAPI Token Store
//!
//! Linked-account credentials are long-lived bearer secrets. They live in a
//! single JSON file keyed by service id, then household id:
//!
//! ```json
//! {
//!   "9": {
//!     "Sonos_AbCdEf0123456789": {
//!       "authToken": "...",
//!       "privateKey": "...",
//!       "updatedAt": "2026-10-19T08:30:00Z"
//!     }
//!   }
//! }
//! ```
//!
//! The file is owner read/write only (its directory owner-only too) and
//! stays that way across rewrites. Every handle on the same path shares one
//! lock and each save re-reads the file under it, so no handle overwrites
//! another's entries. Reading and writing are separate
//! capabilities: account linking gets a [`TokenWriter`], playback and
//! search get a [`TokenReader`].

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StoreError;

/// Overrides the token file location
pub const TOKEN_PATH_ENV: &str = "SONOS_CTL_SMAPI_TOKENS";

const TOKEN_FILE_NAME: &str = "smapi_tokens.json";
const APP_DIR_NAME: &str = "sonos-ctl";

/// One write lock per token file in this process
static FILE_LOCKS: LazyLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    LazyLock::new(Default::default);

/// Credentials of one linked account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmapiTokenPair {
    pub auth_token: String,
    pub private_key: String,
    pub updated_at: DateTime<Utc>,
}

impl SmapiTokenPair {
    pub fn new(auth_token: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
            private_key: private_key.into(),
            updated_at: Utc::now(),
        }
    }
}

/// Service id -> household id -> token pair
type TokenFile = BTreeMap<String, BTreeMap<String, SmapiTokenPair>>;

/// Read access to stored credentials
pub trait TokenReader: Send + Sync {
    /// `Ok(None)` when nothing is stored for the pair.
    fn load(&self, service_id: &str, household_id: &str)
        -> Result<Option<SmapiTokenPair>, StoreError>;
}

/// Write access to stored credentials
pub trait TokenWriter: Send + Sync {
    fn save(
        &self,
        service_id: &str,
        household_id: &str,
        tokens: SmapiTokenPair,
    ) -> Result<(), StoreError>;
}

impl<T: TokenReader + ?Sized> TokenReader for Arc<T> {
    fn load(
        &self,
        service_id: &str,
        household_id: &str,
    ) -> Result<Option<SmapiTokenPair>, StoreError> {
        (**self).load(service_id, household_id)
    }
}

impl<T: TokenWriter + ?Sized> TokenWriter for Arc<T> {
    fn save(
        &self,
        service_id: &str,
        household_id: &str,
        tokens: SmapiTokenPair,
    ) -> Result<(), StoreError> {
        (**self).save(service_id, household_id, tokens)
    }
}

/// `$SONOS_CTL_SMAPI_TOKENS`, else `{config dir}/sonos-ctl/smapi_tokens.json`.
pub fn default_token_path() -> Result<PathBuf, StoreError> {
    if let Some(path) = std::env::var_os(TOKEN_PATH_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(TOKEN_FILE_NAME))
        .ok_or(StoreError::NoPath)
}

/// File-backed token store.
///
/// Nothing is cached: loads read the file and saves rewrite it, both under
/// the lock shared by every handle opened on the same path.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileTokenStore {
    /// Open the store at `path`, creating its directory owner-only. The file
    /// itself is created on first save.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.exists() {
                create_private_dir(dir)?;
            }
        }
        let lock = FILE_LOCKS
            .lock()
            .entry(lock_key(&path))
            .or_default()
            .clone();
        Ok(Self { path, lock })
    }

    /// Open the store at [`default_token_path`].
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(default_token_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<TokenFile, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(TokenFile::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TokenFile::new()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Canonical directory plus file name, so `a/../b/f` and `b/f` share a lock.
fn lock_key(path: &Path) -> PathBuf {
    match (fs::canonicalize(parent_dir(path)), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

impl TokenReader for FileTokenStore {
    fn load(
        &self,
        service_id: &str,
        household_id: &str,
    ) -> Result<Option<SmapiTokenPair>, StoreError> {
        let _guard = self.lock.lock();
        Ok(self
            .read_file()?
            .get(service_id)
            .and_then(|households| households.get(household_id))
            .cloned())
    }
}

impl TokenWriter for FileTokenStore {
    fn save(
        &self,
        service_id: &str,
        household_id: &str,
        tokens: SmapiTokenPair,
    ) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut file = self.read_file()?;
        file.entry(service_id.to_string())
            .or_default()
            .insert(household_id.to_string(), tokens);
        write_private(&self.path, &serde_json::to_vec_pretty(&file)?)?;
        debug!(service_id, household_id, path = %self.path.display(), "Saved SMAPI tokens");
        Ok(())
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Replace `path` with `contents` through a uniquely named temp file in the
/// same directory, ending with mode 0600.
fn write_private(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let mut temp = NamedTempFile::new_in(parent_dir(path))?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    enforce_owner_only(path)
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Reset the mode to 0600 and check it took.
#[cfg(unix)]
fn enforce_owner_only(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    let mode = fs::metadata(path)?.permissions().mode() & 0o777;
    if mode & 0o077 != 0 {
        return Err(StoreError::Permissions {
            path: path.to_path_buf(),
            mode,
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn enforce_owner_only(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

/// In-memory store for tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<TokenFile>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenReader for MemoryTokenStore {
    fn load(
        &self,
        service_id: &str,
        household_id: &str,
    ) -> Result<Option<SmapiTokenPair>, StoreError> {
        Ok(self
            .tokens
            .lock()
            .get(service_id)
            .and_then(|households| households.get(household_id))
            .cloned())
    }
}

impl TokenWriter for MemoryTokenStore {
    fn save(
        &self,
        service_id: &str,
        household_id: &str,
        tokens: SmapiTokenPair,
    ) -> Result<(), StoreError> {
        self.tokens
            .lock()
            .entry(service_id.to_string())
            .or_default()
            .insert(household_id.to_string(), tokens);
        Ok(())
    }
}
