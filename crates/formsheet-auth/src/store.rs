//! Durable credential storage, one record per identity.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::identity::Identity;

/// Key-value persistence of one [`Credential`] per [`Identity`].
///
/// `save` must be atomic with respect to a concurrent `load` of the same
/// identity: a reader sees either the previous record or the new one.
pub trait TokenStore: Send + Sync + fmt::Debug {
    /// Loads the stored credential. `Ok(None)` means it was never acquired.
    fn load(&self, identity: &Identity) -> Result<Option<Credential>>;

    /// Stores `credential`, replacing any previous record.
    fn save(&self, identity: &Identity, credential: &Credential) -> Result<()>;
}

/// Distinguishes temp files written concurrently by one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// File-backed store.
///
/// Records live at `<root>/<action>/token-<scope>.json`, with both parts
/// percent-encoded so any identity maps to exactly one file inside `root`.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    root: PathBuf,
}

impl FileTokenStore {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory holding every record of `identity`'s action.
    ///
    /// The action's other files (such as its client file) belong here too.
    pub fn action_dir(&self, identity: &Identity) -> Result<PathBuf> {
        identity.validate()?;
        Ok(self
            .root
            .join(urlencoding::encode(identity.action()).into_owned()))
    }

    /// Returns the record path for `identity`.
    pub fn path_for(&self, identity: &Identity) -> Result<PathBuf> {
        Ok(self.action_dir(identity)?.join(format!(
            "token-{}.json",
            urlencoding::encode(identity.scope())
        )))
    }

    fn temp_path_for(path: &Path) -> PathBuf {
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(
            ".{}.{}.{}.tmp",
            name,
            std::process::id(),
            counter
        ))
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self, identity: &Identity) -> Result<Option<Credential>> {
        let path = self.path_for(identity)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(%identity, "no token file at {:?}", path);
                return Ok(None);
            }
            Err(e) => {
                return Err(
                    Error::store(format!("failed to read token file {}", path.display()))
                        .with_source(e),
                );
            }
        };

        let credential: Credential = serde_json::from_str(&content).map_err(|e| {
            Error::store(format!("failed to parse token file {}", path.display())).with_source(e)
        })?;

        debug!(%identity, "loaded token from {:?}", path);
        Ok(Some(credential))
    }

    fn save(&self, identity: &Identity, credential: &Credential) -> Result<()> {
        let path = self.path_for(identity)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::store(format!(
                    "failed to create token directory {}",
                    parent.display()
                ))
                .with_source(e)
            })?;
        }

        let content = serde_json::to_string_pretty(credential)
            .map_err(|e| Error::store("failed to serialize token").with_source(e))?;

        // Readers only ever see a complete file: write aside, then rename.
        let temp_path = Self::temp_path_for(&path);
        if let Err(e) = write_private(&temp_path, content.as_bytes()) {
            let _ = fs::remove_file(&temp_path);
            return Err(
                Error::store(format!("failed to write token file {}", temp_path.display()))
                    .with_source(e),
            );
        }

        fs::rename(&temp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            Error::store(format!("failed to replace token file {}", path.display()))
                .with_source(e)
        })?;

        debug!(%identity, "saved token to {:?}", path);
        Ok(())
    }
}

/// Writes `bytes` to a new file readable only by the owner.
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// In-process store, for tests and hosts that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    records: RwLock<HashMap<Identity, Credential>>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self, identity: &Identity) -> Result<Option<Credential>> {
        let records = self
            .records
            .read()
            .map_err(|_| Error::store("token store lock poisoned"))?;
        Ok(records.get(identity).cloned())
    }

    fn save(&self, identity: &Identity, credential: &Credential) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| Error::store("token store lock poisoned"))?;
        records.insert(identity.clone(), credential.clone());
        Ok(())
    }
}
