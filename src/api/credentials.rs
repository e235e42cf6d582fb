//! Bearer credential storage.
//!
//! The transport reads the token before every request and clears it when the
//! backend answers 401, possibly from several requests at once. Every store
//! therefore swaps the whole token under one lock: readers see either the old
//! token or none, never a partial write.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Atomic get/set/clear over the session token.
pub trait CredentialStore: Send + Sync {
    /// Current token, if any.
    fn get(&self) -> Option<String>;

    /// Replace the stored token.
    fn set(&self, token: String) -> std::io::Result<()>;

    /// Remove the stored token, returning it.
    ///
    /// When several callers race to clear the same token exactly one of them
    /// gets `Some`.
    fn clear(&self) -> Option<String>;
}

/// Process-local store, used for tests and one-shot sessions.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set(&self, token: String) -> std::io::Result<()> {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token);
        Ok(())
    }

    fn clear(&self) -> Option<String> {
        self.token.write().unwrap_or_else(|e| e.into_inner()).take()
    }
}

/// Store backed by a token file so a CLI session survives between runs.
///
/// The file is read once at construction; afterwards the in-memory copy is
/// authoritative and every change is written through.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    token: Mutex<Option<String>>,
}

impl FileCredentialStore {
    /// Open the store at `path`. A missing or unreadable file means no token.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let token = match std::fs::read_to_string(&path) {
            Ok(content) => {
                let trimmed = content.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to read token file {}: {}", path.display(), e);
                None
            }
        };
        debug!(
            "Opened credential store at {} (token present: {})",
            path.display(),
            token.is_some()
        );

        Self {
            path,
            token: Mutex::new(token),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set(&self, token: String) -> std::io::Result<()> {
        let mut guard = self.token.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        write_private(&self.path, &token)?;
        *guard = Some(token);
        Ok(())
    }

    fn clear(&self) -> Option<String> {
        let mut guard = self.token.lock().unwrap_or_else(|e| e.into_inner());
        let previous = guard.take();
        if previous.is_some() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove token file {}: {}", self.path.display(), e);
                }
            }
        }
        previous
    }
}

/// Write `content` to `path`, readable by the owner only on unix.
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    // The mode above only applies to newly created files.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.get(), None);

        store.set("abc".to_string()).unwrap();
        assert_eq!(store.get().as_deref(), Some("abc"));

        assert_eq!(store.clear().as_deref(), Some("abc"));
        assert_eq!(store.get(), None);
        assert_eq!(store.clear(), None);
    }

    #[test]
    fn test_concurrent_clear_yields_token_once() {
        let store = Arc::new(MemoryCredentialStore::with_token("secret"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.clear())
            })
            .collect();

        let cleared: Vec<_> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(cleared, vec!["secret".to_string()]);
    }

    #[test]
    fn test_file_store_persists_between_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session").join("token");

        let store = FileCredentialStore::open(&path);
        assert_eq!(store.get(), None);
        store.set("persisted".to_string()).unwrap();

        let reopened = FileCredentialStore::open(&path);
        assert_eq!(reopened.get().as_deref(), Some("persisted"));

        assert_eq!(reopened.clear().as_deref(), Some("persisted"));
        assert!(!path.exists());
        assert_eq!(FileCredentialStore::open(&path).get(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_token_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "old").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileCredentialStore::open(&path);
        store.set("fresh".to_string()).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh");

        let fresh_path = dir.path().join("new-token");
        FileCredentialStore::open(&fresh_path)
            .set("t".to_string())
            .unwrap();
        let mode = std::fs::metadata(&fresh_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_store_ignores_blank_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "  \n").unwrap();

        let store = FileCredentialStore::open(&path);
        assert_eq!(store.get(), None);
        assert_eq!(store.path(), path.as_path());
    }
}
