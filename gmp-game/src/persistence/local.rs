//! Synchronous key/value stores that hold the authoritative save.
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Key/value string storage, the shape of browser `localStorage`.
pub trait LocalStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Replace the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or full.
    fn write(&self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// Delete `key`. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be modified.
    fn remove(&self, key: &str) -> Result<(), Self::Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum MemoryStoreError {
    #[error("storage is unavailable")]
    Unavailable,
}

/// In-process store. Clones share the same map, and it can be switched
/// off to mimic disabled or full browser storage.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
    available: Rc<Cell<bool>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            entries: Rc::default(),
            available: Rc::new(Cell::new(true)),
        }
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }

    /// Raw stored value, bypassing availability.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    /// Overwrite a raw value, bypassing availability.
    pub fn poke(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn check(&self) -> Result<(), MemoryStoreError> {
        if self.available.get() {
            Ok(())
        } else {
            Err(MemoryStoreError::Unavailable)
        }
    }
}

impl LocalStore for MemoryStore {
    type Error = MemoryStoreError;

    fn read(&self, key: &str) -> Result<Option<String>, Self::Error> {
        self.check()?;
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.check()?;
        self.poke(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        self.check()?;
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Store rooted at `root`; the directory is created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `key`. Anything outside `[A-Za-z0-9._-]` becomes `_`.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{name}.json"))
    }
}

fn io_err(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> FileStoreError {
    let path = path.to_path_buf();
    move |source| FileStoreError::Io {
        action,
        path,
        source,
    }
}

impl LocalStore for FileStore {
    type Error = FileStoreError;

    fn read(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_err("read", &path)(err)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        fs::create_dir_all(&self.root).map_err(io_err("create", &self.root))?;
        let path = self.path_for(key);
        // Write beside the target and rename so readers never see half a save.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value).map_err(io_err("write", &staging))?;
        fs::rename(&staging, &path).map_err(io_err("replace", &path))
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_err("remove", &path)(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "gmp-store-{label}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    #[test]
    fn memory_store_round_trips_and_shares_clones() {
        let store = MemoryStore::new();
        let handle = store.clone();
        store.write("k", "v").unwrap();
        assert_eq!(handle.read("k").unwrap().as_deref(), Some("v"));
        handle.remove("k").unwrap();
        handle.remove("k").unwrap();
        assert!(store.read("k").unwrap().is_none());
    }

    #[test]
    fn unavailable_memory_store_errors() {
        let store = MemoryStore::new();
        store.set_available(false);
        assert!(store.write("k", "v").is_err());
        assert!(store.read("k").is_err());
        assert!(store.peek("k").is_none());
    }

    #[test]
    fn file_store_round_trips() {
        let root = temp_root("roundtrip");
        let store = FileStore::new(&root);
        assert!(store.read("gmp.level3.progress").unwrap().is_none());
        store.write("gmp.level3.progress", "{}").unwrap();
        assert_eq!(
            store.read("gmp.level3.progress").unwrap().as_deref(),
            Some("{}")
        );
        store.remove("gmp.level3.progress").unwrap();
        store.remove("gmp.level3.progress").unwrap();
        assert!(store.read("gmp.level3.progress").unwrap().is_none());
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn file_names_are_sanitized() {
        let store = FileStore::new("/tmp/saves");
        let path = store.path_for("gmp.level3.progress.user/../x");
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("gmp.level3.progress.user_.._x.json")
        );
        assert_eq!(path.parent(), Some(Path::new("/tmp/saves")));
    }
}
