//! Best-effort backend copy of the save.
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use super::snapshot::GameProgress;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("remote store unreachable: {0}")]
    Unreachable(String),
    #[error("remote store rejected the request: {0}")]
    Rejected(String),
}

/// Backend table holding one snapshot per key.
///
/// Transport is the implementor's business; the core only needs these
/// three calls and treats every failure as non-fatal.
pub trait RemoteStore {
    /// Upsert the snapshot for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or refuses the write.
    fn push(&self, key: &str, progress: &GameProgress) -> Result<(), RemoteError>;

    /// Fetch the snapshot for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    fn fetch(&self, key: &str) -> Result<Option<GameProgress>, RemoteError>;

    /// Delete the snapshot for `key`; missing rows are fine.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    fn remove(&self, key: &str) -> Result<(), RemoteError>;
}

/// In-memory backend that can be taken offline. Clones share rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    rows: Rc<RefCell<HashMap<String, GameProgress>>>,
    offline: Rc<Cell<bool>>,
}

impl MemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    /// Row under `key`, regardless of connectivity.
    #[must_use]
    pub fn row(&self, key: &str) -> Option<GameProgress> {
        self.rows.borrow().get(key).cloned()
    }

    /// Plant a row directly, as another device would.
    pub fn insert_row(&self, key: &str, progress: GameProgress) {
        self.rows.borrow_mut().insert(key.to_string(), progress);
    }

    fn check(&self) -> Result<(), RemoteError> {
        if self.offline.get() {
            Err(RemoteError::Unreachable("offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl RemoteStore for MemoryRemote {
    fn push(&self, key: &str, progress: &GameProgress) -> Result<(), RemoteError> {
        self.check()?;
        self.insert_row(key, progress.clone());
        Ok(())
    }

    fn fetch(&self, key: &str) -> Result<Option<GameProgress>, RemoteError> {
        self.check()?;
        Ok(self.row(key))
    }

    fn remove(&self, key: &str) -> Result<(), RemoteError> {
        self.check()?;
        self.rows.borrow_mut().remove(key);
        Ok(())
    }
}
