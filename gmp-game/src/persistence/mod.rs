//! Save, load and clear of in-progress games.
//!
//! The local store is authoritative. The remote store, when configured, gets
//! a best-effort copy; its failures are logged and flagged but never undo or
//! block the local write. Nothing in here panics or propagates a failure
//! that would stop play.
pub mod local;
pub mod remote;
pub mod snapshot;

use std::fmt;
use std::sync::Arc;

use crate::catalog::ScenarioCatalog;
use crate::constants::STORAGE_KEY_BASE;
use crate::state::GameState;

pub use local::{FileStore, FileStoreError, LocalStore, MemoryStore, MemoryStoreError};
pub use remote::{MemoryRemote, RemoteError, RemoteStore};
pub use snapshot::{
    GameProgress, ProgressSummary, SnapshotError, progress_percentage, progress_summary, time_ago,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    #[error("local storage failed: {0}")]
    Storage(String),
    #[error("saved progress is not valid JSON: {0}")]
    Serialization(String),
    #[error("saved progress does not fit the catalog: {0}")]
    Invalid(#[from] SnapshotError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result of looking for a saved game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loaded {
    Found(GameProgress),
    NotFound,
    /// Something was stored but could not be used; treat as no save.
    Discarded(PersistenceError),
}

impl Loaded {
    #[must_use]
    pub const fn progress(&self) -> Option<&GameProgress> {
        match self {
            Self::Found(progress) => Some(progress),
            Self::NotFound | Self::Discarded(_) => None,
        }
    }

    #[must_use]
    pub fn into_progress(self) -> Option<GameProgress> {
        match self {
            Self::Found(progress) => Some(progress),
            Self::NotFound | Self::Discarded(_) => None,
        }
    }

    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Storage key, optionally scoped to a user or module.
#[must_use]
pub fn storage_key(scope: Option<&str>) -> String {
    match scope {
        Some(scope) if !scope.is_empty() => format!("{STORAGE_KEY_BASE}.{scope}"),
        _ => STORAGE_KEY_BASE.to_string(),
    }
}

/// Owner of the stored copy of a game.
pub struct Persistence<L: LocalStore> {
    key: String,
    local: L,
    remote: Option<Box<dyn RemoteStore>>,
    catalog: Arc<ScenarioCatalog>,
    last_saved_at: Option<i64>,
    last_error: Option<PersistenceError>,
}

impl<L: LocalStore + fmt::Debug> fmt::Debug for Persistence<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persistence")
            .field("key", &self.key)
            .field("local", &self.local)
            .field("remote", &self.remote.is_some())
            .field("last_saved_at", &self.last_saved_at)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl<L: LocalStore> Persistence<L> {
    #[must_use]
    pub fn new(local: L, catalog: Arc<ScenarioCatalog>) -> Self {
        Self {
            key: storage_key(None),
            local,
            remote: None,
            catalog,
            last_saved_at: None,
            last_error: None,
        }
    }

    /// Scope the storage key, e.g. to a user id.
    #[must_use]
    pub fn with_scope(mut self, scope: &str) -> Self {
        self.key = storage_key(Some(scope));
        self
    }

    #[must_use]
    pub fn with_remote(mut self, remote: impl RemoteStore + 'static) -> Self {
        self.remote = Some(Box::new(remote));
        self
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub const fn local(&self) -> &L {
        &self.local
    }

    /// Most recent non-fatal failure, for the UI to surface if it wants.
    #[must_use]
    pub const fn last_error(&self) -> Option<&PersistenceError> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    #[must_use]
    pub const fn last_saved_at(&self) -> Option<i64> {
        self.last_saved_at
    }

    /// Write `state` locally, then push it to the remote if one is set.
    ///
    /// Timestamps never go backwards across saves from this instance, so
    /// last-write-wins comparisons stay meaningful under clock skew.
    ///
    /// # Errors
    ///
    /// Returns an error only when the local write fails. Remote failures are
    /// logged and kept in [`Self::last_error`].
    pub fn save_progress(
        &mut self,
        state: &GameState,
        now_ms: i64,
    ) -> Result<GameProgress, PersistenceError> {
        let timestamp = self.last_saved_at.map_or(now_ms, |last| now_ms.max(last));
        let progress = GameProgress::from_state(state, timestamp);
        let json = serde_json::to_string(&progress).map_err(|err| self.fail(err.into()))?;
        self.local
            .write(&self.key, &json)
            .map_err(|err| self.fail(PersistenceError::Storage(err.to_string())))?;
        self.last_saved_at = Some(timestamp);
        self.last_error = None;
        log::debug!(
            "saved progress at scenario {} ({timestamp})",
            progress.current_scenario_index
        );

        let pushed = self
            .remote
            .as_ref()
            .map(|remote| remote.push(&self.key, &progress));
        if let Some(Err(err)) = pushed {
            self.fail(err.into());
        }
        Ok(progress)
    }

    /// Find the saved game, preferring the newer of the local and remote copies.
    ///
    /// A newer remote copy is written back to the local store. A remote copy
    /// older than this instance's last save or clear is ignored.
    pub fn load_progress(&mut self) -> Loaded {
        let local = self.read_local();
        let remote = self.read_remote().map(|loaded| match loaded {
            Loaded::Found(progress) if self.is_stale(&progress) => Loaded::NotFound,
            other => other,
        });

        let chosen = match (local, remote) {
            (Loaded::Found(local), Some(Loaded::Found(remote))) => {
                if remote.timestamp > local.timestamp {
                    self.write_through(&remote);
                    Loaded::Found(remote)
                } else {
                    Loaded::Found(local)
                }
            }
            (Loaded::Found(local), _) => Loaded::Found(local),
            (_, Some(Loaded::Found(remote))) => {
                self.write_through(&remote);
                Loaded::Found(remote)
            }
            (Loaded::Discarded(err), _) | (_, Some(Loaded::Discarded(err))) => {
                Loaded::Discarded(err)
            }
            _ => Loaded::NotFound,
        };

        match &chosen {
            Loaded::Found(progress) => self.last_saved_at = Some(progress.timestamp),
            Loaded::Discarded(err) => {
                self.fail(err.clone());
            }
            Loaded::NotFound => {}
        }
        chosen
    }

    /// Forget the saved game everywhere. Clearing twice is fine.
    ///
    /// The clear time is kept so a remote copy that missed the delete cannot
    /// bring the cleared game back through [`Self::load_progress`] or
    /// [`Self::accept_remote`].
    ///
    /// # Errors
    ///
    /// Returns an error when the local delete fails.
    pub fn clear_progress(&mut self, now_ms: i64) -> Result<(), PersistenceError> {
        self.local
            .remove(&self.key)
            .map_err(|err| self.fail(PersistenceError::Storage(err.to_string())))?;
        let removed = self.remote.as_ref().map(|remote| remote.remove(&self.key));
        if let Some(Err(err)) = removed {
            self.fail(err.into());
        }
        self.last_saved_at = Some(
            self.last_saved_at
                .map_or(now_ms, |last| now_ms.max(last.saturating_add(1))),
        );
        log::debug!("cleared saved progress under {}", self.key);
        Ok(())
    }

    /// Take a snapshot that came back from the remote store, unless a newer
    /// local save already superseded it. Returns whether it was accepted.
    pub fn accept_remote(&mut self, progress: &GameProgress) -> bool {
        if self.is_stale(progress) {
            return false;
        }
        if let Err(err) = progress.validate(&self.catalog) {
            self.fail(err.into());
            return false;
        }
        if !self.write_through(progress) {
            return false;
        }
        self.last_saved_at = Some(progress.timestamp);
        true
    }

    fn is_stale(&self, progress: &GameProgress) -> bool {
        let stale = self
            .last_saved_at
            .is_some_and(|last| progress.timestamp < last);
        if stale {
            log::debug!(
                "ignoring stale remote snapshot ({} < {:?})",
                progress.timestamp,
                self.last_saved_at
            );
        }
        stale
    }

    fn read_local(&self) -> Loaded {
        let text = match self.local.read(&self.key) {
            Ok(Some(text)) => text,
            Ok(None) => return Loaded::NotFound,
            Err(err) => return Loaded::Discarded(PersistenceError::Storage(err.to_string())),
        };
        match serde_json::from_str::<GameProgress>(&text) {
            Ok(progress) => self.checked(progress),
            Err(err) => Loaded::Discarded(err.into()),
        }
    }

    fn read_remote(&mut self) -> Option<Loaded> {
        let fetched = self.remote.as_ref()?.fetch(&self.key);
        match fetched {
            Ok(Some(progress)) => Some(self.checked(progress)),
            Ok(None) => Some(Loaded::NotFound),
            Err(err) => {
                // Unreachable backend is not a corrupt save; fall back to local.
                self.fail(err.into());
                None
            }
        }
    }

    fn checked(&self, progress: GameProgress) -> Loaded {
        match progress.validate(&self.catalog) {
            Ok(()) => Loaded::Found(progress),
            Err(err) => Loaded::Discarded(err.into()),
        }
    }

    fn write_through(&mut self, progress: &GameProgress) -> bool {
        let written = serde_json::to_string(progress)
            .map_err(PersistenceError::from)
            .and_then(|json| {
                self.local
                    .write(&self.key, &json)
                    .map_err(|err| PersistenceError::Storage(err.to_string()))
            });
        match written {
            Ok(()) => true,
            Err(err) => {
                self.fail(err);
                false
            }
        }
    }

    fn fail(&mut self, err: PersistenceError) -> PersistenceError {
        log::warn!("persistence: {err}");
        self.last_error = Some(err.clone());
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ContainerKind, ScenarioCatalog};
    use crate::rules::ScoringRules;
    use crate::scoring::drop_piece;

    fn persistence() -> (Persistence<MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        let persistence = Persistence::new(store.clone(), ScenarioCatalog::builtin());
        (persistence, store)
    }

    fn played_state() -> GameState {
        let catalog = ScenarioCatalog::builtin();
        let scenario = catalog.get(0).unwrap();
        let piece = scenario.correct_pieces().next().unwrap();
        let mut state = GameState::new();
        drop_piece(
            &mut state,
            scenario,
            &ScoringRules::default(),
            ContainerKind::for_category(piece.category),
            &piece.id,
            0,
        );
        state
    }

    #[test]
    fn scoped_keys() {
        assert_eq!(storage_key(None), "gmp.level3.progress");
        assert_eq!(storage_key(Some("")), "gmp.level3.progress");
        assert_eq!(storage_key(Some("u42")), "gmp.level3.progress.u42");
    }

    #[test]
    fn save_then_load_round_trips() {
        let (mut persistence, _) = persistence();
        let state = played_state();
        let saved = persistence.save_progress(&state, 10_000).unwrap();
        assert_eq!(persistence.load_progress(), Loaded::Found(saved));
        assert!(persistence.last_error().is_none());
    }

    #[test]
    fn clear_is_idempotent_and_forgets() {
        let (mut persistence, _) = persistence();
        persistence.save_progress(&played_state(), 1).unwrap();
        persistence.clear_progress(2).unwrap();
        persistence.clear_progress(3).unwrap();
        assert_eq!(persistence.load_progress(), Loaded::NotFound);
    }

    #[test]
    fn corrupt_json_is_discarded() {
        let (mut persistence, store) = persistence();
        store.poke(persistence.key(), "{not json");
        let loaded = persistence.load_progress();
        assert!(matches!(
            loaded,
            Loaded::Discarded(PersistenceError::Serialization(_))
        ));
        assert!(loaded.progress().is_none());
        assert!(persistence.last_error().is_some());
    }

    #[test]
    fn unavailable_storage_fails_softly() {
        let (mut persistence, store) = persistence();
        store.set_available(false);
        let err = persistence.save_progress(&played_state(), 1).unwrap_err();
        assert!(matches!(err, PersistenceError::Storage(_)));
        assert_eq!(persistence.last_error(), Some(&err));
        assert!(matches!(
            persistence.load_progress(),
            Loaded::Discarded(PersistenceError::Storage(_))
        ));
    }

    #[test]
    fn remote_failure_keeps_local_save() {
        let remote = MemoryRemote::new();
        remote.set_offline(true);
        let (persistence, store) = persistence();
        let mut persistence = persistence.with_remote(remote.clone());
        let saved = persistence.save_progress(&played_state(), 5).unwrap();
        assert!(matches!(
            persistence.last_error(),
            Some(PersistenceError::Remote(_))
        ));
        assert!(store.peek(persistence.key()).is_some());
        assert!(remote.row(persistence.key()).is_none());
        assert_eq!(persistence.load_progress(), Loaded::Found(saved));
    }

    #[test]
    fn newer_remote_wins_and_is_written_back() {
        let remote = MemoryRemote::new();
        let (persistence, store) = persistence();
        let mut persistence = persistence.with_remote(remote.clone());
        persistence.save_progress(&GameState::new(), 100).unwrap();

        let newer = GameProgress::from_state(&played_state(), 200);
        remote.insert_row(persistence.key(), newer.clone());
        assert_eq!(persistence.load_progress(), Loaded::Found(newer.clone()));
        let local: GameProgress =
            serde_json::from_str(&store.peek(persistence.key()).unwrap()).unwrap();
        assert_eq!(local, newer);
    }

    #[test]
    fn stale_remote_echo_is_rejected() {
        let (mut persistence, store) = persistence();
        let older = persistence.save_progress(&GameState::new(), 100).unwrap();
        let newer = persistence.save_progress(&played_state(), 200).unwrap();
        assert!(!persistence.accept_remote(&older));
        let local: GameProgress =
            serde_json::from_str(&store.peek(persistence.key()).unwrap()).unwrap();
        assert_eq!(local, newer);

        let newest = GameProgress {
            timestamp: 300,
            ..newer
        };
        assert!(persistence.accept_remote(&newest));
        assert_eq!(persistence.last_saved_at(), Some(300));
    }

    #[test]
    fn remote_copy_older_than_a_clear_is_ignored() {
        let remote = MemoryRemote::new();
        let (persistence, store) = persistence();
        let mut persistence = persistence.with_remote(remote.clone());
        let saved = persistence.save_progress(&played_state(), 100).unwrap();

        remote.set_offline(true);
        persistence.clear_progress(100).unwrap();
        remote.set_offline(false);
        assert_eq!(remote.row(persistence.key()), Some(saved.clone()));

        assert_eq!(persistence.load_progress(), Loaded::NotFound);
        assert!(store.peek(persistence.key()).is_none());
        assert!(!persistence.accept_remote(&saved));

        let later = GameProgress {
            timestamp: 400,
            ..saved
        };
        remote.insert_row(persistence.key(), later.clone());
        assert_eq!(persistence.load_progress(), Loaded::Found(later));
    }

    #[test]
    fn clear_error_forgets_the_last_failure() {
        let (mut persistence, store) = persistence();
        store.set_available(false);
        assert!(persistence.save_progress(&played_state(), 1).is_err());
        assert!(persistence.last_error().is_some());
        persistence.clear_error();
        assert!(persistence.last_error().is_none());
    }

    #[test]
    fn save_timestamps_never_regress() {
        let (mut persistence, _) = persistence();
        persistence.save_progress(&GameState::new(), 500).unwrap();
        let saved = persistence.save_progress(&GameState::new(), 400).unwrap();
        assert_eq!(saved.timestamp, 500);
    }
}
