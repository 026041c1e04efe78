//! GMP Level 3 Game Engine
//!
//! Platform-agnostic game state for the Good Manufacturing Practice training
//! game: scenario progression, drop validation and scoring, a session timer,
//! and save/resume of in-progress games. Rendering is left to the host; it
//! sends [`Command`]s in and reads [`GameView`]s and [`GameEvent`]s out.

pub mod catalog;
pub mod clock;
pub mod constants;
pub mod persistence;
pub mod progression;
pub mod rules;
pub mod scoring;
pub mod selectors;
pub mod session;
pub mod state;
pub mod timer;

// Re-export commonly used types
pub use catalog::{CatalogError, ContainerKind, Piece, PieceCategory, Scenario, ScenarioCatalog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use persistence::{
    FileStore, GameProgress, Loaded, LocalStore, MemoryRemote, MemoryStore, Persistence,
    PersistenceError, ProgressSummary, RemoteError, RemoteStore, progress_summary, storage_key,
};
pub use progression::{AdvanceRejection, Completion};
pub use rules::ScoringRules;
pub use scoring::{DropOutcome, RejectReason};
pub use selectors::GameView;
pub use session::{Command, Events, GameEvent, GameSession, PersistAction, persist_action};
pub use state::{Feedback, GameState, GameStats, PlacedPieces, ScenarioResult, UiFlags};
pub use timer::Timer;

/// A session wired to its persistence layer.
///
/// Every command goes through [`GameEngine::dispatch`], which applies it and
/// then runs the save hook. Persistence trouble never interrupts play; it is
/// logged and available from [`GameEngine::last_persistence_error`].
#[derive(Debug)]
pub struct GameEngine<L, C = SystemClock>
where
    L: LocalStore + std::fmt::Debug,
    C: Clock + std::fmt::Debug,
{
    session: GameSession<C>,
    persistence: Persistence<L>,
}

impl<L> GameEngine<L, SystemClock>
where
    L: LocalStore + std::fmt::Debug,
{
    /// Built-in catalog, system clock, default rules.
    #[must_use]
    pub fn with_store(local: L) -> Self {
        let session = GameSession::builtin();
        let persistence = Persistence::new(local, ScenarioCatalog::builtin());
        Self::new(session, persistence)
    }
}

impl<L, C> GameEngine<L, C>
where
    L: LocalStore + std::fmt::Debug,
    C: Clock + std::fmt::Debug,
{
    pub const fn new(session: GameSession<C>, persistence: Persistence<L>) -> Self {
        Self {
            session,
            persistence,
        }
    }

    /// Apply a command, then save or clear the stored game as needed.
    pub fn dispatch(&mut self, command: Command) -> Events {
        let events = self.session.apply(command);
        match persist_action(&events) {
            PersistAction::Save => {
                // Failures are logged and flagged by the persistence layer.
                let _ = self.save_now();
            }
            PersistAction::Clear => {
                let now = self.session.clock().now_ms();
                let _ = self.persistence.clear_progress(now);
            }
            PersistAction::None => {}
        }
        events
    }

    /// Save the current state immediately.
    pub fn save_now(&mut self) -> Option<GameProgress> {
        let now = self.session.clock().now_ms();
        self.persistence
            .save_progress(self.session.state(), now)
            .ok()
    }

    /// Summary for the continue-or-restart prompt, if a usable save exists.
    pub fn saved_progress(&mut self) -> Option<ProgressSummary> {
        let progress = self.persistence.load_progress().into_progress()?;
        Some(progress_summary(
            &progress,
            self.session.catalog().len(),
            self.session.clock().now_ms(),
        ))
    }

    /// Replace the session state with the stored game. Returns whether a
    /// usable save was found.
    pub fn continue_saved(&mut self) -> bool {
        match self.persistence.load_progress() {
            Loaded::Found(progress) => {
                let state = progress.restore(self.session.catalog());
                self.session.replace_state(state);
                true
            }
            Loaded::NotFound | Loaded::Discarded(_) => false,
        }
    }

    /// Forget any stored game and start from the first scenario.
    pub fn start_new(&mut self) {
        self.session.apply(Command::ResetGame);
        let now = self.session.clock().now_ms();
        let _ = self.persistence.clear_progress(now);
    }

    #[must_use]
    pub const fn session(&self) -> &GameSession<C> {
        &self.session
    }

    #[must_use]
    pub const fn state(&self) -> &GameState {
        self.session.state()
    }

    #[must_use]
    pub fn view(&self) -> GameView {
        self.session.view()
    }

    #[must_use]
    pub const fn persistence(&self) -> &Persistence<L> {
        &self.persistence
    }

    pub const fn persistence_mut(&mut self) -> &mut Persistence<L> {
        &mut self.persistence
    }

    #[must_use]
    pub const fn last_persistence_error(&self) -> Option<&PersistenceError> {
        self.persistence.last_error()
    }
}
