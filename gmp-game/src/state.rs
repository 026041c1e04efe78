use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::{ContainerKind, Piece, Scenario};
use crate::constants::{
    FEEDBACK_ALREADY_PLACED, FEEDBACK_CRITICAL_HIT, FEEDBACK_CUSTOM, FEEDBACK_MISS,
    FEEDBACK_WRONG_CATEGORY, HEALTH_MAX,
};
use crate::timer::Timer;

/// Pieces the player has correctly placed in the current scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedPieces {
    pub violations: Vec<Piece>,
    pub actions: Vec<Piece>,
}

impl PlacedPieces {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn list(&self, container: ContainerKind) -> &[Piece] {
        match container {
            ContainerKind::Violations => &self.violations,
            ContainerKind::Actions => &self.actions,
        }
    }

    pub(crate) fn push(&mut self, container: ContainerKind, piece: Piece) {
        match container {
            ContainerKind::Violations => self.violations.push(piece),
            ContainerKind::Actions => self.actions.push(piece),
        }
    }

    /// Whether `id` sits in either list.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.iter().any(|piece| piece.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.len() + self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty() && self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Piece> {
        self.violations.iter().chain(self.actions.iter())
    }

    pub fn clear(&mut self) {
        self.violations.clear();
        self.actions.clear();
    }
}

/// Score, health, combo and timer as seen by the UI and the save file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    pub score: u64,
    pub health: u32,
    pub combo: u32,
    pub timer: u64,
}

impl Default for GameStats {
    fn default() -> Self {
        Self {
            score: 0,
            health: HEALTH_MAX,
            combo: 0,
            timer: 0,
        }
    }
}

/// Frozen record of one finished scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub scenario_index: usize,
    /// Points earned inside the scenario, completion bonus included.
    pub score: u64,
    pub health: u32,
    pub combo: u32,
    /// Seconds of active play spent on the scenario.
    pub time_spent: u64,
}

/// Transient message shown after an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Feedback {
    CriticalHit { points: u64 },
    Miss,
    WrongCategory,
    AlreadyPlaced,
    Message { text: String },
}

impl Feedback {
    /// Stable key for localized lookups.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::CriticalHit { .. } => FEEDBACK_CRITICAL_HIT,
            Self::Miss => FEEDBACK_MISS,
            Self::WrongCategory => FEEDBACK_WRONG_CATEGORY,
            Self::AlreadyPlaced => FEEDBACK_ALREADY_PLACED,
            Self::Message { .. } => FEEDBACK_CUSTOM,
        }
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CriticalHit { points } => write!(f, "Critical hit! +{points}"),
            Self::Miss => f.write_str("Miss!"),
            Self::WrongCategory => f.write_str("Wrong category!"),
            Self::AlreadyPlaced => f.write_str("Already placed"),
            Self::Message { text } => f.write_str(text),
        }
    }
}

/// Feedback plus the clock reading it was raised at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveFeedback {
    pub feedback: Feedback,
    pub raised_at_ms: i64,
}

/// Which overlays the presentation layer should show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiFlags {
    pub show_scenario: bool,
    pub show_briefing: bool,
    pub show_victory: bool,
    pub show_final_stats: bool,
}

impl UiFlags {
    /// Any overlay that pauses play.
    #[must_use]
    pub const fn blocks_play(&self) -> bool {
        self.show_scenario || self.show_briefing || self.show_victory || self.show_final_stats
    }
}

/// Mutable runtime state of one Level 3 session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub current_scenario_index: usize,
    pub placed_pieces: PlacedPieces,
    pub score: u64,
    pub health: u32,
    pub combo: u32,
    pub timer: Timer,
    pub scenario_results: Vec<ScenarioResult>,
    /// The current scenario has had its completion bonus applied.
    pub scenario_complete: bool,
    /// The last scenario is complete; nothing further can happen.
    pub game_complete: bool,
    pub feedback: Option<ActiveFeedback>,
    pub ui: UiFlags,
    /// Piece currently being dragged, if any.
    pub active_piece: Option<String>,
    pub(crate) scenario_score_start: u64,
    pub(crate) scenario_time_start: u64,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            current_scenario_index: 0,
            placed_pieces: PlacedPieces::new(),
            score: 0,
            health: HEALTH_MAX,
            combo: 0,
            timer: Timer::new(),
            scenario_results: Vec::new(),
            scenario_complete: false,
            game_complete: false,
            feedback: None,
            // New games open on the first scenario's narrative.
            ui: UiFlags {
                show_scenario: true,
                ..UiFlags::default()
            },
            active_piece: None,
            scenario_score_start: 0,
            scenario_time_start: 0,
        }
    }
}

impl GameState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn stats(&self) -> GameStats {
        GameStats {
            score: self.score,
            health: self.health,
            combo: self.combo,
            timer: self.timer.seconds(),
        }
    }

    /// Play is live: no overlay up and nothing left waiting on an advance.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.ui.blocks_play() && !self.scenario_complete && !self.game_complete
    }

    pub(crate) fn damage(&mut self, amount: u32) {
        self.health = self.health.saturating_sub(amount);
    }

    pub(crate) fn set_feedback(&mut self, feedback: Feedback, now_ms: i64) {
        self.feedback = Some(ActiveFeedback {
            feedback,
            raised_at_ms: now_ms,
        });
    }

    /// Drop the feedback message once it has been up for `lifetime_ms`.
    /// Returns whether anything was cleared.
    pub fn expire_feedback(&mut self, now_ms: i64, lifetime_ms: i64) -> bool {
        let expired = self
            .feedback
            .as_ref()
            .is_some_and(|active| now_ms.saturating_sub(active.raised_at_ms) >= lifetime_ms);
        if expired {
            self.feedback = None;
        }
        expired
    }

    /// Snapshot of the current scenario's contribution so far.
    #[must_use]
    pub fn scenario_result(&self) -> ScenarioResult {
        ScenarioResult {
            scenario_index: self.current_scenario_index,
            score: self.score.saturating_sub(self.scenario_score_start),
            health: self.health,
            combo: self.combo,
            time_spent: self
                .timer
                .seconds()
                .saturating_sub(self.scenario_time_start),
        }
    }

    /// Baselines for per-scenario results, derived from completed results.
    pub(crate) fn rebase_scenario_start(&mut self) {
        let banked_score: u64 = self.scenario_results.iter().map(|r| r.score).sum();
        let banked_time: u64 = self.scenario_results.iter().map(|r| r.time_spent).sum();
        // Everything before the current scenario is already banked in the results.
        self.scenario_score_start = banked_score.min(self.score);
        self.scenario_time_start = banked_time.min(self.timer.seconds());
    }

    /// Whether every correct piece of `scenario` is placed.
    #[must_use]
    pub fn all_correct_placed(&self, scenario: &Scenario) -> bool {
        let total = scenario.correct_count();
        total > 0 && self.placed_pieces.len() == total
    }
}
