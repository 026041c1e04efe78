//! Command-driven session: the single entry point that mutates game state.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;

use crate::catalog::{ContainerKind, Scenario, ScenarioCatalog};
use crate::clock::{Clock, SystemClock};
use crate::persistence::{GameProgress, ProgressSummary, progress_summary};
use crate::progression::{AdvanceRejection, Completion, advance_scenario, check_completion};
use crate::rules::ScoringRules;
use crate::scoring::{DropOutcome, drop_piece};
use crate::selectors::{GameView, game_view};
use crate::state::{Feedback, GameState, ScenarioResult, UiFlags};

/// Everything the presentation layer can ask the core to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    DropPiece {
        container: ContainerKind,
        piece_id: String,
    },
    AdvanceScenario,
    ResetGame,
    ShowScenario,
    HideScenario,
    ShowBriefing,
    HideBriefing,
    DismissVictory,
    SetFeedback {
        text: String,
    },
    ClearFeedback,
    BeginDrag {
        piece_id: String,
    },
    EndDrag,
    StartTimer,
    StopTimer,
    /// One second of wall time has passed.
    Tick,
}

impl Command {
    #[must_use]
    pub fn drop_piece(container: ContainerKind, piece_id: impl Into<String>) -> Self {
        Self::DropPiece {
            container,
            piece_id: piece_id.into(),
        }
    }
}

/// What a command changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    Dropped {
        container: ContainerKind,
        piece_id: String,
        outcome: DropOutcome,
    },
    ScenarioCompleted(Completion),
    GameCompleted {
        final_score: u64,
    },
    Advanced {
        scenario_index: usize,
        result: ScenarioResult,
    },
    AdvanceRejected {
        reason: AdvanceRejection,
    },
    Reset,
    DialogsChanged(UiFlags),
    FeedbackChanged {
        text: Option<String>,
    },
    DragChanged {
        piece_id: Option<String>,
    },
    TimerChanged {
        running: bool,
    },
    TimerTicked {
        seconds: u64,
    },
}

pub type Events = SmallVec<[GameEvent; 4]>;

/// What the stored copy should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistAction {
    None,
    Save,
    Clear,
}

/// Post-command hook deciding whether the stored game needs to change.
///
/// Drops that moved score, health or placements, completions and advances
/// are saved; a reset forgets the save. Ticks, dialogs and drags are not
/// worth a write.
#[must_use]
pub fn persist_action(events: &[GameEvent]) -> PersistAction {
    if events.iter().any(|event| matches!(event, GameEvent::Reset)) {
        return PersistAction::Clear;
    }
    let save = events.iter().any(|event| match event {
        GameEvent::Dropped { outcome, .. } => outcome.changed_state(),
        GameEvent::ScenarioCompleted(_)
        | GameEvent::GameCompleted { .. }
        | GameEvent::Advanced { .. } => true,
        _ => false,
    });
    if save {
        PersistAction::Save
    } else {
        PersistAction::None
    }
}

/// Owns one player's game state and applies commands to it.
#[derive(Debug, Clone)]
pub struct GameSession<C: Clock = SystemClock> {
    catalog: Arc<ScenarioCatalog>,
    rules: ScoringRules,
    clock: C,
    state: GameState,
}

impl GameSession<SystemClock> {
    /// A fresh session over the built-in catalog on the system clock.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(ScenarioCatalog::builtin(), SystemClock)
    }
}

impl<C: Clock> GameSession<C> {
    #[must_use]
    pub fn new(catalog: Arc<ScenarioCatalog>, clock: C) -> Self {
        Self {
            catalog,
            rules: ScoringRules::default(),
            clock,
            state: GameState::new(),
        }
    }

    #[must_use]
    pub const fn with_rules(mut self, rules: ScoringRules) -> Self {
        self.rules = rules;
        self
    }

    /// Resume from a previously validated snapshot.
    #[must_use]
    pub fn restored(mut self, progress: &GameProgress) -> Self {
        self.state = progress.restore(&self.catalog);
        self
    }

    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub const fn catalog(&self) -> &Arc<ScenarioCatalog> {
        &self.catalog
    }

    #[must_use]
    pub const fn rules(&self) -> &ScoringRules {
        &self.rules
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    #[must_use]
    pub fn current_scenario(&self) -> &Scenario {
        self.catalog.get_clamped(self.state.current_scenario_index)
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.state.scenario_complete
    }

    #[must_use]
    pub fn view(&self) -> GameView {
        game_view(&self.state, &self.catalog)
    }

    /// Resume-prompt summary computed straight from live state.
    #[must_use]
    pub fn summary(&self) -> ProgressSummary {
        let now = self.clock.now_ms();
        progress_summary(
            &GameProgress::from_state(&self.state, now),
            self.catalog.len(),
            now,
        )
    }

    pub(crate) fn replace_state(&mut self, state: GameState) {
        self.state = state;
    }

    #[must_use]
    pub fn into_state(self) -> GameState {
        self.state
    }

    /// Apply one command and report what changed.
    pub fn apply(&mut self, command: Command) -> Events {
        let mut events = Events::new();
        let now = self.clock.now_ms();
        match command {
            Command::DropPiece {
                container,
                piece_id,
            } => self.drop_into(container, piece_id, now, &mut events),
            Command::AdvanceScenario => {
                match advance_scenario(&mut self.state, &self.catalog, &self.rules) {
                    Ok(result) => events.push(GameEvent::Advanced {
                        scenario_index: self.state.current_scenario_index,
                        result,
                    }),
                    Err(reason) => events.push(GameEvent::AdvanceRejected { reason }),
                }
            }
            Command::ResetGame => {
                self.state = GameState::new();
                events.push(GameEvent::Reset);
            }
            Command::ShowScenario => self.set_ui(|ui| ui.show_scenario = true, &mut events),
            Command::HideScenario => self.set_ui(|ui| ui.show_scenario = false, &mut events),
            Command::ShowBriefing => self.set_ui(|ui| ui.show_briefing = true, &mut events),
            Command::HideBriefing => self.set_ui(|ui| ui.show_briefing = false, &mut events),
            Command::DismissVictory => self.set_ui(|ui| ui.show_victory = false, &mut events),
            Command::SetFeedback { text } => {
                self.state.set_feedback(Feedback::Message { text }, now);
                events.push(self.feedback_event());
            }
            Command::ClearFeedback => {
                if self.state.feedback.take().is_some() {
                    events.push(self.feedback_event());
                }
            }
            Command::BeginDrag { piece_id } => self.begin_drag(piece_id, &mut events),
            Command::EndDrag => {
                if self.state.active_piece.take().is_some() {
                    events.push(GameEvent::DragChanged { piece_id: None });
                }
            }
            Command::StartTimer => {
                if !self.state.game_complete && !self.state.timer.is_running() {
                    self.state.timer.start();
                    events.push(GameEvent::TimerChanged { running: true });
                }
            }
            Command::StopTimer => {
                if self.state.timer.is_running() {
                    self.state.timer.stop();
                    events.push(GameEvent::TimerChanged { running: false });
                }
            }
            Command::Tick => {
                if self.expire_feedback() {
                    events.push(self.feedback_event());
                }
                if self.state.is_active() && self.state.timer.tick() {
                    events.push(GameEvent::TimerTicked {
                        seconds: self.state.timer.seconds(),
                    });
                }
            }
        }
        events
    }

    /// Clear feedback that has outlived its display time.
    pub fn expire_feedback(&mut self) -> bool {
        let now = self.clock.now_ms();
        self.state
            .expire_feedback(now, self.rules.feedback_lifetime_ms)
    }

    fn drop_into(
        &mut self,
        container: ContainerKind,
        piece_id: String,
        now: i64,
        events: &mut Events,
    ) {
        let scenario = self.catalog.get_clamped(self.state.current_scenario_index);
        let outcome = drop_piece(
            &mut self.state,
            scenario,
            &self.rules,
            container,
            &piece_id,
            now,
        );
        events.push(GameEvent::Dropped {
            container,
            piece_id,
            outcome,
        });
        if !outcome.success() {
            return;
        }
        if let Some(completion) = check_completion(&mut self.state, &self.catalog, &self.rules) {
            events.push(GameEvent::ScenarioCompleted(completion));
            if completion.game_complete {
                events.push(GameEvent::GameCompleted {
                    final_score: self.state.score,
                });
            }
        }
    }

    fn begin_drag(&mut self, piece_id: String, events: &mut Events) {
        let draggable = !self.state.scenario_complete
            && self.current_scenario().piece(&piece_id).is_some()
            && !self.state.placed_pieces.contains(&piece_id);
        if !draggable || self.state.active_piece.as_deref() == Some(piece_id.as_str()) {
            return;
        }
        self.state.active_piece = Some(piece_id.clone());
        events.push(GameEvent::DragChanged {
            piece_id: Some(piece_id),
        });
    }

    fn set_ui(&mut self, change: impl FnOnce(&mut UiFlags), events: &mut Events) {
        let before = self.state.ui;
        change(&mut self.state.ui);
        if self.state.ui != before {
            events.push(GameEvent::DialogsChanged(self.state.ui));
        }
    }

    fn feedback_event(&self) -> GameEvent {
        GameEvent::FeedbackChanged {
            text: self
                .state
                .feedback
                .as_ref()
                .map(|active| active.feedback.to_string()),
        }
    }
}
