use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::catalog::{ContainerKind, ScenarioCatalog};
use crate::constants::{HEALTH_MAX, MS_PER_DAY, MS_PER_HOUR, MS_PER_MINUTE};
use crate::state::{GameState, GameStats, PlacedPieces, ScenarioResult, UiFlags};
use crate::timer::Timer;

/// Persisted snapshot of an in-progress game.
///
/// Field names are part of the save format shared with the remote table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameProgress {
    pub current_scenario_index: usize,
    pub scenario_results: Vec<ScenarioResult>,
    pub placed_pieces: PlacedPieces,
    pub game_stats: GameStats,
    /// Epoch milliseconds of the save.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("scenario index {index} is outside a catalog of {total}")]
    ScenarioOutOfRange { index: usize, total: usize },
    #[error("health {0} exceeds the maximum")]
    HealthOutOfRange(u32),
    #[error("placed piece '{0}' is not part of the scenario")]
    UnknownPiece(String),
    #[error("placed piece '{0}' is not a correct answer")]
    IncorrectPiece(String),
    #[error("placed piece '{id}' sits in the {container} list")]
    WrongContainer { id: String, container: ContainerKind },
    #[error("piece '{0}' is placed twice")]
    DuplicatePiece(String),
    #[error("result for scenario {0} is out of order or ahead of progress")]
    ResultOutOfOrder(usize),
}

impl GameProgress {
    #[must_use]
    pub fn from_state(state: &GameState, timestamp: i64) -> Self {
        Self {
            current_scenario_index: state.current_scenario_index,
            scenario_results: state.scenario_results.clone(),
            placed_pieces: state.placed_pieces.clone(),
            game_stats: state.stats(),
            timestamp,
        }
    }

    /// Check the snapshot against the catalog it will be restored into.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self, catalog: &ScenarioCatalog) -> Result<(), SnapshotError> {
        let index = self.current_scenario_index;
        let Some(scenario) = catalog.get(index) else {
            return Err(SnapshotError::ScenarioOutOfRange {
                index,
                total: catalog.len(),
            });
        };
        if self.game_stats.health > HEALTH_MAX {
            return Err(SnapshotError::HealthOutOfRange(self.game_stats.health));
        }

        let mut seen = HashSet::new();
        for container in ContainerKind::ALL {
            for placed in self.placed_pieces.list(container) {
                let Some(piece) = scenario.piece(&placed.id) else {
                    return Err(SnapshotError::UnknownPiece(placed.id.clone()));
                };
                if !piece.is_correct {
                    return Err(SnapshotError::IncorrectPiece(placed.id.clone()));
                }
                if !container.accepts(piece.category) {
                    return Err(SnapshotError::WrongContainer {
                        id: placed.id.clone(),
                        container,
                    });
                }
                if !seen.insert(placed.id.as_str()) {
                    return Err(SnapshotError::DuplicatePiece(placed.id.clone()));
                }
            }
        }

        let finished = index == catalog.last_index()
            && self.placed_pieces.len() == scenario.correct_count()
            && scenario.correct_count() > 0;
        let mut previous: Option<usize> = None;
        for result in &self.scenario_results {
            let in_order = previous.is_none_or(|prev| result.scenario_index > prev);
            let reached =
                result.scenario_index < index || (finished && result.scenario_index == index);
            if !in_order || !reached || result.health > HEALTH_MAX {
                return Err(SnapshotError::ResultOutOfOrder(result.scenario_index));
            }
            previous = Some(result.scenario_index);
        }
        Ok(())
    }

    /// Rebuild runtime state from a validated snapshot.
    ///
    /// Placed pieces are taken from the catalog so stale text in old saves
    /// does not leak back in. A scenario that was already finished comes
    /// back complete without its bonus being awarded again.
    #[must_use]
    pub fn restore(&self, catalog: &ScenarioCatalog) -> GameState {
        let index = self.current_scenario_index.min(catalog.last_index());
        let scenario = catalog.get_clamped(index);
        let mut placed = PlacedPieces::new();
        for container in ContainerKind::ALL {
            for saved in self.placed_pieces.list(container) {
                if let Some(piece) = scenario.piece(&saved.id) {
                    placed.push(container, piece.clone());
                }
            }
        }

        let mut state = GameState {
            current_scenario_index: index,
            placed_pieces: placed,
            score: self.game_stats.score,
            health: self.game_stats.health.min(HEALTH_MAX),
            combo: self.game_stats.combo,
            timer: Timer::resumed_at(self.game_stats.timer),
            scenario_results: self.scenario_results.clone(),
            ui: UiFlags::default(),
            ..GameState::default()
        };

        if state.all_correct_placed(scenario) {
            state.scenario_complete = true;
            if index == catalog.last_index() {
                state.game_complete = true;
                state.ui.show_final_stats = true;
            } else {
                state.ui.show_victory = true;
            }
        }
        let banked_current = state
            .scenario_results
            .last()
            .is_some_and(|result| result.scenario_index == index);
        if state.game_complete && !banked_current {
            // Saved between the final placement and the result being recorded.
            state.rebase_scenario_start();
            let result = state.scenario_result();
            state.scenario_results.push(result);
        }
        state.rebase_scenario_start();
        state
    }
}

/// What the resume-or-restart prompt shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    /// 1-based.
    pub current_scenario: usize,
    pub total_scenarios: usize,
    pub completed_scenarios: usize,
    pub progress_percentage: u32,
    pub time_ago: String,
}

/// Summarize a snapshot for the resume prompt.
#[must_use]
pub fn progress_summary(
    progress: &GameProgress,
    total_scenarios: usize,
    now_ms: i64,
) -> ProgressSummary {
    let completed = progress.scenario_results.len();
    ProgressSummary {
        current_scenario: (progress.current_scenario_index + 1).min(total_scenarios.max(1)),
        total_scenarios,
        completed_scenarios: completed,
        progress_percentage: progress_percentage(completed, total_scenarios),
        time_ago: time_ago(now_ms, progress.timestamp),
    }
}

/// `round(completed / total * 100)`, zero for an empty catalog.
#[must_use]
pub fn progress_percentage(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u64;
    let total = total as u64;
    // Integer half-up rounding of completed * 100 / total.
    let pct = (completed * 200 + total) / (total * 2);
    u32::try_from(pct).unwrap_or(100)
}

/// Coarse human description of how long ago `timestamp_ms` was.
#[must_use]
pub fn time_ago(now_ms: i64, timestamp_ms: i64) -> String {
    let elapsed = now_ms.saturating_sub(timestamp_ms).max(0);
    if elapsed < MS_PER_MINUTE {
        return "just now".to_string();
    }
    let (count, unit) = if elapsed < MS_PER_HOUR {
        (elapsed / MS_PER_MINUTE, "minute")
    } else if elapsed < MS_PER_DAY {
        (elapsed / MS_PER_HOUR, "hour")
    } else {
        (elapsed / MS_PER_DAY, "day")
    };
    let plural = if count == 1 { "" } else { "s" };
    format!("{count} {unit}{plural} ago")
}
