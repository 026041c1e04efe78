//! Read-only view models for the presentation layer.
use serde::Serialize;

use crate::catalog::{Piece, ScenarioCatalog};
use crate::persistence::progress_percentage;
use crate::state::{GameState, GameStats, PlacedPieces, UiFlags};
use crate::timer::format_mm_ss;

/// Everything a front end needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub game_stats: GameStats,
    pub scenario_title: String,
    pub scenario_description: String,
    /// 1-based.
    pub scenario_number: usize,
    pub total_scenarios: usize,
    pub placed_pieces: PlacedPieces,
    pub available_pieces: Vec<Piece>,
    pub is_complete: bool,
    pub game_complete: bool,
    pub feedback: Option<String>,
    pub ui: UiFlags,
    pub active_piece: Option<String>,
    pub formatted_timer: String,
    pub progress_percentage: u32,
}

/// Pieces of the current scenario not yet placed, in catalog order.
#[must_use]
pub fn available_pieces(state: &GameState, catalog: &ScenarioCatalog) -> Vec<Piece> {
    catalog
        .get_clamped(state.current_scenario_index)
        .pieces
        .iter()
        .filter(|piece| !state.placed_pieces.contains(&piece.id))
        .cloned()
        .collect()
}

#[must_use]
pub fn formatted_timer(state: &GameState) -> String {
    format_mm_ss(state.timer.seconds())
}

/// Share of scenarios finished, rounded to a whole percent.
#[must_use]
pub fn game_progress_percentage(state: &GameState, catalog: &ScenarioCatalog) -> u32 {
    progress_percentage(state.scenario_results.len(), catalog.len())
}

#[must_use]
pub fn game_view(state: &GameState, catalog: &ScenarioCatalog) -> GameView {
    let scenario = catalog.get_clamped(state.current_scenario_index);
    GameView {
        game_stats: state.stats(),
        scenario_title: scenario.title.clone(),
        scenario_description: scenario.description.clone(),
        scenario_number: state.current_scenario_index.min(catalog.last_index()) + 1,
        total_scenarios: catalog.len(),
        placed_pieces: state.placed_pieces.clone(),
        available_pieces: available_pieces(state, catalog),
        is_complete: state.scenario_complete,
        game_complete: state.game_complete,
        feedback: state
            .feedback
            .as_ref()
            .map(|active| active.feedback.to_string()),
        ui: state.ui,
        active_piece: state.active_piece.clone(),
        formatted_timer: formatted_timer(state),
        progress_percentage: game_progress_percentage(state, catalog),
    }
}
