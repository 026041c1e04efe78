//! Scenario completion and advancement.
use serde::{Deserialize, Serialize};

use crate::catalog::ScenarioCatalog;
use crate::rules::ScoringRules;
use crate::state::{GameState, ScenarioResult};

/// What happened when the current scenario finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub scenario_index: usize,
    pub bonus: u64,
    /// The finished scenario was the last one.
    pub game_complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceRejection {
    #[error("current scenario is not complete")]
    NotComplete,
    #[error("current scenario is the last one")]
    FinalScenario,
    #[error("game is already complete")]
    GameOver,
}

/// Award completion once all correct pieces are placed.
///
/// Returns `None` while the scenario is in progress, when it was already
/// completed, or when it has no correct pieces at all.
pub fn check_completion(
    state: &mut GameState,
    catalog: &ScenarioCatalog,
    rules: &ScoringRules,
) -> Option<Completion> {
    if state.scenario_complete || state.game_complete {
        return None;
    }
    let scenario = catalog.get_clamped(state.current_scenario_index);
    if !state.all_correct_placed(scenario) {
        return None;
    }

    let bonus = rules.completion_bonus(state.combo);
    state.score = state.score.saturating_add(bonus);
    state.scenario_complete = true;
    state.feedback = None;
    state.active_piece = None;
    state.ui.show_victory = true;

    let game_complete = state.current_scenario_index >= catalog.last_index();
    if game_complete {
        finish_game(state);
    }
    log::debug!(
        "scenario {} complete (bonus {bonus}, final: {game_complete})",
        state.current_scenario_index
    );
    Some(Completion {
        scenario_index: state.current_scenario_index,
        bonus,
        game_complete,
    })
}

/// Move to the next scenario, banking the finished one's result.
///
/// # Errors
///
/// Returns the reason when the current scenario is unfinished, is the last
/// one, or the game is over. State is untouched in that case.
pub fn advance_scenario(
    state: &mut GameState,
    catalog: &ScenarioCatalog,
    rules: &ScoringRules,
) -> Result<ScenarioResult, AdvanceRejection> {
    if state.game_complete {
        return Err(AdvanceRejection::GameOver);
    }
    if !state.scenario_complete {
        return Err(AdvanceRejection::NotComplete);
    }
    if state.current_scenario_index >= catalog.last_index() {
        return Err(AdvanceRejection::FinalScenario);
    }

    let result = state.scenario_result();
    state.scenario_results.push(result);
    state.current_scenario_index += 1;
    state.placed_pieces.clear();
    state.combo = 0;
    state.health = rules.max_health;
    state.scenario_complete = false;
    state.feedback = None;
    state.active_piece = None;
    state.ui.show_victory = false;
    state.ui.show_scenario = true;
    state.scenario_score_start = state.score;
    state.scenario_time_start = state.timer.seconds();
    log::debug!("advanced to scenario {}", state.current_scenario_index);
    Ok(result)
}

fn finish_game(state: &mut GameState) {
    let result = state.scenario_result();
    state.scenario_results.push(result);
    state.game_complete = true;
    state.timer.stop();
    state.ui.show_final_stats = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ContainerKind, Piece, PieceCategory, Scenario};
    use crate::scoring::drop_piece;

    fn catalog(scenarios: usize) -> ScenarioCatalog {
        let piece = |id: &str, category, is_correct| Piece {
            id: id.into(),
            text: id.into(),
            category,
            is_correct,
        };
        let scenario = Scenario {
            title: "fixture".into(),
            description: String::new(),
            pieces: vec![
                piece("v1", PieceCategory::Violation, true),
                piece("a1", PieceCategory::Action, true),
                piece("a2", PieceCategory::Action, false),
            ],
        };
        ScenarioCatalog::new(vec![scenario; scenarios]).unwrap()
    }

    fn place_all(state: &mut GameState, catalog: &ScenarioCatalog) {
        let scenario = catalog.get_clamped(state.current_scenario_index).clone();
        let rules = ScoringRules::default();
        drop_piece(state, &scenario, &rules, ContainerKind::Violations, "v1", 0);
        drop_piece(state, &scenario, &rules, ContainerKind::Actions, "a1", 0);
    }

    #[test]
    fn completion_awards_bonus_once() {
        let catalog = catalog(2);
        let rules = ScoringRules::default();
        let mut state = GameState::new();
        assert!(check_completion(&mut state, &catalog, &rules).is_none());

        place_all(&mut state, &catalog);
        let completion = check_completion(&mut state, &catalog, &rules).unwrap();
        assert_eq!(completion.bonus, 1_200);
        assert!(!completion.game_complete);
        assert_eq!(state.score, 100 + 110 + 1_200);
        assert!(state.ui.show_victory);
        assert!(state.feedback.is_none());

        assert!(check_completion(&mut state, &catalog, &rules).is_none());
        assert_eq!(state.score, 1_410);
    }

    #[test]
    fn advance_requires_completion() {
        let catalog = catalog(2);
        let rules = ScoringRules::default();
        let mut state = GameState::new();
        assert_eq!(
            advance_scenario(&mut state, &catalog, &rules),
            Err(AdvanceRejection::NotComplete)
        );
        assert_eq!(state.current_scenario_index, 0);
    }

    #[test]
    fn advance_resets_per_scenario_state() {
        let catalog = catalog(2);
        let rules = ScoringRules::default();
        let mut state = GameState::new();
        place_all(&mut state, &catalog);
        let scenario = catalog.get_clamped(0).clone();
        drop_piece(&mut state, &scenario, &rules, ContainerKind::Actions, "a2", 0);
        check_completion(&mut state, &catalog, &rules).unwrap();
        let score = state.score;

        let result = advance_scenario(&mut state, &catalog, &rules).unwrap();
        assert_eq!(result.scenario_index, 0);
        assert_eq!(result.score, score);
        assert_eq!(result.health, 85);
        assert_eq!(state.current_scenario_index, 1);
        assert_eq!(state.health, 100);
        assert_eq!(state.combo, 0);
        assert_eq!(state.score, score);
        assert!(state.placed_pieces.is_empty());
        assert!(!state.scenario_complete);
        assert!(state.ui.show_scenario);
        assert_eq!(state.scenario_results, vec![result]);
    }

    #[test]
    fn last_scenario_completes_the_game() {
        let catalog = catalog(1);
        let rules = ScoringRules::default();
        let mut state = GameState::new();
        state.timer.start();
        place_all(&mut state, &catalog);
        let completion = check_completion(&mut state, &catalog, &rules).unwrap();
        assert!(completion.game_complete);
        assert!(state.game_complete);
        assert!(state.ui.show_final_stats);
        assert!(!state.timer.is_running());
        assert_eq!(state.scenario_results.len(), 1);
        assert_eq!(
            advance_scenario(&mut state, &catalog, &rules),
            Err(AdvanceRejection::GameOver)
        );
    }

    #[test]
    fn zero_correct_scenario_never_completes() {
        let scenario = Scenario {
            title: "empty".into(),
            description: String::new(),
            pieces: vec![Piece {
                id: "x".into(),
                text: "x".into(),
                category: PieceCategory::Action,
                is_correct: false,
            }],
        };
        let catalog = ScenarioCatalog::new(vec![scenario]).unwrap();
        let mut state = GameState::new();
        assert!(check_completion(&mut state, &catalog, &ScoringRules::default()).is_none());
        assert!(!state.scenario_complete);
    }
}
