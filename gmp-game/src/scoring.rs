//! Drop validation and scoring.
//!
//! A drop resolves to exactly one outcome. Rejections are ordinary results:
//! they cost health and combo where the rules say so and are never errors.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::{ContainerKind, Scenario};
use crate::rules::ScoringRules;
use crate::state::{Feedback, GameState};

/// Why a drop did not place the piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Container and piece category disagree.
    WrongCategory,
    /// The piece is already on the board.
    AlreadyPlaced,
    /// Right container, but the piece is a distractor.
    Incorrect,
    /// The id is not part of the current scenario.
    UnknownPiece,
    /// The scenario is already complete.
    ScenarioClosed,
}

impl RejectReason {
    /// Rejections that cost health and break the combo.
    #[must_use]
    pub const fn is_penalized(self) -> bool {
        matches!(self, Self::WrongCategory | Self::Incorrect)
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::WrongCategory => "wrong category",
            Self::AlreadyPlaced => "already placed",
            Self::Incorrect => "miss",
            Self::UnknownPiece => "unknown piece",
            Self::ScenarioClosed => "scenario closed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DropOutcome {
    Placed { points: u64 },
    Rejected { reason: RejectReason, health_lost: u32 },
}

impl DropOutcome {
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self, Self::Placed { .. })
    }

    /// Whether the drop touched score, health, combo or placements.
    #[must_use]
    pub const fn changed_state(&self) -> bool {
        match self {
            Self::Placed { .. } => true,
            Self::Rejected { reason, .. } => reason.is_penalized(),
        }
    }
}

/// Decide what a drop would do without touching state.
#[must_use]
pub fn evaluate_drop(
    state: &GameState,
    scenario: &Scenario,
    rules: &ScoringRules,
    container: ContainerKind,
    piece_id: &str,
) -> DropOutcome {
    if state.scenario_complete || state.game_complete {
        return rejected(RejectReason::ScenarioClosed, 0);
    }
    let Some(piece) = scenario.piece(piece_id) else {
        return rejected(RejectReason::UnknownPiece, 0);
    };
    if !container.accepts(piece.category) {
        return rejected(
            RejectReason::WrongCategory,
            rules.wrong_category_penalty.min(state.health),
        );
    }
    if state.placed_pieces.contains(&piece.id) {
        return rejected(RejectReason::AlreadyPlaced, 0);
    }
    if !piece.is_correct {
        return rejected(
            RejectReason::Incorrect,
            rules.incorrect_piece_penalty.min(state.health),
        );
    }
    DropOutcome::Placed {
        points: rules.placement_points(state.combo),
    }
}

/// Resolve a drop of `piece_id` into `container` and apply its effects.
pub fn drop_piece(
    state: &mut GameState,
    scenario: &Scenario,
    rules: &ScoringRules,
    container: ContainerKind,
    piece_id: &str,
    now_ms: i64,
) -> DropOutcome {
    let outcome = evaluate_drop(state, scenario, rules, container, piece_id);
    match outcome {
        DropOutcome::Placed { points } => {
            if let Some(piece) = scenario.piece(piece_id) {
                state.placed_pieces.push(container, piece.clone());
            }
            state.score = state.score.saturating_add(points);
            state.combo = state.combo.saturating_add(1);
            state.set_feedback(Feedback::CriticalHit { points }, now_ms);
        }
        DropOutcome::Rejected {
            reason: reason @ (RejectReason::WrongCategory | RejectReason::Incorrect),
            health_lost,
        } => {
            state.damage(health_lost);
            state.combo = 0;
            let feedback = if reason == RejectReason::WrongCategory {
                Feedback::WrongCategory
            } else {
                Feedback::Miss
            };
            state.set_feedback(feedback, now_ms);
        }
        DropOutcome::Rejected {
            reason: RejectReason::AlreadyPlaced,
            ..
        } => {
            state.set_feedback(Feedback::AlreadyPlaced, now_ms);
        }
        DropOutcome::Rejected {
            reason: RejectReason::UnknownPiece,
            ..
        } => {
            log::warn!(
                "ignoring drop of unknown piece '{piece_id}' in scenario {}",
                state.current_scenario_index
            );
        }
        DropOutcome::Rejected {
            reason: RejectReason::ScenarioClosed,
            ..
        } => {
            log::debug!("ignoring drop of '{piece_id}' after scenario completion");
        }
    }
    state.active_piece = None;
    outcome
}

const fn rejected(reason: RejectReason, health_lost: u32) -> DropOutcome {
    DropOutcome::Rejected {
        reason,
        health_lost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Piece, PieceCategory};

    fn scenario() -> Scenario {
        let piece = |id: &str, category, is_correct| Piece {
            id: id.into(),
            text: id.into(),
            category,
            is_correct,
        };
        Scenario {
            title: "fixture".into(),
            description: String::new(),
            pieces: vec![
                piece("v1", PieceCategory::Violation, true),
                piece("v2", PieceCategory::Violation, true),
                piece("v3", PieceCategory::Violation, false),
                piece("a1", PieceCategory::Action, true),
                piece("a3", PieceCategory::Action, false),
            ],
        }
    }

    fn drop(state: &mut GameState, container: ContainerKind, id: &str) -> DropOutcome {
        drop_piece(
            state,
            &scenario(),
            &ScoringRules::default(),
            container,
            id,
            0,
        )
    }

    #[test]
    fn correct_drop_scores_with_combo() {
        let mut state = GameState::new();
        assert_eq!(
            drop(&mut state, ContainerKind::Violations, "v1"),
            DropOutcome::Placed { points: 100 }
        );
        assert_eq!(
            drop(&mut state, ContainerKind::Violations, "v2"),
            DropOutcome::Placed { points: 110 }
        );
        assert_eq!(state.score, 210);
        assert_eq!(state.combo, 2);
        assert_eq!(state.placed_pieces.violations.len(), 2);
        assert_eq!(
            state.feedback.as_ref().map(|f| &f.feedback),
            Some(&Feedback::CriticalHit { points: 110 })
        );
    }

    #[test]
    fn wrong_category_costs_ten_and_breaks_combo() {
        let mut state = GameState::new();
        drop(&mut state, ContainerKind::Violations, "v1");
        let outcome = drop(&mut state, ContainerKind::Actions, "v2");
        assert_eq!(
            outcome,
            DropOutcome::Rejected {
                reason: RejectReason::WrongCategory,
                health_lost: 10
            }
        );
        assert_eq!(state.health, 90);
        assert_eq!(state.combo, 0);
        assert_eq!(state.score, 100);
        assert_eq!(state.placed_pieces.len(), 1);
    }

    #[test]
    fn category_is_checked_before_duplicates() {
        let mut state = GameState::new();
        drop(&mut state, ContainerKind::Violations, "v1");
        let outcome = drop(&mut state, ContainerKind::Actions, "v1");
        assert!(matches!(
            outcome,
            DropOutcome::Rejected {
                reason: RejectReason::WrongCategory,
                ..
            }
        ));
    }

    #[test]
    fn duplicate_leaves_counters_alone() {
        let mut state = GameState::new();
        drop(&mut state, ContainerKind::Violations, "v1");
        let before = state.stats();
        let outcome = drop(&mut state, ContainerKind::Violations, "v1");
        assert!(!outcome.changed_state());
        assert_eq!(state.stats(), before);
        assert_eq!(
            state.feedback.as_ref().map(|f| &f.feedback),
            Some(&Feedback::AlreadyPlaced)
        );
    }

    #[test]
    fn incorrect_piece_costs_fifteen() {
        let mut state = GameState::new();
        drop(&mut state, ContainerKind::Actions, "a1");
        drop(&mut state, ContainerKind::Actions, "a3");
        assert_eq!(state.health, 85);
        assert_eq!(state.combo, 0);
        assert!(!state.placed_pieces.contains("a3"));
    }

    #[test]
    fn health_never_goes_negative() {
        let mut state = GameState::new();
        for _ in 0..10 {
            drop(&mut state, ContainerKind::Violations, "v3");
        }
        assert_eq!(state.health, 0);
        let outcome = drop(&mut state, ContainerKind::Violations, "v3");
        assert_eq!(
            outcome,
            DropOutcome::Rejected {
                reason: RejectReason::Incorrect,
                health_lost: 0
            }
        );
    }

    #[test]
    fn unknown_and_closed_drops_are_inert() {
        let mut state = GameState::new();
        let before = state.clone();
        let outcome = drop(&mut state, ContainerKind::Violations, "nope");
        assert!(!outcome.changed_state());
        assert_eq!(state, before);

        state.scenario_complete = true;
        let outcome = drop(&mut state, ContainerKind::Violations, "v1");
        assert_eq!(
            outcome,
            DropOutcome::Rejected {
                reason: RejectReason::ScenarioClosed,
                health_lost: 0
            }
        );
        assert!(state.placed_pieces.is_empty());
    }

    #[test]
    fn evaluate_does_not_mutate() {
        let state = GameState::new();
        let outcome = evaluate_drop(
            &state,
            &scenario(),
            &ScoringRules::default(),
            ContainerKind::Violations,
            "v1",
        );
        assert!(outcome.success());
        assert_eq!(state, GameState::new());
    }
}
