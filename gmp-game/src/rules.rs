//! Tunable scoring rules.
use serde::{Deserialize, Serialize};

use crate::constants::{
    COMPLETION_BASE_BONUS, COMPLETION_COMBO_STEP, FEEDBACK_LIFETIME_MS, HEALTH_MAX,
    INCORRECT_PIECE_PENALTY, PLACEMENT_BASE_POINTS, PLACEMENT_COMBO_STEP, WRONG_CATEGORY_PENALTY,
};

/// Point values and penalties applied by the scoring engine.
///
/// The defaults are the Level 3 values. Other levels historically used their
/// own constants, so hosts can load a different table from JSON instead of
/// patching code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoringRules {
    pub max_health: u32,
    pub wrong_category_penalty: u32,
    pub incorrect_piece_penalty: u32,
    pub placement_base: u64,
    pub placement_combo_step: u64,
    pub completion_base: u64,
    pub completion_combo_step: u64,
    /// How long a feedback message stays up before auto-clearing.
    pub feedback_lifetime_ms: i64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            max_health: HEALTH_MAX,
            wrong_category_penalty: WRONG_CATEGORY_PENALTY,
            incorrect_piece_penalty: INCORRECT_PIECE_PENALTY,
            placement_base: PLACEMENT_BASE_POINTS,
            placement_combo_step: PLACEMENT_COMBO_STEP,
            completion_base: COMPLETION_BASE_BONUS,
            completion_combo_step: COMPLETION_COMBO_STEP,
            feedback_lifetime_ms: FEEDBACK_LIFETIME_MS,
        }
    }
}

impl ScoringRules {
    /// Load rules from JSON; missing fields fall back to the Level 3 defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Points for a correct placement at the given combo.
    #[must_use]
    pub const fn placement_points(&self, combo: u32) -> u64 {
        self.placement_base
            .saturating_add((combo as u64).saturating_mul(self.placement_combo_step))
    }

    /// Bonus for finishing a scenario at the given combo.
    #[must_use]
    pub const fn completion_bonus(&self, combo: u32) -> u64 {
        self.completion_base
            .saturating_add((combo as u64).saturating_mul(self.completion_combo_step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_level_three_values() {
        let rules = ScoringRules::default();
        assert_eq!(rules.placement_points(0), 100);
        assert_eq!(rules.placement_points(3), 130);
        assert_eq!(rules.completion_bonus(4), 1_400);
        assert_eq!(rules.max_health, 100);
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let rules = ScoringRules::from_json(r#"{ "placementBase": 50 }"#).unwrap();
        assert_eq!(rules.placement_base, 50);
        assert_eq!(rules.incorrect_piece_penalty, 15);
        assert_eq!(rules.wrong_category_penalty, 10);
    }

    #[test]
    fn huge_combo_steps_saturate() {
        let rules = ScoringRules::from_json(
            r#"{ "placementComboStep": 18446744073709551615, "completionComboStep": 18446744073709551615 }"#,
        )
        .unwrap();
        assert_eq!(rules.placement_points(0), 100);
        assert_eq!(rules.placement_points(2), u64::MAX);
        assert_eq!(rules.completion_bonus(7), u64::MAX);
    }
}
