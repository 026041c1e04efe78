//! Centralized scoring and persistence constants for the Level 3 game.
//!
//! These are the defaults behind [`crate::rules::ScoringRules`]. Keeping them
//! together means tuning happens through reviewed code changes rather than
//! scattered literals.

// Scoring -------------------------------------------------------------------
pub(crate) const HEALTH_MAX: u32 = 100;
pub(crate) const WRONG_CATEGORY_PENALTY: u32 = 10;
pub(crate) const INCORRECT_PIECE_PENALTY: u32 = 15;
pub(crate) const PLACEMENT_BASE_POINTS: u64 = 100;
pub(crate) const PLACEMENT_COMBO_STEP: u64 = 10;
pub(crate) const COMPLETION_BASE_BONUS: u64 = 1_000;
pub(crate) const COMPLETION_COMBO_STEP: u64 = 100;

// Feedback ------------------------------------------------------------------
pub(crate) const FEEDBACK_LIFETIME_MS: i64 = 2_500;
pub(crate) const FEEDBACK_CRITICAL_HIT: &str = "feedback.critical-hit";
pub(crate) const FEEDBACK_MISS: &str = "feedback.miss";
pub(crate) const FEEDBACK_WRONG_CATEGORY: &str = "feedback.wrong-category";
pub(crate) const FEEDBACK_ALREADY_PLACED: &str = "feedback.already-placed";
pub(crate) const FEEDBACK_CUSTOM: &str = "feedback.custom";

// Persistence ---------------------------------------------------------------
pub(crate) const STORAGE_KEY_BASE: &str = "gmp.level3.progress";

// Time-ago buckets ----------------------------------------------------------
pub(crate) const MS_PER_MINUTE: i64 = 60_000;
pub(crate) const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
pub(crate) const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;
