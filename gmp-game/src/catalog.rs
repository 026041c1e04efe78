//! Scenario catalog: the static cases the player works through.
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Which kind of answer a piece is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceCategory {
    Violation,
    Action,
}

impl PieceCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Violation => "violation",
            Self::Action => "action",
        }
    }
}

impl fmt::Display for PieceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drop target on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Violations,
    Actions,
}

impl ContainerKind {
    pub const ALL: [Self; 2] = [Self::Violations, Self::Actions];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Violations => "violations",
            Self::Actions => "actions",
        }
    }

    /// The only piece category this container takes.
    #[must_use]
    pub const fn category(self) -> PieceCategory {
        match self {
            Self::Violations => PieceCategory::Violation,
            Self::Actions => PieceCategory::Action,
        }
    }

    #[must_use]
    pub const fn for_category(category: PieceCategory) -> Self {
        match category {
            PieceCategory::Violation => Self::Violations,
            PieceCategory::Action => Self::Actions,
        }
    }

    #[must_use]
    pub fn accepts(self, category: PieceCategory) -> bool {
        self.category() == category
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "violations" => Ok(Self::Violations),
            "actions" => Ok(Self::Actions),
            _ => Err(()),
        }
    }
}

/// A draggable answer option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Piece {
    /// Unique within its scenario only.
    pub id: String,
    pub text: String,
    pub category: PieceCategory,
    pub is_correct: bool,
}

/// One case of the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub title: String,
    pub description: String,
    pub pieces: Vec<Piece>,
}

impl Scenario {
    #[must_use]
    pub fn piece(&self, id: &str) -> Option<&Piece> {
        self.pieces.iter().find(|piece| piece.id == id)
    }

    /// Number of pieces that must be placed to finish the scenario.
    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.pieces.iter().filter(|piece| piece.is_correct).count()
    }

    pub fn correct_pieces(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.iter().filter(|piece| piece.is_correct)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog JSON could not be parsed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("catalog contains no scenarios")]
    Empty,
    #[error("scenario {scenario} repeats piece id '{id}'")]
    DuplicatePiece { scenario: usize, id: String },
}

/// Ordered, validated list of scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioCatalog {
    scenarios: Vec<Scenario>,
}

static BUILTIN: Lazy<Arc<ScenarioCatalog>> = Lazy::new(|| {
    let catalog = ScenarioCatalog::from_json(include_str!("../data/scenarios.json"))
        .unwrap_or_else(|err| panic!("embedded scenario catalog is invalid: {err}"));
    Arc::new(catalog)
});

impl ScenarioCatalog {
    /// Build a catalog, rejecting empty lists and repeated ids within a scenario.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no scenarios or a scenario repeats a piece id.
    pub fn new(scenarios: Vec<Scenario>) -> Result<Self, CatalogError> {
        if scenarios.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (index, scenario) in scenarios.iter().enumerate() {
            let mut seen = HashSet::new();
            for piece in &scenario.pieces {
                if !seen.insert(piece.id.as_str()) {
                    return Err(CatalogError::DuplicatePiece {
                        scenario: index,
                        id: piece.id.clone(),
                    });
                }
            }
        }
        Ok(Self { scenarios })
    }

    /// Parse a catalog from JSON of the form `{ "scenarios": [...] }`.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        #[derive(Deserialize)]
        struct Raw {
            scenarios: Vec<Scenario>,
        }
        let raw: Raw = serde_json::from_str(json)?;
        Self::new(raw.scenarios)
    }

    /// The catalog shipped with the game.
    ///
    /// # Panics
    /// Panics on first use if the embedded `scenarios.json` fails validation.
    #[must_use]
    pub fn builtin() -> Arc<Self> {
        Arc::clone(&BUILTIN)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Scenario> {
        self.scenarios.get(index)
    }

    /// Scenario at `index`, clamped to the last entry.
    #[must_use]
    pub fn get_clamped(&self, index: usize) -> &Scenario {
        let last = self.scenarios.len().saturating_sub(1);
        &self.scenarios[index.min(last)]
    }

    #[must_use]
    pub fn last_index(&self) -> usize {
        self.scenarios.len().saturating_sub(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter()
    }
}
