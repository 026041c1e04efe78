use std::fmt;
use std::str::FromStr;

use gmp_game::{ContainerKind, GameState, Scenario};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// A drop chosen by a [`PlayerPolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyMove {
    pub container: ContainerKind,
    pub piece_id: String,
}

impl PolicyMove {
    #[must_use]
    pub fn new(container: ContainerKind, piece_id: impl Into<String>) -> Self {
        Self {
            container,
            piece_id: piece_id.into(),
        }
    }
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Next drop for the current scenario, or `None` once the policy has
    /// nothing left to try.
    fn next_move(&mut self, scenario: &Scenario, state: &GameState) -> Option<PolicyMove>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy '{0}' (expected perfect, careless, random or all)")]
pub struct UnknownStrategy(pub String);

/// Built-in gameplay strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameplayStrategy {
    Perfect,
    Careless,
    Random,
}

impl GameplayStrategy {
    pub const ALL: [Self; 3] = [Self::Perfect, Self::Careless, Self::Random];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Perfect => "perfect",
            Self::Careless => "careless",
            Self::Random => "random",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Perfect => "Perfect",
            Self::Careless => "Careless",
            Self::Random => "Random",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Perfect => "only correct pieces, always into the right container",
            Self::Careless => "every piece into both containers, in catalog order",
            Self::Random => "seeded random drops, then perfect play to finish",
        }
    }

    /// Whether a run with this strategy must never lose health.
    #[must_use]
    pub const fn is_flawless(self) -> bool {
        matches!(self, Self::Perfect)
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy> {
        match self {
            Self::Perfect => Box::new(PerfectPolicy),
            Self::Careless => Box::new(CarelessPolicy::default()),
            Self::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GameplayStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStrategy(s.trim().to_string()))
    }
}

/// Parse a comma-separated strategy list; `all` expands to every strategy.
///
/// # Errors
///
/// Returns the first name that is not a known strategy.
pub fn parse_strategies(arg: &str) -> Result<Vec<GameplayStrategy>, UnknownStrategy> {
    let mut strategies: Vec<GameplayStrategy> = Vec::new();
    for token in arg.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let parsed = if token.eq_ignore_ascii_case("all") {
            GameplayStrategy::ALL.to_vec()
        } else {
            vec![token.parse()?]
        };
        for strategy in parsed {
            if !strategies.contains(&strategy) {
                strategies.push(strategy);
            }
        }
    }
    Ok(strategies)
}

fn first_unplaced_correct(scenario: &Scenario, state: &GameState) -> Option<PolicyMove> {
    scenario
        .correct_pieces()
        .find(|piece| !state.placed_pieces.contains(&piece.id))
        .map(|piece| PolicyMove::new(ContainerKind::for_category(piece.category), &piece.id))
}

struct PerfectPolicy;

impl PlayerPolicy for PerfectPolicy {
    fn name(&self) -> &'static str {
        "Perfect"
    }

    fn next_move(&mut self, scenario: &Scenario, state: &GameState) -> Option<PolicyMove> {
        first_unplaced_correct(scenario, state)
    }
}

#[derive(Default)]
struct CarelessPolicy {
    scenario_index: usize,
    cursor: usize,
}

impl PlayerPolicy for CarelessPolicy {
    fn name(&self) -> &'static str {
        "Careless"
    }

    fn next_move(&mut self, scenario: &Scenario, state: &GameState) -> Option<PolicyMove> {
        if state.current_scenario_index != self.scenario_index {
            self.scenario_index = state.current_scenario_index;
            self.cursor = 0;
        }
        let containers = ContainerKind::ALL.len();
        let piece = scenario.pieces.get(self.cursor / containers)?;
        let container = ContainerKind::ALL[self.cursor % containers];
        self.cursor += 1;
        Some(PolicyMove::new(container, &piece.id))
    }
}

struct RandomPolicy {
    rng: ChaCha20Rng,
    scenario_index: usize,
    attempts: u32,
    max_attempts: u32,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            scenario_index: 0,
            attempts: 0,
            max_attempts: 24,
        }
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn next_move(&mut self, scenario: &Scenario, state: &GameState) -> Option<PolicyMove> {
        if state.current_scenario_index != self.scenario_index {
            self.scenario_index = state.current_scenario_index;
            self.attempts = 0;
        }
        if self.attempts >= self.max_attempts || scenario.pieces.is_empty() {
            return first_unplaced_correct(scenario, state);
        }
        self.attempts += 1;
        let piece = &scenario.pieces[self.rng.gen_range(0..scenario.pieces.len())];
        let container = ContainerKind::ALL[self.rng.gen_range(0..ContainerKind::ALL.len())];
        Some(PolicyMove::new(container, &piece.id))
    }
}
