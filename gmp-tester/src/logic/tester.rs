use colored::Colorize;
use gmp_game::{
    Command, DropOutcome, FileStore, GameEngine, GameEvent, GameSession, GameState, LocalStore,
    ManualClock, MemoryStore, Persistence, ScenarioCatalog,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::policy::{GameplayStrategy, PlayerPolicy};

/// Seconds of play simulated between consecutive drops.
const TICKS_PER_MOVE: u32 = 3;
/// Wall-clock start for simulated runs (2024-01-01T00:00:00Z).
const CLOCK_START_MS: i64 = 1_704_067_200_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    pub mean_score: f64,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

/// What one full playthrough looked like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub strategy: String,
    pub seed: u64,
    pub final_score: u64,
    pub commands: usize,
    pub rejected_drops: usize,
    pub seconds_played: u64,
    pub resumed_at_scenario: Option<usize>,
}

pub struct LogicTester {
    catalog: Arc<ScenarioCatalog>,
    save_dir: Option<PathBuf>,
    verbose: bool,
}

impl LogicTester {
    #[must_use]
    pub fn new(catalog: Arc<ScenarioCatalog>, verbose: bool) -> Self {
        Self {
            catalog,
            save_dir: None,
            verbose,
        }
    }

    /// Save through files under `dir` instead of in memory.
    #[must_use]
    pub fn with_save_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.save_dir = dir;
        self
    }

    pub fn run_strategy(
        &self,
        strategy: GameplayStrategy,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        seeds
            .iter()
            .map(|&seed| {
                if self.verbose {
                    println!(
                        "🧪 Testing strategy: {} (seed: {seed})",
                        strategy.label().bright_white()
                    );
                }
                self.run_single(strategy, seed, iterations)
            })
            .collect()
    }

    fn run_single(&self, strategy: GameplayStrategy, seed: u64, iterations: usize) -> ScenarioResult {
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();
        let mut scores = Vec::new();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
            match self.run_iteration(strategy, iteration_seed) {
                Ok(summary) => {
                    let duration = start_time.elapsed();
                    performance_data.push(duration);
                    if self.verbose {
                        println!(
                            "  ✅ Iteration {}/{} passed ({duration:?}) score:{} rejected:{} resumed at:{:?}",
                            i + 1,
                            iterations,
                            summary.final_score,
                            summary.rejected_drops,
                            summary.resumed_at_scenario
                        );
                    }
                    scores.push(summary.final_score);
                }
                Err(err) => {
                    if self.verbose {
                        println!(
                            "  ❌ Iteration {}/{} failed: {}",
                            i + 1,
                            iterations,
                            err.clone().red()
                        );
                    }
                    failures.push(format!(
                        "Iteration {} (strategy {}, seed {iteration_seed}): {err}",
                        i + 1,
                        strategy.label()
                    ));
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };
        #[allow(clippy::cast_precision_loss)]
        let mean_score = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<u64>() as f64 / scores.len() as f64
        };

        ScenarioResult {
            scenario_name: format!("{} (seed {seed})", strategy.label()),
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: iterations - failures.len(),
            failures,
            mean_score,
            average_duration,
            performance_data,
        }
    }

    fn run_iteration(&self, strategy: GameplayStrategy, seed: u64) -> Result<RunSummary, String> {
        match &self.save_dir {
            Some(dir) => {
                let root = dir.join(format!("{}-{seed}", strategy.key()));
                let summary = self.play_campaign(strategy, seed, &FileStore::new(&root));
                let _ = std::fs::remove_dir_all(root);
                summary
            }
            None => self.play_campaign(strategy, seed, &MemoryStore::new()),
        }
    }

    /// Play the whole catalog, swapping to a freshly resumed engine halfway.
    pub fn play_campaign<L>(
        &self,
        strategy: GameplayStrategy,
        seed: u64,
        store: &L,
    ) -> Result<RunSummary, String>
    where
        L: LocalStore + Clone + Debug,
    {
        let clock = ManualClock::new(CLOCK_START_MS);
        let mut engine = self.engine(store.clone(), &clock);
        let mut policy = strategy.create_policy(seed);
        let mut summary = RunSummary {
            strategy: strategy.key().to_string(),
            seed,
            final_score: 0,
            commands: 0,
            rejected_drops: 0,
            seconds_played: 0,
            resumed_at_scenario: None,
        };
        let resume_at = self.catalog.len() / 2;

        dispatch(&mut engine, Command::StartTimer, &mut summary)?;
        loop {
            let index = engine.state().current_scenario_index;
            if summary.resumed_at_scenario.is_none() && index == resume_at && index > 0 {
                engine = self.resume(engine, store, &clock)?;
                summary.resumed_at_scenario = Some(index);
            }

            self.play_scenario(&mut engine, &clock, policy.as_mut(), &mut summary)?;

            if engine.state().game_complete {
                break;
            }
            let events = dispatch(&mut engine, Command::AdvanceScenario, &mut summary)?;
            if !matches!(events.as_slice(), [GameEvent::Advanced { .. }]) {
                return Err(format!("advance after scenario {index} was refused: {events:?}"));
            }
        }

        let state = engine.state();
        check_final(state, &self.catalog, strategy)?;
        summary.final_score = state.score;
        summary.seconds_played = state.timer.seconds();
        log::debug!(
            "{} seed {seed}: score {} in {} commands",
            strategy.key(),
            summary.final_score,
            summary.commands
        );
        Ok(summary)
    }

    fn engine<L>(&self, store: L, clock: &ManualClock) -> GameEngine<L, ManualClock>
    where
        L: LocalStore + Debug,
    {
        GameEngine::new(
            GameSession::new(self.catalog.clone(), clock.clone()),
            Persistence::new(store, self.catalog.clone()),
        )
    }

    fn play_scenario<L>(
        &self,
        engine: &mut GameEngine<L, ManualClock>,
        clock: &ManualClock,
        policy: &mut dyn PlayerPolicy,
        summary: &mut RunSummary,
    ) -> Result<(), String>
    where
        L: LocalStore + Debug,
    {
        let index = engine.state().current_scenario_index;
        dispatch(engine, Command::HideScenario, summary)?;
        let budget = engine.session().current_scenario().pieces.len() * 4 + 64;

        for _ in 0..budget {
            if engine.session().is_complete() {
                return Ok(());
            }
            for _ in 0..TICKS_PER_MOVE {
                clock.advance(1_000);
                dispatch(engine, Command::Tick, summary)?;
            }
            let Some(next) = policy.next_move(engine.session().current_scenario(), engine.state())
            else {
                break;
            };
            let events = dispatch(
                engine,
                Command::drop_piece(next.container, next.piece_id),
                summary,
            )?;
            if matches!(
                events.first(),
                Some(GameEvent::Dropped {
                    outcome: DropOutcome::Rejected { .. },
                    ..
                })
            ) {
                summary.rejected_drops += 1;
            }
        }

        if engine.session().is_complete() {
            Ok(())
        } else {
            Err(format!(
                "{} stalled in scenario {index} with {} of {} pieces placed",
                policy.name(),
                engine.state().placed_pieces.len(),
                engine.session().current_scenario().correct_count()
            ))
        }
    }

    /// Hand the saved game to a brand-new engine and check nothing was lost.
    fn resume<L>(
        &self,
        engine: GameEngine<L, ManualClock>,
        store: &L,
        clock: &ManualClock,
    ) -> Result<GameEngine<L, ManualClock>, String>
    where
        L: LocalStore + Clone + Debug,
    {
        let live = engine.session().summary();
        let live_stats = engine.state().stats();
        let live_results = engine.state().scenario_results.clone();

        let mut resumed = self.engine(store.clone(), clock);
        let saved = resumed
            .saved_progress()
            .ok_or_else(|| "no saved progress to resume from".to_string())?;
        if saved != live {
            return Err(format!("resume summary {saved:?} differs from live {live:?}"));
        }
        if !resumed.continue_saved() {
            return Err("saved progress could not be restored".to_string());
        }
        if resumed.state().stats() != live_stats {
            return Err(format!(
                "restored stats {:?} differ from live {live_stats:?}",
                resumed.state().stats()
            ));
        }
        if resumed.state().scenario_results != live_results {
            return Err("restored scenario results differ from live".to_string());
        }
        resumed.dispatch(Command::StartTimer);
        Ok(resumed)
    }
}

fn dispatch<L>(
    engine: &mut GameEngine<L, ManualClock>,
    command: Command,
    summary: &mut RunSummary,
) -> Result<gmp_game::Events, String>
where
    L: LocalStore + Debug,
{
    let events = engine.dispatch(command);
    summary.commands += 1;
    check_invariants(engine.state(), engine.session().catalog())?;
    if let Some(err) = engine.last_persistence_error() {
        return Err(format!("persistence failed: {err}"));
    }
    Ok(events)
}

/// State rules that must hold after every command.
pub fn check_invariants(state: &GameState, catalog: &ScenarioCatalog) -> Result<(), String> {
    let scenario = catalog
        .get(state.current_scenario_index)
        .ok_or_else(|| format!("scenario index {} out of range", state.current_scenario_index))?;
    if state.health > 100 {
        return Err(format!("health {} above maximum", state.health));
    }
    if state.placed_pieces.len() > scenario.correct_count() {
        return Err(format!(
            "{} pieces placed but only {} are correct",
            state.placed_pieces.len(),
            scenario.correct_count()
        ));
    }

    let mut seen = HashSet::new();
    for container in gmp_game::ContainerKind::ALL {
        for piece in state.placed_pieces.list(container) {
            if !seen.insert(piece.id.as_str()) {
                return Err(format!("piece {} placed twice", piece.id));
            }
            if !piece.is_correct {
                return Err(format!("incorrect piece {} was placed", piece.id));
            }
            if !container.accepts(piece.category) {
                return Err(format!("piece {} placed in {container}", piece.id));
            }
            if scenario.piece(&piece.id).is_none() {
                return Err(format!("piece {} is not in scenario {}", piece.id, scenario.title));
            }
        }
    }

    if state.scenario_complete != state.all_correct_placed(scenario) {
        return Err(format!(
            "completion flag {} disagrees with placements",
            state.scenario_complete
        ));
    }
    let expected_results = state.current_scenario_index + usize::from(state.game_complete);
    if state.scenario_results.len() != expected_results {
        return Err(format!(
            "{} results banked at scenario {}",
            state.scenario_results.len(),
            state.current_scenario_index
        ));
    }
    let banked: u64 = state.scenario_results.iter().map(|r| r.score).sum();
    if banked > state.score {
        return Err(format!("banked {banked} exceeds score {}", state.score));
    }
    Ok(())
}

fn check_final(
    state: &GameState,
    catalog: &ScenarioCatalog,
    strategy: GameplayStrategy,
) -> Result<(), String> {
    if !state.game_complete || !state.ui.show_final_stats {
        return Err("campaign ended without the final stats screen".to_string());
    }
    if state.scenario_results.len() != catalog.len() {
        return Err(format!(
            "{} results for {} scenarios",
            state.scenario_results.len(),
            catalog.len()
        ));
    }
    let banked: u64 = state.scenario_results.iter().map(|r| r.score).sum();
    if banked != state.score {
        return Err(format!("results sum to {banked}, final score {}", state.score));
    }
    if strategy.is_flawless() && state.scenario_results.iter().any(|r| r.health < 100) {
        return Err("flawless strategy lost health".to_string());
    }
    Ok(())
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}
