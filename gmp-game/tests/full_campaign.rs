use gmp_game::{
    AdvanceRejection, Command, ContainerKind, GameEvent, GameSession, ManualClock,
    PersistAction, ScenarioCatalog, persist_action,
};

const TICKS_PER_SCENARIO: u64 = 10;

fn correct_drops(session: &GameSession<ManualClock>) -> Vec<Command> {
    session
        .current_scenario()
        .correct_pieces()
        .map(|piece| Command::drop_piece(ContainerKind::for_category(piece.category), &piece.id))
        .collect()
}

fn play_scenario(session: &mut GameSession<ManualClock>, clock: &ManualClock) -> Vec<GameEvent> {
    session.apply(Command::HideScenario);
    for _ in 0..TICKS_PER_SCENARIO {
        clock.advance(1_000);
        session.apply(Command::Tick);
    }
    let mut events = Vec::new();
    for command in correct_drops(session) {
        events.extend(session.apply(command));
    }
    events
}

#[test]
fn perfect_campaign_over_builtin_catalog() {
    let catalog = ScenarioCatalog::builtin();
    let clock = ManualClock::new(0);
    let mut session = GameSession::new(catalog.clone(), clock.clone());
    session.apply(Command::StartTimer);

    let mut expected_score = 0;
    for index in 0..catalog.len() {
        assert_eq!(session.state().current_scenario_index, index);
        let correct = session.current_scenario().correct_count() as u64;
        let placements: u64 = (0..correct).map(|combo| 100 + combo * 10).sum();
        expected_score += placements + 1_000 + correct * 100;

        let events = play_scenario(&mut session, &clock);
        assert!(session.is_complete());
        assert_eq!(session.state().score, expected_score);
        assert!(matches!(
            events.iter().find(|event| matches!(event, GameEvent::ScenarioCompleted(_))),
            Some(GameEvent::ScenarioCompleted(completion)) if completion.scenario_index == index
        ));
        assert_eq!(persist_action(&events), PersistAction::Save);

        // Victory overlay pauses the clock.
        clock.advance(1_000);
        session.apply(Command::Tick);
        assert_eq!(
            session.state().timer.seconds(),
            TICKS_PER_SCENARIO * (index as u64 + 1)
        );

        if index < catalog.last_index() {
            let advanced = session.apply(Command::AdvanceScenario);
            assert!(matches!(
                advanced.as_slice(),
                [GameEvent::Advanced { scenario_index, result }]
                    if *scenario_index == index + 1 && result.time_spent == TICKS_PER_SCENARIO
            ));
            assert_eq!(session.state().health, 100);
            assert_eq!(session.state().combo, 0);
            assert!(session.state().placed_pieces.is_empty());
        } else {
            assert!(events.iter().any(|event| matches!(
                event,
                GameEvent::GameCompleted { final_score } if *final_score == expected_score
            )));
        }
    }

    let state = session.state();
    assert!(state.game_complete);
    assert!(state.ui.show_final_stats);
    assert!(!state.timer.is_running());
    assert_eq!(state.scenario_results.len(), catalog.len());
    let banked: u64 = state.scenario_results.iter().map(|r| r.score).sum();
    assert_eq!(banked, state.score);
    assert!(state.scenario_results.iter().all(|r| r.health == 100));

    let view = session.view();
    assert_eq!(view.progress_percentage, 100);
    assert_eq!(view.scenario_number, catalog.len());
    assert!(view.available_pieces.iter().all(|piece| !piece.is_correct));

    let rejected = session.apply(Command::AdvanceScenario);
    assert_eq!(
        rejected.as_slice(),
        [GameEvent::AdvanceRejected {
            reason: AdvanceRejection::GameOver
        }]
    );
    assert!(session.apply(Command::StartTimer).is_empty());
}

#[test]
fn careless_campaign_still_finishes() {
    let catalog = ScenarioCatalog::builtin();
    let clock = ManualClock::new(0);
    let mut session = GameSession::new(catalog.clone(), clock);

    for index in 0..catalog.len() {
        let pieces = session.current_scenario().pieces.clone();
        for piece in &pieces {
            // Every piece into both containers: wrong ones cost health, the
            // right ones land once.
            for container in ContainerKind::ALL {
                session.apply(Command::drop_piece(container, &piece.id));
            }
            let health = session.state().health;
            assert!(health <= 100);
        }
        assert!(session.is_complete(), "scenario {index} should complete");
        if index < catalog.last_index() {
            session.apply(Command::AdvanceScenario);
        }
    }
    assert!(session.state().game_complete);
    assert_eq!(session.state().scenario_results.len(), catalog.len());
}
