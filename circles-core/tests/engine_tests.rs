//! Integration tests for the rules engine
//!
//! Exercises the public API end to end: round setup, wire requests, turn
//! responses, persistence and unattended play.

use std::sync::Arc;

use circles_core::{
    play_game, ActionError, ActionKind, ActionRequest, Catalog, Game, GameConfig, Hex, Phase,
    Placeable, SaveState, Slot, SlotKind, StructureKind, TurnRequest, TurnState,
};

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::default())
}

/// Hand-built board: no obstacles, hero at `hero`, exit at the usual site
fn arena(hero: Hex) -> Game {
    let mut game = Game::new(GameConfig::default().with_seed(7), catalog()).unwrap();
    game.place_hero(hero).unwrap();
    game.add_structure(StructureKind::Exit, game.structure_site(StructureKind::Exit))
        .unwrap();
    game
}

fn turn(action: &str, target: Option<&str>) -> ActionRequest {
    TurnRequest {
        action: action.to_string(),
        target_hex: target.map(str::to_string),
        ..Default::default()
    }
    .to_action_request()
    .unwrap()
}

// ============================================================================
// TESTS
// ============================================================================

#[test]
fn test_shield_bash_example_through_turn_request() {
    let mut game = arena(Hex::new(0, 3));
    let hound = game.add_unit(2, Hex::new(-1, 4)).unwrap();

    let response = game.make_turn(&turn("shield_bash", Some("-1;3")));
    assert_eq!(response.state, TurnState::Success);

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(
        json["hero_actions"]["shield_bash"],
        serde_json::json!([
            {"target_hex": "-1;3", "main_target": true},
            {"target_hex": "-1;4", "damage": 5, "pushed_to": "-2;5"},
        ])
    );
    // stunned, so no unit entry this turn
    assert!(json["units_actions"].get(hound.to_string()).is_none());
}

#[test]
fn test_unknown_action_is_rejected_before_the_engine() {
    let request = TurnRequest {
        action: "teleport".to_string(),
        ..Default::default()
    };
    assert_eq!(
        request.to_action_request().unwrap_err(),
        ActionError::NoSuchAbility("teleport".to_string())
    );
}

#[test]
fn test_failed_turn_reports_error() {
    let mut game = arena(Hex::new(0, 3));
    let before = game.save();

    let response = game.make_turn(&turn("attack", Some("0;0")));
    assert_eq!(response.state, TurnState::Failed);
    assert!(response.error.unwrap().contains("range is 1"));
    assert_eq!(game.save(), before);
}

#[test]
fn test_walk_out_of_the_first_round() {
    let mut game = arena(Hex::new(0, -3));
    let response = game.make_turn(&turn("exit", None));

    assert_eq!(response.state, TurnState::Success);
    assert_eq!(response.round, 2);
    assert_eq!(game.phase(), Phase::Active);
    assert_eq!(game.hero().position(), Some(Hex::new(0, 3)));
}

#[test]
fn test_round_setup_invariants() {
    for seed in 0..20 {
        let mut game = Game::start(GameConfig::default().with_seed(seed), catalog()).unwrap();
        for _ in 0..5 {
            let round = game.round();
            let board = game.board();
            let hero = game.hero().position().unwrap();

            assert_eq!(hero, Hex::new(0, 3));
            assert_eq!(board.slot(hero).unwrap(), Slot::Hero);
            assert_eq!(game.units().map(|u| u.level).sum::<u32>(), round);
            for unit in game.units() {
                let hex = unit.position().unwrap();
                assert_eq!(board.slot(hex).unwrap(), Slot::Unit(unit.id));
                let safe = (3 - round as i32 / 8).max(1);
                assert!(hex.distance_to(hero) > safe);
            }
            for structure in game.structures() {
                let hex = structure.position().unwrap();
                assert_eq!(board.slot(hex).unwrap().kind(), SlotKind::Structure);
            }

            game.exit_round().unwrap();
        }
    }
}

#[test]
fn test_save_document_json_roundtrip() {
    let mut game = Game::start(GameConfig::default().with_seed(12), catalog()).unwrap();
    play_game(&mut game, 10);

    let text = serde_json::to_string(&game.save()).unwrap();
    let save: SaveState = serde_json::from_str(&text).unwrap();
    let loaded = Game::load(GameConfig::default(), catalog(), &save).unwrap();

    assert_eq!(loaded.save(), game.save());
    assert_eq!(loaded.board_state(), game.board_state());
}

#[test]
fn test_save_without_spells_uses_catalog_defaults() {
    let save: SaveState = serde_json::from_value(serde_json::json!({
        "round": 2,
        "hero": {"health": 30, "position": "0;3"},
        "hexes": [{"q": 1, "r": 1, "slot": "obstacle"}],
        "units": [{"level": 2, "health": 4, "position": "0;-2"}],
        "structures": [{"code_name": "exit", "position": "0;-4"}],
    }))
    .unwrap();

    let game = Game::load(GameConfig::default(), catalog(), &save).unwrap();
    assert_eq!(game.round(), 2);
    assert_eq!(game.hero().stats.health, 30);
    assert!(game.hero().knows_spell("shield_bash"));
    assert_eq!(game.board().slot(Hex::new(1, 1)).unwrap(), Slot::Obstacle);
    assert_eq!(game.units().next().unwrap().stats.health, 4);
    assert_eq!(game.board().obstacles().len(), 1);
}

#[test]
fn test_unattended_games_end_or_hit_turn_cap() {
    for seed in 0..8 {
        let mut game = Game::start(GameConfig::default().with_seed(seed), catalog()).unwrap();
        let summary = play_game(&mut game, 200);
        assert!(summary.game_over || summary.turns <= 200);
        assert_eq!(summary.game_over, game.is_over());
        if summary.game_over {
            assert_eq!(summary.hero_health, 0);
        }
    }
}

#[test]
fn test_dead_hero_rejects_everything() {
    let mut game = arena(Hex::new(0, 3));
    let lord = game.add_unit(8, Hex::new(0, 2)).unwrap();

    let mut turns = 0;
    while !game.is_over() && turns < 20 {
        game.make_turn(&ActionRequest::hero(ActionKind::Idle));
        turns += 1;
    }
    assert!(game.is_over());
    assert!(game.unit(lord).is_some());

    let err = game
        .resolve(&ActionRequest::hero(ActionKind::Move).with_target(Hex::new(1, 2)))
        .unwrap_err();
    assert_eq!(err, ActionError::GameOver);
    assert_eq!(
        game.make_turn(&ActionRequest::hero(ActionKind::Idle)).state,
        TurnState::GameOver
    );
}
