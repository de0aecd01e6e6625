//! Unit target selection and a scripted hero for headless play

use serde::{Deserialize, Serialize};

use crate::actions::{ActionKind, ActionRequest, Actor};
use crate::board::{Board, Hex};
use crate::entities::{SlotKind, StructureKind};
use crate::game::Game;

// ============================================================================
// UNIT AI
// ============================================================================

/// Pick an action and target from `available`.
///
/// Defaults to the first action's first target. Any candidate standing on
/// the enemy overrides that, and the last such candidate wins. `None` when
/// nothing is available, in which case the unit idles.
pub fn choose_action(
    board: &Board,
    enemy: SlotKind,
    available: &[(ActionKind, Vec<Hex>)],
) -> Option<(ActionKind, Hex)> {
    let mut choice = available
        .iter()
        .find_map(|(action, targets)| targets.first().map(|hex| (*action, *hex)))?;

    for (action, targets) in available {
        for &target in targets {
            if board.slot(target).map_or(false, |slot| slot.kind() == enemy) {
                choice = (*action, target);
            }
        }
    }

    Some(choice)
}

// ============================================================================
// SCRIPTED HERO
// ============================================================================

/// Next hero action for unattended play.
///
/// Shops when a sanctuary is in reach and something is left to learn, leaves
/// through the exit when possible, fights when a unit is in reach, and
/// otherwise walks toward the exit.
pub fn hero_request(game: &Game) -> ActionRequest {
    if let Some(shop) = game.shop() {
        let mut request = ActionRequest::hero(ActionKind::ExitSanctuary);
        if let Some(code) = shop.first() {
            request = request.with_purchase(code.clone());
        }
        return request;
    }

    let available = game.available_actions(Actor::Hero);
    let targets_of = |kind: ActionKind| {
        available
            .iter()
            .find(|(action, _)| *action == kind)
            .map(|(_, targets)| targets.as_slice())
    };

    let unknown_spells = game
        .catalog()
        .spells
        .iter()
        .any(|spell| !game.hero().knows_spell(&spell.code_name));
    if unknown_spells {
        if let Some(&hex) = targets_of(ActionKind::EnterSanctuary).and_then(|t| t.first()) {
            return ActionRequest::hero(ActionKind::EnterSanctuary).with_target(hex);
        }
    }

    if let Some(&hex) = targets_of(ActionKind::Exit).and_then(|t| t.first()) {
        return ActionRequest::hero(ActionKind::Exit).with_target(hex);
    }

    let offensive: Vec<(ActionKind, Vec<Hex>)> = available
        .iter()
        .filter(|(action, _)| {
            matches!(
                action,
                ActionKind::Attack
                    | ActionKind::RangeAttack
                    | ActionKind::PathOfFire
                    | ActionKind::ShieldBash
            )
        })
        .cloned()
        .collect();
    let hits_unit = offensive.iter().any(|(_, targets)| {
        targets
            .iter()
            .any(|hex| game.board().slot(*hex).map_or(false, |s| s.kind() == SlotKind::Unit))
    });
    if hits_unit {
        if let Some((action, hex)) = choose_action(game.board(), SlotKind::Unit, &offensive) {
            return ActionRequest::hero(action).with_target(hex);
        }
    }

    let exit = game.structure_hex(StructureKind::Exit);
    let step = exit.and_then(|exit| {
        targets_of(ActionKind::Move)?
            .iter()
            .copied()
            .min_by_key(|hex| hex.distance_to(exit))
    });
    match step {
        Some(hex) => ActionRequest::hero(ActionKind::Move).with_target(hex),
        None => ActionRequest::hero(ActionKind::Idle),
    }
}

/// Result of an unattended game
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    pub seed: u64,
    pub rounds: u32,
    pub turns: u32,
    pub kills: u32,
    pub hero_health: i32,
    pub game_over: bool,
}

/// Play `game` with the scripted hero until the hero falls or `max_turns`
/// turns have been submitted
pub fn play_game(game: &mut Game, max_turns: u32) -> GameSummary {
    let mut submitted = 0;
    while !game.is_over() && submitted < max_turns {
        let request = hero_request(game);
        game.make_turn(&request);
        submitted += 1;
    }

    GameSummary {
        seed: game.seed(),
        rounds: game.round(),
        turns: game.turns(),
        kills: game.kills(),
        hero_health: game.hero().stats.health,
        game_over: game.is_over(),
    }
}
