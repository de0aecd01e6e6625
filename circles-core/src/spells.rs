//! Spell effects: path of fire, shield bash, blink
//!
//! Spells are cast by any combatant that knows them. Parameters come from the
//! catalog row named after the action's code name.

use rustc_hash::FxHashSet;

use crate::actions::{check_range, require_empty, ActionKind, ActionOutcome, Resolved, Step};
use crate::board::{Hex, SlotFilter};
use crate::entities::Slot;
use crate::error::ActionError;
use crate::game::Game;

fn effect(game: &Game, kind: ActionKind, key: &str) -> Result<i32, ActionError> {
    Ok(game.catalog.spell(kind.code_name())?.effect(key)?)
}

fn in_range_not_self(game: &Game, r: &Resolved) -> Result<Hex, ActionError> {
    let target = check_range(r, game.reach(r.action, r.source)?)?;
    if target == r.origin {
        return Err(ActionError::TargetOccupied(target));
    }
    Ok(target)
}

/// Unit step from the caster toward an in-range target on one of the six axes
fn line_to(game: &Game, r: &Resolved) -> Result<(i32, i32), ActionError> {
    let target = in_range_not_self(game, r)?;
    r.origin
        .direction_to(target)
        .ok_or(ActionError::TargetNotInLine(target))
}

// ============================================================================
// PATH OF FIRE
// ============================================================================

pub(crate) fn path_of_fire_precondition(game: &Game, r: &Resolved) -> Result<(), ActionError> {
    effect(game, r.action, "damage")?;
    effect(game, r.action, "path_length")?;
    line_to(game, r).map(|_| ())
}

/// Burn along the line from the caster through the target. The walk stops
/// before the first obstacle or the board edge.
pub(crate) fn path_of_fire(game: &mut Game, r: &Resolved) -> Result<ActionOutcome, ActionError> {
    let damage = effect(game, r.action, "damage")?;
    let path_length = effect(game, r.action, "path_length")?;
    let (dq, dr) = line_to(game, r)?;

    let mut steps = Vec::new();
    for i in 1..=path_length {
        let hex = r.origin.offset(dq * i, dr * i);
        let slot = match game.board.slot(hex) {
            Ok(Slot::Obstacle) | Err(_) => break,
            Ok(slot) => slot,
        };

        let mut step = Step::at(hex);
        if game.actor_at(slot).is_some_and(|actor| actor != r.source) {
            step.damage = game.deal_damage(hex, damage);
        }
        steps.push(step);
    }

    Ok(ActionOutcome::with_steps(r.action, steps))
}

// ============================================================================
// SHIELD BASH
// ============================================================================

pub(crate) fn shield_bash_precondition(game: &Game, r: &Resolved) -> Result<(), ActionError> {
    effect(game, r.action, "damage")?;
    line_to(game, r).map(|_| ())
}

/// Knock back every enemy flanking both caster and target.
///
/// An enemy with a free hex behind it is pushed there and takes `damage`;
/// one pinned against an obstacle, another occupant or the edge takes double.
/// Surviving units are stunned.
pub(crate) fn shield_bash(game: &mut Game, r: &Resolved) -> Result<ActionOutcome, ActionError> {
    let damage = effect(game, r.action, "damage")?;
    let target = r.target()?;
    let enemy = game.enemy_of(r.source);

    let near_source: FxHashSet<_> = game
        .board
        .hexes_in_range(r.origin, 1, SlotFilter::Any)
        .into_iter()
        .collect();
    let flank = game
        .board
        .hexes_in_range(target, 1, SlotFilter::Any)
        .into_iter()
        .filter(|hex| *hex != r.origin && *hex != target && near_source.contains(hex))
        .collect::<Vec<_>>();

    let mut outcome = ActionOutcome::new(r.action);
    for hex in std::iter::once(target).chain(flank) {
        let main_target = hex == target;
        let slot = game.board.slot(hex)?;
        let victim = match game.actor_at(slot) {
            Some(actor) if slot.kind() == enemy => actor,
            _ => {
                if main_target {
                    let mut step = Step::at(hex);
                    step.main_target = true;
                    outcome.steps.push(step);
                }
                continue;
            }
        };

        let behind = r
            .origin
            .direction_to(hex)
            .map(|(dq, dr)| hex.offset(dq, dr))
            .filter(|behind| game.board.is_free(*behind));
        let mut step = Step::at(hex);
        step.main_target = main_target;
        if let Some(behind) = behind {
            game.place_actor(victim, behind)?;
            step.pushed_to = Some(behind);
            step.damage = game.deal_damage(behind, damage);
        } else {
            step.damage = game.deal_damage(hex, damage * 2);
        }

        if let Slot::Unit(id) = slot {
            if game.units.contains_key(&id) {
                outcome.stunned.push(id);
            }
        }
        outcome.steps.push(step);
    }

    Ok(outcome)
}

// ============================================================================
// BLINK
// ============================================================================

pub(crate) fn blink_precondition(game: &Game, r: &Resolved) -> Result<(), ActionError> {
    let target = check_range(r, game.reach(r.action, r.source)?)?;
    require_empty(game, target)
}

pub(crate) fn blink(game: &mut Game, r: &Resolved) -> Result<ActionOutcome, ActionError> {
    let target = r.target()?;
    game.place_actor(r.source, target)?;
    Ok(ActionOutcome::with_steps(r.action, vec![Step::at(target)]))
}
