//! Structure interactions: leaving the round and the sanctuary shop

use rand::seq::SliceRandom;
use tracing::info;

use crate::actions::{check_range, ActionOutcome, Resolved, Step};
use crate::entities::{Slot, StructureKind};
use crate::error::ActionError;
use crate::game::Game;
use crate::state::ShopOffer;

fn require_structure(game: &Game, r: &Resolved, kind: StructureKind) -> Result<(), ActionError> {
    let target = check_range(r, game.reach(r.action, r.source)?)?;
    match game.board.slot(target)? {
        Slot::Structure(found) if found == kind => Ok(()),
        _ => Err(ActionError::TargetNotOccupied(target)),
    }
}

pub(crate) fn exit_precondition(game: &Game, r: &Resolved) -> Result<(), ActionError> {
    require_structure(game, r, StructureKind::Exit)
}

/// Leave through the exit. The controller runs `exit_round` once the turn
/// response is built.
pub(crate) fn exit(_game: &mut Game, r: &Resolved) -> Result<ActionOutcome, ActionError> {
    let mut outcome = ActionOutcome::with_steps(r.action, vec![Step::at(r.target()?)]);
    outcome.ends_round = true;
    Ok(outcome)
}

pub(crate) fn enter_sanctuary_precondition(game: &Game, r: &Resolved) -> Result<(), ActionError> {
    require_structure(game, r, StructureKind::Sanctuary)
}

/// Open the shop with a random pick of spells the hero does not know yet
pub(crate) fn enter_sanctuary(game: &mut Game, r: &Resolved) -> Result<ActionOutcome, ActionError> {
    let offers = game.config.shop_offers;
    let candidates: Vec<ShopOffer> = game
        .catalog
        .spells
        .iter()
        .filter(|spell| !game.hero.knows_spell(&spell.code_name))
        .map(ShopOffer::from)
        .collect();
    let assortment: Vec<ShopOffer> = candidates
        .choose_multiple(&mut game.rng, offers)
        .cloned()
        .collect();

    info!(
        "Sanctuary opened with {} offers: {:?}",
        assortment.len(),
        assortment.iter().map(|o| o.code_name.as_str()).collect::<Vec<_>>()
    );
    game.shop = Some(assortment.iter().map(|o| o.code_name.clone()).collect());

    let mut outcome = ActionOutcome::with_steps(r.action, vec![Step::at(r.target()?)]);
    outcome.shop = Some(assortment);
    Ok(outcome)
}

pub(crate) fn exit_sanctuary_precondition(game: &Game, r: &Resolved) -> Result<(), ActionError> {
    let Some(shop) = &game.shop else {
        return Err(ActionError::ActionNotAllowed {
            action: r.action,
            actor: r.source,
        });
    };
    match &r.purchase {
        Some(code) if !shop.contains(code) => Err(ActionError::NoSuchAbility(code.clone())),
        _ => Ok(()),
    }
}

/// Close the shop, learning the purchase as a pending ability
pub(crate) fn exit_sanctuary(game: &mut Game, r: &Resolved) -> Result<ActionOutcome, ActionError> {
    if let Some(code) = &r.purchase {
        game.hero.learn(code);
        info!("{} learned {} (pending until the round is left)", game.hero.name, code);
    }
    game.shop = None;
    Ok(ActionOutcome::new(r.action))
}
