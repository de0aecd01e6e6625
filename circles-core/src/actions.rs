//! Action resolution
//!
//! Every action kind maps to a handler pair: a precondition that validates a
//! request against the current state without touching it, and an executor
//! that applies the effect and returns the step log. Capability is checked
//! once, centrally, before either runs. `available_targets` runs the same
//! precondition over the candidate hexes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::board::{Hex, SlotFilter};
use crate::entities::{Combatant, Placeable, Slot, SlotKind, StructureKind, UnitId};
use crate::error::ActionError;
use crate::game::{Game, Phase};
use crate::state::ShopOffer;
use crate::{spells, structures};

// ============================================================================
// ACTION KINDS
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    #[default]
    Idle,
    Move,
    Attack,
    RangeAttack,
    PathOfFire,
    ShieldBash,
    Blink,
    Exit,
    EnterSanctuary,
    ExitSanctuary,
}

/// Who may perform an action kind
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    /// Any combatant
    Any,
    /// Hero only
    Hero,
    /// Hero knowing the spell, or unit with it unlocked
    Caster,
}

impl ActionKind {
    pub const ALL: [ActionKind; 10] = [
        ActionKind::Idle,
        ActionKind::Move,
        ActionKind::Attack,
        ActionKind::RangeAttack,
        ActionKind::PathOfFire,
        ActionKind::ShieldBash,
        ActionKind::Blink,
        ActionKind::Exit,
        ActionKind::EnterSanctuary,
        ActionKind::ExitSanctuary,
    ];

    pub fn code_name(self) -> &'static str {
        match self {
            ActionKind::Idle => "idle",
            ActionKind::Move => "move",
            ActionKind::Attack => "attack",
            ActionKind::RangeAttack => "range_attack",
            ActionKind::PathOfFire => "path_of_fire",
            ActionKind::ShieldBash => "shield_bash",
            ActionKind::Blink => "blink",
            ActionKind::Exit => "exit",
            ActionKind::EnterSanctuary => "enter_sanctuary",
            ActionKind::ExitSanctuary => "exit_sanctuary",
        }
    }

    pub fn from_code_name(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code_name() == code)
    }

    pub fn capability(self) -> Capability {
        match self {
            ActionKind::Idle | ActionKind::Move | ActionKind::Attack => Capability::Any,
            ActionKind::RangeAttack
            | ActionKind::Exit
            | ActionKind::EnterSanctuary
            | ActionKind::ExitSanctuary => Capability::Hero,
            ActionKind::PathOfFire | ActionKind::ShieldBash | ActionKind::Blink => {
                Capability::Caster
            }
        }
    }

    pub fn is_spell(self) -> bool {
        self.capability() == Capability::Caster
    }

    /// Units skip their turn after these hero actions
    pub fn ends_turn(self) -> bool {
        matches!(
            self,
            ActionKind::Exit | ActionKind::EnterSanctuary | ActionKind::ExitSanctuary
        )
    }

    pub fn needs_target(self) -> bool {
        !matches!(self, ActionKind::Idle | ActionKind::ExitSanctuary)
    }

    /// Candidate filter for target listing, given the actor's enemy kind
    pub fn target_filter(self, enemy: SlotKind) -> SlotFilter<'static> {
        const EMPTY: &[SlotKind] = &[SlotKind::Empty];
        const STRUCTURE: &[SlotKind] = &[SlotKind::Structure];
        const COMBAT: &[SlotKind] = &[SlotKind::Empty, SlotKind::Hero, SlotKind::Unit];

        let versus: &'static [SlotKind] = match enemy {
            SlotKind::Hero => &[SlotKind::Empty, SlotKind::Hero],
            _ => &[SlotKind::Empty, SlotKind::Unit],
        };
        let bash: &'static [SlotKind] = match enemy {
            SlotKind::Hero => &[SlotKind::Empty, SlotKind::Obstacle, SlotKind::Hero],
            _ => &[SlotKind::Empty, SlotKind::Obstacle, SlotKind::Unit],
        };

        match self {
            ActionKind::Idle | ActionKind::ExitSanctuary => SlotFilter::Allowed(&[]),
            ActionKind::Move | ActionKind::Blink => SlotFilter::Allowed(EMPTY),
            ActionKind::Attack | ActionKind::RangeAttack => SlotFilter::Allowed(versus),
            ActionKind::PathOfFire => SlotFilter::Allowed(COMBAT),
            ActionKind::ShieldBash => SlotFilter::Allowed(bash),
            ActionKind::Exit | ActionKind::EnterSanctuary => SlotFilter::Allowed(STRUCTURE),
        }
    }

    pub(crate) fn handler(self) -> ActionHandler {
        match self {
            ActionKind::Idle => ActionHandler {
                precondition: |_, _| Ok(()),
                execute: |_, r| Ok(ActionOutcome::new(r.action)),
            },
            ActionKind::Move => ActionHandler {
                precondition: move_precondition,
                execute: execute_move,
            },
            ActionKind::Attack | ActionKind::RangeAttack => ActionHandler {
                precondition: attack_precondition,
                execute: execute_attack,
            },
            ActionKind::PathOfFire => ActionHandler {
                precondition: spells::path_of_fire_precondition,
                execute: spells::path_of_fire,
            },
            ActionKind::ShieldBash => ActionHandler {
                precondition: spells::shield_bash_precondition,
                execute: spells::shield_bash,
            },
            ActionKind::Blink => ActionHandler {
                precondition: spells::blink_precondition,
                execute: spells::blink,
            },
            ActionKind::Exit => ActionHandler {
                precondition: structures::exit_precondition,
                execute: structures::exit,
            },
            ActionKind::EnterSanctuary => ActionHandler {
                precondition: structures::enter_sanctuary_precondition,
                execute: structures::enter_sanctuary,
            },
            ActionKind::ExitSanctuary => ActionHandler {
                precondition: structures::exit_sanctuary_precondition,
                execute: structures::exit_sanctuary,
            },
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code_name())
    }
}

impl FromStr for ActionKind {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code_name(s).ok_or_else(|| ActionError::NoSuchAbility(s.to_string()))
    }
}

// ============================================================================
// REQUESTS AND OUTCOMES
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Hero,
    Unit(UnitId),
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Hero => write!(f, "hero"),
            Actor::Unit(id) => write!(f, "unit {}", id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionRequest {
    pub action: ActionKind,
    pub source: Actor,
    pub target_hex: Option<Hex>,
    pub target_unit: Option<UnitId>,
    /// Spell bought on `exit_sanctuary`
    pub purchase: Option<String>,
}

impl ActionRequest {
    pub fn new(action: ActionKind, source: Actor) -> Self {
        Self {
            action,
            source,
            target_hex: None,
            target_unit: None,
            purchase: None,
        }
    }

    pub fn hero(action: ActionKind) -> Self {
        Self::new(action, Actor::Hero)
    }

    pub fn with_target(mut self, hex: Hex) -> Self {
        self.target_hex = Some(hex);
        self
    }

    pub fn with_unit(mut self, id: UnitId) -> Self {
        self.target_unit = Some(id);
        self
    }

    pub fn with_purchase(mut self, code: impl Into<String>) -> Self {
        self.purchase = Some(code.into());
        self
    }
}

/// One affected hex in an action log
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub target_hex: Hex,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushed_to: Option<Hex>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub main_target: bool,
}

impl Step {
    pub fn at(target_hex: Hex) -> Self {
        Self {
            target_hex,
            damage: None,
            pushed_to: None,
            main_target: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionOutcome {
    pub action: ActionKind,
    pub steps: Vec<Step>,
    /// Units that skip their next turn
    pub stunned: Vec<UnitId>,
    /// Round exit requested; the controller starts the next round
    pub ends_round: bool,
    /// Assortment offered when the sanctuary opens
    pub shop: Option<Vec<ShopOffer>>,
}

impl ActionOutcome {
    pub fn new(action: ActionKind) -> Self {
        Self {
            action,
            ..Default::default()
        }
    }

    pub fn with_steps(action: ActionKind, steps: Vec<Step>) -> Self {
        Self {
            action,
            steps,
            ..Default::default()
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// A request that passed validation, with the source position and target resolved
#[derive(Clone, Debug)]
pub(crate) struct Resolved {
    pub action: ActionKind,
    pub source: Actor,
    pub origin: Hex,
    pub target: Option<Hex>,
    pub purchase: Option<String>,
}

impl Resolved {
    pub fn target(&self) -> Result<Hex, ActionError> {
        self.target.ok_or(ActionError::MissingTarget(self.action))
    }
}

type Precondition = fn(&Game, &Resolved) -> Result<(), ActionError>;
type Execute = fn(&mut Game, &Resolved) -> Result<ActionOutcome, ActionError>;

pub(crate) struct ActionHandler {
    pub precondition: Precondition,
    pub execute: Execute,
}

/// Target within `reach` of the source
pub(crate) fn check_range(r: &Resolved, reach: i32) -> Result<Hex, ActionError> {
    let target = r.target()?;
    let distance = r.origin.distance_to(target);
    if distance > reach {
        return Err(ActionError::TargetTooFar {
            target,
            distance,
            range: reach,
        });
    }
    Ok(target)
}

pub(crate) fn require_empty(game: &Game, hex: Hex) -> Result<(), ActionError> {
    match game.board.slot(hex)? {
        Slot::Empty => Ok(()),
        _ => Err(ActionError::TargetOccupied(hex)),
    }
}

fn move_precondition(game: &Game, r: &Resolved) -> Result<(), ActionError> {
    let target = check_range(r, game.reach(r.action, r.source)?)?;
    require_empty(game, target)
}

fn execute_move(game: &mut Game, r: &Resolved) -> Result<ActionOutcome, ActionError> {
    let target = r.target()?;
    game.place_actor(r.source, target)?;
    Ok(ActionOutcome::with_steps(r.action, vec![Step::at(target)]))
}

fn attack_precondition(game: &Game, r: &Resolved) -> Result<(), ActionError> {
    let target = check_range(r, game.reach(r.action, r.source)?)?;
    if target == r.origin {
        return Err(ActionError::TargetOccupied(target));
    }
    Ok(())
}

fn execute_attack(game: &mut Game, r: &Resolved) -> Result<ActionOutcome, ActionError> {
    let target = r.target()?;
    let damage = game.combatant(r.source)?.stats().damage;
    let mut step = Step::at(target);
    step.damage = game.deal_damage(target, damage);
    Ok(ActionOutcome::with_steps(r.action, vec![step]))
}

// ============================================================================
// ENGINE
// ============================================================================

impl Game {
    /// Validate then execute a single action. On error nothing has changed.
    pub fn resolve(&mut self, request: &ActionRequest) -> Result<ActionOutcome, ActionError> {
        let resolved = self.validate(request)?;
        let outcome = (request.action.handler().execute)(self, &resolved)?;
        debug!(
            "{} {} at {:?}: {} steps",
            request.source,
            request.action,
            resolved.target.map(|hex| hex.to_string()),
            outcome.steps.len()
        );
        Ok(outcome)
    }

    /// Run every check `resolve` runs, without mutating anything
    pub(crate) fn validate(&self, request: &ActionRequest) -> Result<Resolved, ActionError> {
        if self.phase == Phase::GameOver {
            return Err(ActionError::GameOver);
        }
        self.check_capability(request.action, request.source)?;

        let resolved = Resolved {
            action: request.action,
            source: request.source,
            origin: self.origin(request.source)?,
            target: self.request_target(request)?,
            purchase: request.purchase.clone(),
        };
        (request.action.handler().precondition)(self, &resolved)?;
        Ok(resolved)
    }

    /// Hexes `actor` could target with `kind` right now
    pub fn available_targets(&self, actor: Actor, kind: ActionKind) -> Result<Vec<Hex>, ActionError> {
        if self.phase == Phase::GameOver {
            return Err(ActionError::GameOver);
        }
        self.check_capability(kind, actor)?;
        if !kind.needs_target() {
            return Ok(Vec::new());
        }

        let origin = self.origin(actor)?;
        let reach = self.reach(kind, actor)?;
        let precondition = kind.handler().precondition;

        let candidates = self
            .board
            .hexes_in_range(origin, reach, kind.target_filter(self.enemy_of(actor)));
        Ok(candidates
            .into_iter()
            .filter(|&target| {
                let candidate = Resolved {
                    action: kind,
                    source: actor,
                    origin,
                    target: Some(target),
                    purchase: None,
                };
                precondition(self, &candidate).is_ok()
            })
            .collect())
    }

    /// Every action `actor` has a target for, in ability order
    pub fn available_actions(&self, actor: Actor) -> Vec<(ActionKind, Vec<Hex>)> {
        self.actions_of(actor)
            .into_iter()
            .filter_map(|kind| match self.available_targets(actor, kind) {
                Ok(targets) if !targets.is_empty() => Some((kind, targets)),
                _ => None,
            })
            .collect()
    }

    /// Ability list of an actor
    pub fn actions_of(&self, actor: Actor) -> Vec<ActionKind> {
        match actor {
            Actor::Hero => {
                let mut kinds = vec![ActionKind::Move, ActionKind::Attack, ActionKind::RangeAttack];
                kinds.extend(self.hero.spells().filter_map(ActionKind::from_code_name));
                kinds.extend([ActionKind::Exit, ActionKind::EnterSanctuary]);
                kinds
            }
            Actor::Unit(id) => self
                .units
                .get(&id)
                .map(|unit| unit.actions.clone())
                .unwrap_or_default(),
        }
    }

    fn check_capability(&self, kind: ActionKind, actor: Actor) -> Result<(), ActionError> {
        let denied = ActionError::ActionNotAllowed { action: kind, actor };

        if actor == Actor::Hero {
            let shop_open = self.shop.is_some();
            // an open shop locks the hero until it is left
            if shop_open != (kind == ActionKind::ExitSanctuary) {
                return Err(denied);
            }
        }

        let allowed = match (kind.capability(), actor) {
            (Capability::Any, Actor::Hero) | (Capability::Hero, Actor::Hero) => true,
            (Capability::Hero, Actor::Unit(_)) => false,
            (Capability::Caster, Actor::Hero) => self.hero.knows_spell(kind.code_name()),
            (Capability::Any, Actor::Unit(id)) | (Capability::Caster, Actor::Unit(id)) => self
                .units
                .get(&id)
                .ok_or(ActionError::NoSuchUnit(id))?
                .can(kind),
        };
        if allowed {
            Ok(())
        } else {
            Err(denied)
        }
    }

    fn origin(&self, actor: Actor) -> Result<Hex, ActionError> {
        self.combatant(actor)?
            .position()
            .ok_or(ActionError::NotPlaced(actor))
    }

    fn request_target(&self, request: &ActionRequest) -> Result<Option<Hex>, ActionError> {
        if let Some(hex) = request.target_hex {
            self.board.slot(hex)?;
            return Ok(Some(hex));
        }
        if let Some(id) = request.target_unit {
            let unit = self.units.get(&id).ok_or(ActionError::NoSuchUnit(id))?;
            return Ok(unit.position());
        }
        Ok(match request.action {
            ActionKind::Exit => self.structure_hex(StructureKind::Exit),
            ActionKind::EnterSanctuary => self.structure_hex(StructureKind::Sanctuary),
            _ => None,
        })
    }

    /// How far an action reaches from its source
    pub(crate) fn reach(&self, kind: ActionKind, actor: Actor) -> Result<i32, ActionError> {
        let stats = *self.combatant(actor)?.stats();
        Ok(match kind {
            ActionKind::Idle | ActionKind::ExitSanctuary => 0,
            ActionKind::Move => stats.move_range,
            ActionKind::Attack => stats.attack_range,
            ActionKind::RangeAttack => stats.attack_range + 1,
            ActionKind::PathOfFire | ActionKind::ShieldBash | ActionKind::Blink => {
                self.catalog.spell(kind.code_name())?.effect("radius")?
            }
            ActionKind::Exit => self.catalog.structure(StructureKind::Exit)?.effect("radius")?,
            ActionKind::EnterSanctuary => self
                .catalog
                .structure(StructureKind::Sanctuary)?
                .effect("radius")?,
        })
    }

    pub(crate) fn combatant(&self, actor: Actor) -> Result<&dyn Combatant, ActionError> {
        match actor {
            Actor::Hero => Ok(&self.hero),
            Actor::Unit(id) => self
                .units
                .get(&id)
                .map(|unit| unit as &dyn Combatant)
                .ok_or(ActionError::NoSuchUnit(id)),
        }
    }

    pub(crate) fn enemy_of(&self, actor: Actor) -> SlotKind {
        match actor {
            Actor::Hero => SlotKind::Unit,
            Actor::Unit(_) => SlotKind::Hero,
        }
    }

    /// Combatant standing on a slot
    pub(crate) fn actor_at(&self, slot: Slot) -> Option<Actor> {
        match slot {
            Slot::Hero => Some(Actor::Hero),
            Slot::Unit(id) if self.units.contains_key(&id) => Some(Actor::Unit(id)),
            _ => None,
        }
    }

    /// Move a combatant through the board
    pub(crate) fn place_actor(&mut self, actor: Actor, to: Hex) -> Result<(), ActionError> {
        match actor {
            Actor::Hero => self.board.place(&mut self.hero, to)?,
            Actor::Unit(id) => {
                let unit = self.units.get_mut(&id).ok_or(ActionError::NoSuchUnit(id))?;
                self.board.place(unit, to)?;
            }
        }
        Ok(())
    }

    /// Apply damage to whatever combatant stands on `hex`.
    ///
    /// Returns the damage dealt, or `None` when the hex holds no combatant.
    /// A unit at zero health is destroyed and its hex freed; the hero at zero
    /// ends the game but stays on the board.
    pub(crate) fn deal_damage(&mut self, hex: Hex, amount: i32) -> Option<i32> {
        match self.board.slot(hex).ok()? {
            Slot::Hero => {
                self.hero.receive_damage(amount);
                if self.hero.is_dead() && self.phase != Phase::GameOver {
                    self.phase = Phase::GameOver;
                    info!("{} has fallen in round {}", self.hero.name, self.round);
                }
                Some(amount)
            }
            Slot::Unit(id) => {
                let unit = self.units.get_mut(&id)?;
                unit.receive_damage(amount);
                if unit.is_dead() {
                    self.destroy_unit(id);
                }
                Some(amount)
            }
            _ => None,
        }
    }

    fn destroy_unit(&mut self, id: UnitId) {
        if let Some(unit) = self.units.remove(&id) {
            if let Some(hex) = unit.position() {
                let _ = self.board.vacate(hex);
            }
            self.kills += 1;
            debug!("{} (unit {}) destroyed", unit.name, id);
        }
    }
}
