//! Round controller: setup, turn sequencing, win/loss, save/load

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::actions::{ActionKind, ActionRequest, Actor};
use crate::ai;
use crate::board::{Board, Hex, SlotFilter, DEFAULT_RADIUS, OBSTACLE_CHANCE};
use crate::catalog::Catalog;
use crate::entities::{Combatant, Hero, Placeable, SlotKind, Structure, StructureKind, Unit, UnitId};
use crate::error::{ActionError, GameError};
use crate::state::{
    ActionLog, BoardState, GameView, HeroSave, HeroView, HexSave, SaveState, StructureSave,
    StructureView, TurnResponse, TurnState, UnitSave, UnitView,
};

// ============================================================================
// CONFIG
// ============================================================================

/// Per-game settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub radius: i32,
    pub obstacle_chance: f64,
    /// Random seed (None = random)
    pub seed: Option<u64>,
    /// Spells offered per sanctuary visit
    pub shop_offers: usize,
    pub hero_name: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            obstacle_chance: OBSTACLE_CHANCE,
            seed: None,
            shop_offers: 3,
            hero_name: "Hero".to_string(),
        }
    }
}

impl GameConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_radius(mut self, radius: i32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_obstacle_chance(mut self, chance: f64) -> Self {
        self.obstacle_chance = chance;
        self
    }

    pub fn with_hero_name(mut self, name: impl Into<String>) -> Self {
        self.hero_name = name.into();
        self
    }

    pub fn validate(&self) -> Result<(), GameError> {
        if self.radius < 3 {
            return Err(GameError::InvalidConfig(format!(
                "radius must be at least 3, got {}",
                self.radius
            )));
        }
        if !(0.0..=1.0).contains(&self.obstacle_chance) {
            return Err(GameError::InvalidConfig(format!(
                "obstacle_chance must be within [0, 1], got {}",
                self.obstacle_chance
            )));
        }
        Ok(())
    }
}

// ============================================================================
// UNIT BUDGET
// ============================================================================

/// Highest unit level spawned in a round: the largest power of two not
/// above `round / 2`, at least 1
pub fn max_spawn_level(round: u32) -> u32 {
    let half = (round / 2).max(1);
    1 << half.ilog2()
}

/// Unit levels bought with `points`, starting at `level` and halving.
///
/// About half the points go to the current level (rounded half to even),
/// never more than it can afford; level 1 takes whatever is left, so the
/// levels always sum to `points`.
pub fn spawn_levels(points: u32, level: u32) -> Vec<u32> {
    let mut levels = Vec::new();
    let (mut points, mut level) = (points, level.max(1));

    while points > 0 {
        let count = if level == 1 {
            points
        } else {
            let share = ((points / 2) as f64 / level as f64).round_ties_even() as u32;
            share.min(points / level)
        };
        levels.extend(std::iter::repeat(level).take(count as usize));
        points -= count * level;
        level = (level / 2).max(1);
    }

    levels
}

// ============================================================================
// GAME
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Setup,
    Active,
    /// Transient: the next round's setup follows immediately
    RoundOver,
    GameOver,
}

#[derive(Clone, Debug)]
pub struct Game {
    pub(crate) config: GameConfig,
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) board: Board,
    pub(crate) hero: Hero,
    pub(crate) units: BTreeMap<UnitId, Unit>,
    pub(crate) structures: Vec<Structure>,
    pub(crate) round: u32,
    pub(crate) phase: Phase,
    /// Spell codes on offer while the sanctuary is open
    pub(crate) shop: Option<Vec<String>>,
    pub(crate) kills: u32,
    pub(crate) rng: ChaCha8Rng,
    next_unit_id: UnitId,
    turns: u32,
    seed: u64,
}

impl Game {
    /// Empty game in `Setup`: round 1, hero unplaced, no obstacles
    pub fn new(config: GameConfig, catalog: Arc<Catalog>) -> Result<Self, GameError> {
        config.validate()?;
        catalog.validate()?;

        let hero = Hero::from_catalog(&config.hero_name, &catalog)?;
        let seed = config.seed.unwrap_or_else(rand::random);

        Ok(Self {
            board: Board::new(config.radius),
            hero,
            units: BTreeMap::new(),
            structures: Vec::new(),
            round: 1,
            phase: Phase::Setup,
            shop: None,
            kills: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            next_unit_id: 0,
            turns: 0,
            seed,
            config,
            catalog,
        })
    }

    /// New game with the first round set up
    pub fn start(config: GameConfig, catalog: Arc<Catalog>) -> Result<Self, GameError> {
        let mut game = Self::new(config, catalog)?;
        game.start_round()?;
        Ok(game)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn hero(&self) -> &Hero {
        &self.hero
    }

    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    pub fn structure_hex(&self, kind: StructureKind) -> Option<Hex> {
        self.structures
            .iter()
            .find(|s| s.kind == kind)
            .and_then(|s| s.position())
    }

    pub fn shop(&self) -> Option<&[String]> {
        self.shop.as_deref()
    }

    /// Units destroyed so far
    pub fn kills(&self) -> u32 {
        self.kills
    }

    /// Successful hero turns so far
    pub fn turns(&self) -> u32 {
        self.turns
    }

    // ------------------------------------------------------------------------
    // Placement
    // ------------------------------------------------------------------------

    pub fn hero_start(&self) -> Hex {
        Hex::new(0, self.board.radius() / 2)
    }

    pub fn structure_site(&self, kind: StructureKind) -> Hex {
        let radius = self.board.radius();
        match kind {
            StructureKind::Exit => Hex::new(0, -(radius - 2)),
            StructureKind::Sanctuary => Hex::new(radius - 2, -(radius / 2)),
        }
    }

    pub fn place_hero(&mut self, hex: Hex) -> Result<(), GameError> {
        self.board.place(&mut self.hero, hex)?;
        self.update_moves();
        Ok(())
    }

    pub fn add_unit(&mut self, level: u32, hex: Hex) -> Result<UnitId, GameError> {
        let template = self.catalog.unit(level)?;
        let mut unit = Unit::from_template(self.next_unit_id, template)?;
        self.board.place(&mut unit, hex)?;

        let id = unit.id;
        self.next_unit_id += 1;
        self.units.insert(id, unit);
        Ok(id)
    }

    pub fn add_obstacle(&mut self, hex: Hex) -> Result<(), GameError> {
        Ok(self.board.set_obstacle(hex)?)
    }

    pub fn add_structure(&mut self, kind: StructureKind, hex: Hex) -> Result<(), GameError> {
        let mut structure = Structure::new(kind);
        self.board.place(&mut structure, hex)?;
        self.structures.push(structure);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Rounds
    // ------------------------------------------------------------------------

    /// Build the board for the current round: obstacles, hero, structures, units
    pub fn start_round(&mut self) -> Result<(), GameError> {
        self.phase = Phase::Setup;
        self.units.clear();
        self.structures.clear();
        self.shop = None;
        self.next_unit_id = 0;

        let hero_hex = self.hero_start();
        let mut sites = Vec::new();
        for kind in StructureKind::ALL {
            if let Ok(template) = self.catalog.structure(kind) {
                if self.round % template.round_frequency == 0 {
                    sites.push((kind, self.structure_site(kind)));
                }
            }
        }

        let mut reserved = vec![hero_hex];
        reserved.extend(sites.iter().map(|(_, hex)| *hex));
        self.board
            .clear_round(&mut self.rng, self.config.obstacle_chance, &reserved);

        self.board.place(&mut self.hero, hero_hex)?;
        for (kind, hex) in sites {
            self.add_structure(kind, hex)?;
        }
        self.spawn_units(hero_hex)?;

        self.update_moves();
        self.phase = Phase::Active;
        info!(
            "Round {} started: {} units, {} obstacles",
            self.round,
            self.units.len(),
            self.board.obstacles().len()
        );
        Ok(())
    }

    fn spawn_units(&mut self, hero_hex: Hex) -> Result<(), GameError> {
        let safe = (self.board.radius() / 2 - self.round as i32 / 8).max(1);
        let guarded: FxHashSet<Hex> = self
            .board
            .hexes_in_range(hero_hex, safe, SlotFilter::Any)
            .into_iter()
            .collect();

        let mut spawn: Vec<Hex> = self
            .board
            .empty_hexes()
            .into_iter()
            .filter(|hex| !guarded.contains(hex))
            .collect();
        spawn.shuffle(&mut self.rng);

        let level = max_spawn_level(self.round).min(self.catalog.max_unit_level());
        for level in spawn_levels(self.round, level) {
            let Some(hex) = spawn.pop() else {
                warn!(
                    "Ran out of spawn hexes in round {} after {} units",
                    self.round,
                    self.units.len()
                );
                break;
            };
            self.add_unit(level, hex)?;
        }
        Ok(())
    }

    /// Commit pending abilities and move on to the next round
    pub fn exit_round(&mut self) -> Result<(), GameError> {
        self.hero.commit_pending();
        self.phase = Phase::RoundOver;
        info!(
            "{} left round {} with {} health",
            self.hero.name, self.round, self.hero.stats.health
        );
        self.round += 1;
        self.start_round()
    }

    /// Drop uncommitted purchases before the game is closed
    pub fn before_closed(&mut self) {
        if !self.hero.pending_spells().is_empty() {
            debug!("Rolling back pending spells {:?}", self.hero.pending_spells());
        }
        self.hero.rollback_pending();
        self.shop = None;
    }

    // ------------------------------------------------------------------------
    // Turns
    // ------------------------------------------------------------------------

    /// Resolve one hero action, then let every live unit act
    pub fn make_turn(&mut self, request: &ActionRequest) -> TurnResponse {
        let mut response = TurnResponse::new(request.action, self.round);

        if request.source != Actor::Hero {
            response.fail(&ActionError::ActionNotAllowed {
                action: request.action,
                actor: request.source,
            });
            return response;
        }

        let outcome = match self.resolve(request) {
            Ok(outcome) => outcome,
            Err(ActionError::GameOver) => {
                response.state = TurnState::GameOver;
                response.error = Some(ActionError::GameOver.to_string());
                return response;
            }
            Err(err) => {
                debug!("Hero {} rejected: {}", request.action, err);
                response.fail(&err);
                return response;
            }
        };

        self.turns += 1;
        response
            .hero_actions
            .insert(outcome.action.code_name().to_string(), outcome.steps);
        response.shop = outcome.shop;

        if !outcome.action.ends_turn() {
            self.units_turn(&outcome.stunned, &mut response);
        }

        if outcome.ends_round {
            if let Err(err) = self.exit_round() {
                error!("Failed to set up round {}: {}", self.round, err);
                response.fail(&err);
            }
        }

        self.update_moves();
        response.round = self.round;
        if self.is_over() {
            response.state = TurnState::GameOver;
        }
        response
    }

    fn units_turn(&mut self, stunned: &[UnitId], response: &mut TurnResponse) {
        let ids: Vec<UnitId> = self.units.keys().copied().collect();

        for id in ids {
            if self.is_over() {
                break;
            }
            if stunned.contains(&id) || !self.units.contains_key(&id) {
                continue;
            }

            let actor = Actor::Unit(id);
            let available = self.available_actions(actor);
            let request = match ai::choose_action(&self.board, SlotKind::Hero, &available) {
                Some((action, target)) => ActionRequest::new(action, actor).with_target(target),
                None => ActionRequest::new(ActionKind::Idle, actor),
            };

            match self.resolve(&request) {
                Ok(outcome) => {
                    response.units_actions.insert(
                        id,
                        ActionLog::from([(outcome.action.code_name().to_string(), outcome.steps)]),
                    );
                }
                Err(err) => warn!("Unit {} failed {}: {}", id, request.action, err),
            }
        }
    }

    /// Recompute the reachability caches of every combatant
    pub fn update_moves(&mut self) {
        let board = &self.board;

        if let Some(hex) = self.hero.position() {
            let enemy = self.hero.enemy();
            self.hero.moves =
                board.hexes_in_range(hex, self.hero.stats.move_range, ActionKind::Move.target_filter(enemy));
            self.hero.attack_hexes = board.hexes_in_range(
                hex,
                self.hero.stats.attack_range,
                ActionKind::Attack.target_filter(enemy),
            );
        }

        for unit in self.units.values_mut() {
            let Some(hex) = unit.position() else {
                continue;
            };
            let enemy = unit.enemy();
            unit.moves = board.hexes_in_range(hex, unit.stats.move_range, ActionKind::Move.target_filter(enemy));
            unit.attack_hexes =
                board.hexes_in_range(hex, unit.stats.attack_range, ActionKind::Attack.target_filter(enemy));
        }
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    pub fn save(&self) -> SaveState {
        SaveState {
            round: self.round,
            radius: Some(self.board.radius()),
            hero: HeroSave {
                health: self.hero.stats.health,
                position: self.hero.position(),
                spells: Some(self.hero.committed_spells().to_vec()),
            },
            hexes: self
                .board
                .obstacles()
                .into_iter()
                .map(|hex| HexSave {
                    q: hex.q,
                    r: hex.r,
                    slot: SlotKind::Obstacle,
                })
                .collect(),
            units: self
                .units
                .values()
                .filter_map(|unit| {
                    Some(UnitSave {
                        level: unit.level,
                        health: unit.stats.health,
                        position: unit.position()?,
                    })
                })
                .collect(),
            structures: self
                .structures
                .iter()
                .filter_map(|s| {
                    Some(StructureSave {
                        code_name: s.kind.code_name().to_string(),
                        position: s.position()?,
                    })
                })
                .collect(),
        }
    }

    /// Rebuild a game from a save document. No random obstacles are drawn.
    ///
    /// The saved radius, when present, overrides `config`. Units saved dead
    /// are dropped.
    pub fn load(mut config: GameConfig, catalog: Arc<Catalog>, save: &SaveState) -> Result<Self, GameError> {
        if let Some(radius) = save.radius {
            config.radius = radius;
        }
        let mut game = Self::new(config, catalog)?;
        game.round = save.round.max(1);

        let obstacles: Vec<Hex> = save
            .hexes
            .iter()
            .filter(|hex| hex.slot == SlotKind::Obstacle)
            .map(|hex| Hex::new(hex.q, hex.r))
            .collect();
        game.board.load_obstacles(&obstacles)?;

        game.hero.stats.health = save.hero.health.clamp(0, game.hero.max_health);
        if let Some(spells) = &save.hero.spells {
            for code in spells {
                game.catalog.spell(code)?;
            }
            game.hero.set_spells(spells.clone());
        }
        if let Some(hex) = save.hero.position {
            game.board.place(&mut game.hero, hex)?;
        }

        for structure in &save.structures {
            let kind = StructureKind::from_code_name(&structure.code_name)?;
            game.add_structure(kind, structure.position)?;
        }
        for saved in &save.units {
            if saved.health <= 0 {
                warn!("Skipping dead level {} unit at {}", saved.level, saved.position);
                continue;
            }
            let id = game.add_unit(saved.level, saved.position)?;
            if let Some(unit) = game.units.get_mut(&id) {
                unit.stats.health = saved.health;
            }
        }

        game.update_moves();
        game.phase = if game.hero.is_dead() {
            Phase::GameOver
        } else {
            Phase::Active
        };
        info!(
            "Loaded round {} with {} units",
            game.round,
            game.units.len()
        );
        Ok(game)
    }

    // ------------------------------------------------------------------------
    // Projections
    // ------------------------------------------------------------------------

    pub fn board_state(&self) -> BoardState {
        BoardState::from(&self.board)
    }

    pub fn view(&self) -> GameView {
        let hero = &self.hero;
        GameView {
            round: self.round,
            phase: self.phase,
            board: self.board_state(),
            hero: HeroView {
                name: hero.name.clone(),
                health: hero.stats.health,
                max_health: hero.max_health,
                damage: hero.stats.damage,
                attack_range: hero.stats.attack_range,
                move_range: hero.stats.move_range,
                armor: hero.stats.armor,
                weapon: hero.weapon.clone(),
                suit: hero.suit.clone(),
                spells: hero.spells().map(str::to_string).collect(),
                skills: hero.skills.clone(),
                position: hero.position(),
                moves: hero.moves.clone(),
                attack_hexes: hero.attack_hexes.clone(),
            },
            units: self
                .units
                .values()
                .map(|unit| {
                    (
                        unit.id,
                        UnitView {
                            id: unit.id,
                            name: unit.name.clone(),
                            level: unit.level,
                            health: unit.stats.health,
                            damage: unit.stats.damage,
                            attack_range: unit.stats.attack_range,
                            move_range: unit.stats.move_range,
                            armor: unit.stats.armor,
                            position: unit.position(),
                            moves: unit.moves.clone(),
                            attack_hexes: unit.attack_hexes.clone(),
                        },
                    )
                })
                .collect(),
            structures: self
                .structures
                .iter()
                .map(|s| StructureView {
                    code_name: s.kind.code_name().to_string(),
                    position: s.position(),
                })
                .collect(),
            shop: self.shop.clone(),
        }
    }
}
