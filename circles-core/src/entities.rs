//! Hero, unit and structure value objects

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::actions::ActionKind;
use crate::board::Hex;
use crate::catalog::{Catalog, HeroTemplate, UnitTemplate};
use crate::error::CatalogError;

pub type UnitId = u32;

// ============================================================================
// SLOTS
// ============================================================================

/// Interactive, non-combatant board features
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    Exit,
    Sanctuary,
}

impl StructureKind {
    pub const ALL: [StructureKind; 2] = [StructureKind::Exit, StructureKind::Sanctuary];

    pub fn code_name(self) -> &'static str {
        match self {
            StructureKind::Exit => "exit",
            StructureKind::Sanctuary => "sanctuary",
        }
    }

    pub fn from_code_name(code: &str) -> Result<Self, CatalogError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.code_name() == code)
            .ok_or_else(|| CatalogError::UnknownStructure(code.to_string()))
    }
}

/// Occupant of a single hex
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    Empty,
    Obstacle,
    Hero,
    Unit(UnitId),
    Structure(StructureKind),
}

impl Slot {
    pub fn kind(&self) -> SlotKind {
        match self {
            Slot::Empty => SlotKind::Empty,
            Slot::Obstacle => SlotKind::Obstacle,
            Slot::Hero => SlotKind::Hero,
            Slot::Unit(_) => SlotKind::Unit,
            Slot::Structure(_) => SlotKind::Structure,
        }
    }
}

/// Occupant tag used by range filters and projections
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Empty,
    Obstacle,
    Hero,
    Unit,
    Structure,
}

impl SlotKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SlotKind::Empty => "empty",
            SlotKind::Obstacle => "obstacle",
            SlotKind::Hero => "hero",
            SlotKind::Unit => "unit",
            SlotKind::Structure => "structure",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TRAITS
// ============================================================================

/// Anything that occupies a hex.
///
/// `set_position` is called by `Board::place` only; callers move entities
/// through the board so the slot and the back-reference never disagree.
pub trait Placeable {
    fn slot(&self) -> Slot;
    fn position(&self) -> Option<Hex>;
    fn set_position(&mut self, position: Option<Hex>);
}

/// Base combat statistics
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub health: i32,
    pub damage: i32,
    pub attack_range: i32,
    pub move_range: i32,
    #[serde(default)]
    pub armor: i32,
}

pub trait Combatant: Placeable {
    fn stats(&self) -> &Stats;
    fn stats_mut(&mut self) -> &mut Stats;

    /// Slot kind this combatant fights against
    fn enemy(&self) -> SlotKind;

    fn health(&self) -> i32 {
        self.stats().health
    }

    fn is_dead(&self) -> bool {
        self.stats().health <= 0
    }

    /// Lose `amount` health, never dropping below zero
    fn receive_damage(&mut self, amount: i32) {
        let stats = self.stats_mut();
        stats.health = (stats.health - amount.max(0)).max(0);
    }
}

// ============================================================================
// HERO
// ============================================================================

/// The player-controlled combatant
#[derive(Clone, Debug)]
pub struct Hero {
    pub name: String,
    /// Effective stats, equipment included
    pub stats: Stats,
    pub max_health: i32,
    pub weapon: Option<String>,
    pub suit: Option<String>,
    pub skills: Vec<String>,
    spells: Vec<String>,
    pending_spells: Vec<String>,
    position: Option<Hex>,
    pub moves: Vec<Hex>,
    pub attack_hexes: Vec<Hex>,
}

impl Hero {
    /// Build the hero from catalog defaults, applying weapon and suit effects
    pub fn from_catalog(name: &str, catalog: &Catalog) -> Result<Self, CatalogError> {
        let HeroTemplate {
            stats,
            weapon,
            suit,
            spells,
            skills,
        } = catalog.hero.clone();

        let mut effective = stats;
        if let Some(code) = &weapon {
            effective.damage += catalog.item(code)?.effect_or("damage", 0);
        }
        if let Some(code) = &suit {
            effective.armor += catalog.item(code)?.effect_or("armor", 0);
        }
        for spell in &spells {
            catalog.spell(spell)?;
        }

        Ok(Self {
            name: name.to_string(),
            stats: effective,
            max_health: effective.health,
            weapon,
            suit,
            skills,
            spells,
            pending_spells: Vec::new(),
            position: None,
            moves: Vec::new(),
            attack_hexes: Vec::new(),
        })
    }

    /// Known spells, pending purchases included
    pub fn spells(&self) -> impl Iterator<Item = &str> {
        self.spells
            .iter()
            .chain(self.pending_spells.iter())
            .map(String::as_str)
    }

    /// Spells that survive a save
    pub fn committed_spells(&self) -> &[String] {
        &self.spells
    }

    pub fn pending_spells(&self) -> &[String] {
        &self.pending_spells
    }

    pub fn knows_spell(&self, code: &str) -> bool {
        self.spells().any(|known| known == code)
    }

    /// Learn a spell provisionally until the round is exited
    pub fn learn(&mut self, code: &str) {
        if !self.knows_spell(code) {
            self.pending_spells.push(code.to_string());
        }
    }

    pub fn commit_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending_spells);
        self.spells.extend(pending);
    }

    pub fn rollback_pending(&mut self) {
        self.pending_spells.clear();
    }

    pub fn set_spells(&mut self, spells: Vec<String>) {
        self.spells = spells;
        self.pending_spells.clear();
    }
}

impl Placeable for Hero {
    fn slot(&self) -> Slot {
        Slot::Hero
    }

    fn position(&self) -> Option<Hex> {
        self.position
    }

    fn set_position(&mut self, position: Option<Hex>) {
        self.position = position;
    }
}

impl Combatant for Hero {
    fn stats(&self) -> &Stats {
        &self.stats
    }

    fn stats_mut(&mut self) -> &mut Stats {
        &mut self.stats
    }

    fn enemy(&self) -> SlotKind {
        SlotKind::Unit
    }
}

// ============================================================================
// UNIT
// ============================================================================

/// AI-controlled combatant, destroyed at zero health
#[derive(Clone, Debug)]
pub struct Unit {
    pub id: UnitId,
    pub level: u32,
    pub name: String,
    pub stats: Stats,
    /// Resolved once: move, attack, then unlocked abilities
    pub actions: Vec<ActionKind>,
    position: Option<Hex>,
    pub moves: Vec<Hex>,
    pub attack_hexes: Vec<Hex>,
}

impl Unit {
    pub fn from_template(id: UnitId, template: &UnitTemplate) -> Result<Self, CatalogError> {
        let mut actions = vec![ActionKind::Move, ActionKind::Attack];
        for code in &template.abilities {
            let kind = ActionKind::from_code_name(code)
                .ok_or_else(|| CatalogError::UnknownSpell(code.clone()))?;
            if !actions.contains(&kind) {
                actions.push(kind);
            }
        }

        Ok(Self {
            id,
            level: template.level,
            name: template.name.clone(),
            stats: template.stats,
            actions,
            position: None,
            moves: Vec::new(),
            attack_hexes: Vec::new(),
        })
    }

    pub fn can(&self, action: ActionKind) -> bool {
        action == ActionKind::Idle || self.actions.contains(&action)
    }
}

impl Placeable for Unit {
    fn slot(&self) -> Slot {
        Slot::Unit(self.id)
    }

    fn position(&self) -> Option<Hex> {
        self.position
    }

    fn set_position(&mut self, position: Option<Hex>) {
        self.position = position;
    }
}

impl Combatant for Unit {
    fn stats(&self) -> &Stats {
        &self.stats
    }

    fn stats_mut(&mut self) -> &mut Stats {
        &mut self.stats
    }

    fn enemy(&self) -> SlotKind {
        SlotKind::Hero
    }
}

// ============================================================================
// STRUCTURE
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Structure {
    pub kind: StructureKind,
    position: Option<Hex>,
}

impl Structure {
    pub fn new(kind: StructureKind) -> Self {
        Self {
            kind,
            position: None,
        }
    }
}

impl Placeable for Structure {
    fn slot(&self) -> Slot {
        Slot::Structure(self.kind)
    }

    fn position(&self) -> Option<Hex> {
        self.position
    }

    fn set_position(&mut self, position: Option<Hex>) {
        self.position = position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hero_defaults() {
        let hero = Hero::from_catalog("Hero", &Catalog::default()).unwrap();
        assert_eq!(hero.stats.health, 50);
        assert_eq!(hero.max_health, 50);
        // sword adds 2
        assert_eq!(hero.stats.damage, 5);
        assert_eq!(hero.stats.attack_range, 1);
        assert_eq!(hero.stats.move_range, 1);
        assert_eq!(hero.weapon.as_deref(), Some("sword"));
        assert_eq!(hero.suit.as_deref(), Some("cuirass"));
        assert_eq!(hero.position(), None);
    }

    #[test]
    fn test_damage_clamps_at_zero() {
        let mut hero = Hero::from_catalog("Hero", &Catalog::default()).unwrap();
        hero.receive_damage(8);
        assert_eq!(hero.health(), 42);
        hero.receive_damage(100);
        assert_eq!(hero.health(), 0);
        assert!(hero.is_dead());
        hero.receive_damage(-5);
        assert_eq!(hero.health(), 0);
    }

    #[test]
    fn test_pending_spells() {
        let mut hero = Hero::from_catalog("Hero", &Catalog::default()).unwrap();
        assert!(!hero.knows_spell("blink"));

        hero.learn("blink");
        assert!(hero.knows_spell("blink"));
        assert_eq!(hero.pending_spells(), ["blink".to_string()]);

        hero.rollback_pending();
        assert!(!hero.knows_spell("blink"));

        hero.learn("blink");
        hero.learn("blink");
        hero.commit_pending();
        assert!(hero.pending_spells().is_empty());
        assert_eq!(hero.committed_spells().iter().filter(|s| *s == "blink").count(), 1);
    }

    #[test]
    fn test_unit_actions_resolved_once() {
        let catalog = Catalog::default();
        let imp = Unit::from_template(0, catalog.unit(1).unwrap()).unwrap();
        assert_eq!(imp.actions, vec![ActionKind::Move, ActionKind::Attack]);
        assert!(imp.can(ActionKind::Idle));
        assert!(!imp.can(ActionKind::PathOfFire));
        assert_eq!(imp.enemy(), SlotKind::Hero);

        let lord = Unit::from_template(1, catalog.unit(8).unwrap()).unwrap();
        assert!(lord.can(ActionKind::PathOfFire));
        assert_eq!(lord.slot(), Slot::Unit(1));
    }

    #[test]
    fn test_unknown_ability_rejected() {
        let mut template = Catalog::default().unit(1).unwrap().clone();
        template.abilities.push("fireball".to_string());
        assert_eq!(
            Unit::from_template(0, &template).unwrap_err(),
            CatalogError::UnknownSpell("fireball".to_string())
        );
    }

    #[test]
    fn test_structure_codes() {
        assert_eq!(StructureKind::from_code_name("exit").unwrap(), StructureKind::Exit);
        assert_eq!(
            StructureKind::from_code_name("sanctuary").unwrap(),
            StructureKind::Sanctuary
        );
        assert!(StructureKind::from_code_name("tower").is_err());
        assert_eq!(serde_json::to_string(&SlotKind::Obstacle).unwrap(), "\"obstacle\"");
    }
}
