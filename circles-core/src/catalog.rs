//! Entity template catalog: spells, items, unit levels, structures and hero defaults
//!
//! Rows are immutable once loaded. Numeric parameters live in named `effects`
//! maps so actions read e.g. `radius` or `damage` without hard-coding them.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::entities::{Stats, StructureKind};
use crate::error::CatalogError;

/// Named numeric effect parameters of a catalog row
pub type Effects = BTreeMap<String, i32>;

fn lookup(code_name: &str, effects: &Effects, key: &str) -> Result<i32, CatalogError> {
    effects
        .get(key)
        .copied()
        .ok_or_else(|| CatalogError::MissingEffect {
            code_name: code_name.to_string(),
            effect: key.to_string(),
        })
}

fn effects(pairs: &[(&str, i32)]) -> Effects {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

// ============================================================================
// ROWS
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellTemplate {
    pub code_name: String,
    pub name: String,
    #[serde(default)]
    pub cost: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub effects: Effects,
}

impl SpellTemplate {
    pub fn effect(&self, key: &str) -> Result<i32, CatalogError> {
        lookup(&self.code_name, &self.effects, key)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTemplate {
    pub code_name: String,
    pub name: String,
    #[serde(default)]
    pub cost: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub effects: Effects,
}

impl ItemTemplate {
    pub fn effect(&self, key: &str) -> Result<i32, CatalogError> {
        lookup(&self.code_name, &self.effects, key)
    }

    /// Items modify only the stats they name
    pub fn effect_or(&self, key: &str, default: i32) -> i32 {
        self.effects.get(key).copied().unwrap_or(default)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTemplate {
    pub level: u32,
    pub name: String,
    pub stats: Stats,
    /// Ability code names unlocked on top of move and attack
    #[serde(default)]
    pub abilities: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureTemplate {
    pub code_name: String,
    pub name: String,
    /// Appears on rounds divisible by this
    pub round_frequency: u32,
    #[serde(default)]
    pub effects: Effects,
}

impl StructureTemplate {
    pub fn effect(&self, key: &str) -> Result<i32, CatalogError> {
        lookup(&self.code_name, &self.effects, key)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroTemplate {
    pub stats: Stats,
    #[serde(default)]
    pub weapon: Option<String>,
    #[serde(default)]
    pub suit: Option<String>,
    #[serde(default)]
    pub spells: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

// ============================================================================
// CATALOG
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub hero: HeroTemplate,
    pub spells: Vec<SpellTemplate>,
    pub items: Vec<ItemTemplate>,
    pub units: Vec<UnitTemplate>,
    pub structures: Vec<StructureTemplate>,
}

impl Catalog {
    pub fn spell(&self, code: &str) -> Result<&SpellTemplate, CatalogError> {
        self.spells
            .iter()
            .find(|s| s.code_name == code)
            .ok_or_else(|| CatalogError::UnknownSpell(code.to_string()))
    }

    pub fn item(&self, code: &str) -> Result<&ItemTemplate, CatalogError> {
        self.items
            .iter()
            .find(|i| i.code_name == code)
            .ok_or_else(|| CatalogError::UnknownItem(code.to_string()))
    }

    pub fn unit(&self, level: u32) -> Result<&UnitTemplate, CatalogError> {
        self.units
            .iter()
            .find(|u| u.level == level)
            .ok_or(CatalogError::UnknownUnitLevel(level))
    }

    pub fn structure(&self, kind: StructureKind) -> Result<&StructureTemplate, CatalogError> {
        self.structures
            .iter()
            .find(|s| s.code_name == kind.code_name())
            .ok_or_else(|| CatalogError::UnknownStructure(kind.code_name().to_string()))
    }

    /// Highest unit level with a template
    pub fn max_unit_level(&self) -> u32 {
        self.units.iter().map(|u| u.level).max().unwrap_or(1)
    }

    /// Check the invariants round setup relies on: unit levels form an
    /// unbroken power-of-two chain from 1, the exit exists, every structure
    /// is known and every hero reference resolves.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let max = self.max_unit_level();
        if !max.is_power_of_two() {
            return Err(CatalogError::Invalid(format!(
                "max unit level {} is not a power of two",
                max
            )));
        }
        let mut level = 1;
        while level <= max {
            self.unit(level)?;
            level *= 2;
        }

        for structure in &self.structures {
            StructureKind::from_code_name(&structure.code_name)?;
            if structure.round_frequency == 0 {
                return Err(CatalogError::Invalid(format!(
                    "{} has round_frequency 0",
                    structure.code_name
                )));
            }
        }
        self.structure(StructureKind::Exit)?;

        if let Some(weapon) = &self.hero.weapon {
            self.item(weapon)?;
        }
        if let Some(suit) = &self.hero.suit {
            self.item(suit)?;
        }
        for spell in &self.hero.spells {
            self.spell(spell)?;
        }
        Ok(())
    }

    /// Load a catalog from a JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading catalog {}", path.display()))?;
        let catalog: Catalog = serde_json::from_str(&content)
            .with_context(|| format!("parsing catalog {}", path.display()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Save to JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        let stats = |health, damage, attack_range, move_range, armor| Stats {
            health,
            damage,
            attack_range,
            move_range,
            armor,
        };

        Self {
            hero: HeroTemplate {
                stats: stats(50, 3, 1, 1, 2),
                weapon: Some("sword".to_string()),
                suit: Some("cuirass".to_string()),
                spells: vec!["shield_bash".to_string()],
                skills: Vec::new(),
            },
            spells: vec![
                SpellTemplate {
                    code_name: "path_of_fire".to_string(),
                    name: "Path of Fire".to_string(),
                    cost: 30,
                    description: "Burns every creature along a straight line".to_string(),
                    effects: effects(&[("radius", 1), ("damage", 8), ("path_length", 4)]),
                },
                SpellTemplate {
                    code_name: "shield_bash".to_string(),
                    name: "Shield Bash".to_string(),
                    cost: 20,
                    description: "Pushes adjacent enemies back, crushing those with nowhere to go"
                        .to_string(),
                    effects: effects(&[("radius", 1), ("damage", 5)]),
                },
                SpellTemplate {
                    code_name: "blink".to_string(),
                    name: "Blink".to_string(),
                    cost: 25,
                    description: "Teleports to a free hex nearby".to_string(),
                    effects: effects(&[("radius", 3)]),
                },
            ],
            items: vec![
                ItemTemplate {
                    code_name: "sword".to_string(),
                    name: "Sword".to_string(),
                    cost: 10,
                    description: String::new(),
                    effects: effects(&[("damage", 2)]),
                },
                ItemTemplate {
                    code_name: "cuirass".to_string(),
                    name: "Cuirass".to_string(),
                    cost: 10,
                    description: String::new(),
                    effects: effects(&[("armor", 0)]),
                },
            ],
            units: vec![
                UnitTemplate {
                    level: 1,
                    name: "Imp".to_string(),
                    stats: stats(5, 1, 1, 1, 0),
                    abilities: Vec::new(),
                },
                UnitTemplate {
                    level: 2,
                    name: "Hellhound".to_string(),
                    stats: stats(10, 2, 1, 2, 1),
                    abilities: Vec::new(),
                },
                UnitTemplate {
                    level: 4,
                    name: "Fire Archer".to_string(),
                    stats: stats(14, 3, 3, 1, 1),
                    abilities: Vec::new(),
                },
                UnitTemplate {
                    level: 8,
                    name: "Pit Lord".to_string(),
                    stats: stats(30, 5, 1, 1, 3),
                    abilities: vec!["path_of_fire".to_string()],
                },
            ],
            structures: vec![
                StructureTemplate {
                    code_name: "exit".to_string(),
                    name: "Exit".to_string(),
                    round_frequency: 1,
                    effects: effects(&[("radius", 1)]),
                },
                StructureTemplate {
                    code_name: "sanctuary".to_string(),
                    name: "Sanctuary".to_string(),
                    round_frequency: 3,
                    effects: effects(&[("radius", 1)]),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_is_valid() {
        let catalog = Catalog::default();
        catalog.validate().unwrap();
        assert_eq!(catalog.max_unit_level(), 8);
    }

    #[test]
    fn test_spell_effects() {
        let catalog = Catalog::default();
        let fire = catalog.spell("path_of_fire").unwrap();
        assert_eq!(fire.effect("radius").unwrap(), 1);
        assert_eq!(fire.effect("damage").unwrap(), 8);
        assert_eq!(fire.effect("path_length").unwrap(), 4);
        assert_eq!(catalog.spell("blink").unwrap().effect("radius").unwrap(), 3);
        assert_eq!(
            catalog.spell("blink").unwrap().effect("damage"),
            Err(CatalogError::MissingEffect {
                code_name: "blink".to_string(),
                effect: "damage".to_string(),
            })
        );
    }

    #[test]
    fn test_lookups() {
        let catalog = Catalog::default();
        assert_eq!(catalog.unit(4).unwrap().name, "Fire Archer");
        assert_eq!(catalog.unit(3), Err(CatalogError::UnknownUnitLevel(3)));
        assert!(matches!(catalog.spell("meteor"), Err(CatalogError::UnknownSpell(_))));
        assert!(matches!(catalog.item("axe"), Err(CatalogError::UnknownItem(_))));
        assert_eq!(
            catalog.structure(StructureKind::Sanctuary).unwrap().round_frequency,
            3
        );
    }

    #[test]
    fn test_validate_broken_level_chain() {
        let mut catalog = Catalog::default();
        catalog.units.retain(|u| u.level != 2);
        assert_eq!(catalog.validate(), Err(CatalogError::UnknownUnitLevel(2)));
    }

    #[test]
    fn test_validate_requires_exit() {
        let mut catalog = Catalog::default();
        catalog.structures.retain(|s| s.code_name != "exit");
        assert!(matches!(
            catalog.validate(),
            Err(CatalogError::UnknownStructure(_))
        ));
    }

    #[test]
    fn test_json_roundtrip_file() {
        let path = std::env::temp_dir().join(format!("circles-catalog-{}.json", std::process::id()));
        let catalog = Catalog::default();
        catalog.save(&path).unwrap();
        let loaded = Catalog::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, catalog);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Catalog::load(Path::new("/nonexistent/catalog.json")).unwrap_err();
        assert!(err.to_string().contains("reading catalog"));
    }
}
