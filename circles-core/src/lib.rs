//! All Circles Core - Rules engine for hex-grid tactical combat
//!
//! This crate provides the core game logic:
//! - Board geometry (hex grid with axial coordinates) and occupancy
//! - Hero, unit and structure entities
//! - Template catalog for spells, items, unit levels and structures
//! - Action resolution with structured step logs
//! - Round life cycle, save/load and projections
//! - Unit AI and a scripted hero for headless play

pub mod board;
pub mod entities;
pub mod catalog;
pub mod actions;
pub mod spells;
pub mod structures;
pub mod game;
pub mod ai;
pub mod state;
pub mod error;

// Re-exports for convenient access
pub use board::{Board, Hex, SlotFilter, DIRECTIONS, DEFAULT_RADIUS};
pub use entities::{Combatant, Hero, Placeable, Slot, SlotKind, Stats, Structure, StructureKind, Unit, UnitId};
pub use catalog::Catalog;
pub use actions::{ActionKind, ActionOutcome, ActionRequest, Actor, Step};
pub use game::{Game, GameConfig, Phase};
pub use ai::{choose_action, hero_request, play_game, GameSummary};
pub use state::{BoardState, GameView, SaveState, ShopOffer, TurnRequest, TurnResponse, TurnState};
pub use error::{ActionError, BoardError, CatalogError, GameError};
