//! Error types for board, catalog, action and game setup failures

use crate::actions::{ActionKind, Actor};
use crate::board::Hex;
use crate::entities::UnitId;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("no such hex: {0}")]
    NoSuchHex(Hex),
    #[error("hex {0} is occupied")]
    Occupied(Hex),
    #[error("invalid hex id {0:?}, expected \"q;r\"")]
    InvalidHexId(String),
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("unknown spell: {0}")]
    UnknownSpell(String),
    #[error("unknown item: {0}")]
    UnknownItem(String),
    #[error("no unit template for level {0}")]
    UnknownUnitLevel(u32),
    #[error("unknown structure: {0}")]
    UnknownStructure(String),
    #[error("{code_name} has no effect {effect:?}")]
    MissingEffect { code_name: String, effect: String },
    #[error("invalid catalog: {0}")]
    Invalid(String),
}

/// Failures of a single action. Raised before any mutation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("target {target} is {distance} hexes away, range is {range}")]
    TargetTooFar { target: Hex, distance: i32, range: i32 },
    #[error("target {0} is occupied")]
    TargetOccupied(Hex),
    #[error("target {0} holds nothing this action can use")]
    TargetNotOccupied(Hex),
    #[error("target {0} is not in a straight line")]
    TargetNotInLine(Hex),
    #[error("{actor} cannot use {action} now")]
    ActionNotAllowed { action: ActionKind, actor: Actor },
    #[error("no such ability: {0}")]
    NoSuchAbility(String),
    #[error("no such unit: {0}")]
    NoSuchUnit(UnitId),
    #[error("{0} requires a target")]
    MissingTarget(ActionKind),
    #[error("{0} is not on the board")]
    NotPlaced(Actor),
    #[error("game is over")]
    GameOver,
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Round setup and save/load failures
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error("invalid game config: {0}")]
    InvalidConfig(String),
}
