//! Serializable shapes: turn request/response, save document and projections

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::actions::{ActionKind, ActionRequest, Actor, Step};
use crate::board::{Board, Hex};
use crate::catalog::SpellTemplate;
use crate::entities::{SlotKind, UnitId};
use crate::error::ActionError;
use crate::game::Phase;

/// Steps keyed by action code name
pub type ActionLog = BTreeMap<String, Vec<Step>>;

// ============================================================================
// TURNS
// ============================================================================

/// Hero action as submitted by a client
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub action: String,
    #[serde(default)]
    pub game_id: u64,
    #[serde(default)]
    pub target_hex: Option<String>,
    #[serde(default)]
    pub target_unit: Option<UnitId>,
    #[serde(default)]
    pub purchase: Option<String>,
}

impl TurnRequest {
    pub fn to_action_request(&self) -> Result<ActionRequest, ActionError> {
        let mut request = ActionRequest::new(self.action.parse()?, Actor::Hero);
        if let Some(id) = &self.target_hex {
            request.target_hex = Some(id.parse()?);
        }
        request.target_unit = self.target_unit;
        request.purchase = self.purchase.clone();
        Ok(request)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Success,
    Failed,
    GameOver,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResponse {
    pub action: String,
    pub state: TurnState,
    pub round: u32,
    pub hero_actions: ActionLog,
    pub units_actions: BTreeMap<UnitId, ActionLog>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop: Option<Vec<ShopOffer>>,
}

impl TurnResponse {
    pub fn new(action: ActionKind, round: u32) -> Self {
        Self {
            action: action.code_name().to_string(),
            state: TurnState::Success,
            round,
            hero_actions: ActionLog::new(),
            units_actions: BTreeMap::new(),
            error: None,
            shop: None,
        }
    }

    /// Failed response for a request that never reached the engine
    pub fn rejected(action: &str, round: u32, error: &dyn std::error::Error) -> Self {
        let mut response = Self::new(ActionKind::Idle, round);
        response.action = action.to_string();
        response.fail(error);
        response
    }

    pub fn fail(&mut self, error: &dyn std::error::Error) {
        self.state = TurnState::Failed;
        self.error = Some(error.to_string());
    }
}

/// Spell on sale in the sanctuary
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopOffer {
    pub code_name: String,
    pub name: String,
    pub cost: u32,
    pub description: String,
}

impl From<&SpellTemplate> for ShopOffer {
    fn from(spell: &SpellTemplate) -> Self {
        Self {
            code_name: spell.code_name.clone(),
            name: spell.name.clone(),
            cost: spell.cost,
            description: spell.description.clone(),
        }
    }
}

// ============================================================================
// SAVE DOCUMENT
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveState {
    pub round: u32,
    /// Board radius; absent means the loader's configured radius
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<i32>,
    pub hero: HeroSave,
    /// Non-empty hexes only
    #[serde(default)]
    pub hexes: Vec<HexSave>,
    #[serde(default)]
    pub units: Vec<UnitSave>,
    #[serde(default)]
    pub structures: Vec<StructureSave>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroSave {
    pub health: i32,
    pub position: Option<Hex>,
    /// Committed spells; absent means catalog defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spells: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexSave {
    pub q: i32,
    pub r: i32,
    pub slot: SlotKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSave {
    pub level: u32,
    pub health: i32,
    pub position: Hex,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureSave {
    pub code_name: String,
    pub position: Hex,
}

// ============================================================================
// PROJECTIONS
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexView {
    pub q: i32,
    pub r: i32,
    pub slot: SlotKind,
}

/// Every hex keyed by its `"q;r"` id
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardState {
    pub radius: i32,
    pub hexes: BTreeMap<String, HexView>,
}

impl From<&Board> for BoardState {
    fn from(board: &Board) -> Self {
        let hexes = board
            .iter()
            .map(|(hex, slot)| {
                (
                    hex.to_string(),
                    HexView {
                        q: hex.q,
                        r: hex.r,
                        slot: slot.kind(),
                    },
                )
            })
            .collect();
        Self {
            radius: board.radius(),
            hexes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroView {
    pub name: String,
    pub health: i32,
    pub max_health: i32,
    pub damage: i32,
    pub attack_range: i32,
    pub move_range: i32,
    pub armor: i32,
    pub weapon: Option<String>,
    pub suit: Option<String>,
    pub spells: Vec<String>,
    pub skills: Vec<String>,
    pub position: Option<Hex>,
    pub moves: Vec<Hex>,
    pub attack_hexes: Vec<Hex>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitView {
    pub id: UnitId,
    pub name: String,
    pub level: u32,
    pub health: i32,
    pub damage: i32,
    pub attack_range: i32,
    pub move_range: i32,
    pub armor: i32,
    pub position: Option<Hex>,
    pub moves: Vec<Hex>,
    pub attack_hexes: Vec<Hex>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureView {
    pub code_name: String,
    pub position: Option<Hex>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameView {
    pub round: u32,
    pub phase: Phase,
    pub board: BoardState,
    pub hero: HeroView,
    pub units: BTreeMap<UnitId, UnitView>,
    pub structures: Vec<StructureView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoardError;

    #[test]
    fn test_turn_request_parsing() {
        let request: TurnRequest = serde_json::from_str(
            r#"{"action": "move", "game_id": 3, "target_hex": "0;2"}"#,
        )
        .unwrap();
        let action = request.to_action_request().unwrap();
        assert_eq!(action.action, ActionKind::Move);
        assert_eq!(action.source, Actor::Hero);
        assert_eq!(action.target_hex, Some(Hex::new(0, 2)));

        let bad = TurnRequest {
            action: "dance".to_string(),
            ..Default::default()
        };
        assert_eq!(
            bad.to_action_request(),
            Err(ActionError::NoSuchAbility("dance".to_string()))
        );

        let bad = TurnRequest {
            action: "move".to_string(),
            target_hex: Some("0-2".to_string()),
            ..Default::default()
        };
        assert_eq!(
            bad.to_action_request(),
            Err(ActionError::Board(BoardError::InvalidHexId("0-2".to_string())))
        );
    }

    #[test]
    fn test_turn_response_shape() {
        let mut response = TurnResponse::new(ActionKind::Attack, 2);
        response
            .hero_actions
            .insert("attack".to_string(), vec![Step::at(Hex::new(0, 2))]);
        response.units_actions.insert(
            4,
            ActionLog::from([("move".to_string(), vec![Step::at(Hex::new(1, 1))])]),
        );

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "action": "attack",
                "state": "success",
                "round": 2,
                "hero_actions": {"attack": [{"target_hex": "0;2"}]},
                "units_actions": {"4": {"move": [{"target_hex": "1;1"}]}},
            })
        );
    }

    #[test]
    fn test_board_state_projection() {
        let mut board = Board::new(3);
        board.set_obstacle(Hex::new(1, 0)).unwrap();
        let state = BoardState::from(&board);

        assert_eq!(state.radius, 3);
        assert_eq!(state.hexes.len(), 19);
        assert_eq!(state.hexes["1;0"].slot, SlotKind::Obstacle);
        assert_eq!(state.hexes["0;0"].slot, SlotKind::Empty);
    }
}
