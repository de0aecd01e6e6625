//! Game API endpoints
//!
//! Create, inspect, play, save, load and close games held in the registry.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use circles_core::{
    ActionKind, Actor, BoardState, GameConfig, GameView, SaveState, TurnRequest, TurnResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::{GameId, ServerState};

/// New game request; unset fields fall back to server defaults
#[derive(Debug, Default, Deserialize)]
pub struct NewGameRequest {
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub radius: Option<i32>,
    #[serde(default)]
    pub hero_name: Option<String>,
}

impl NewGameRequest {
    fn config(&self, defaults: &GameConfig) -> GameConfig {
        let mut config = defaults.clone();
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(radius) = self.radius {
            config.radius = radius;
        }
        if let Some(name) = &self.hero_name {
            config.hero_name = name.clone();
        }
        config
    }
}

#[derive(Debug, Serialize)]
pub struct GameResponse {
    pub game_id: GameId,
    pub game: GameView,
}

fn view(state: &ServerState, id: GameId) -> Result<Json<GameResponse>, ApiError> {
    state
        .with_game(id, |game| {
            Json(GameResponse {
                game_id: id,
                game: game.view(),
            })
        })
        .ok_or(ApiError::NoSuchGame(id))
}

/// Start a new game
pub async fn new_game(
    State(state): State<Arc<ServerState>>,
    body: Option<Json<NewGameRequest>>,
) -> Result<Json<GameResponse>, ApiError> {
    let request = body.map(|Json(req)| req).unwrap_or_default();
    let id = state.create(request.config(&state.defaults))?;
    view(&state, id)
}

/// Full game view with reachability caches
pub async fn get_game(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<GameId>,
) -> Result<Json<GameResponse>, ApiError> {
    view(&state, id)
}

/// Board occupancy only
pub async fn get_board(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<GameId>,
) -> Result<Json<BoardState>, ApiError> {
    state
        .with_game(id, |game| Json(game.board_state()))
        .ok_or(ApiError::NoSuchGame(id))
}

/// Hexes the hero could target with an action right now
pub async fn get_targets(
    State(state): State<Arc<ServerState>>,
    Path((id, action)): Path<(GameId, String)>,
) -> Result<Json<Value>, ApiError> {
    let kind: ActionKind = action.parse()?;
    let targets = state
        .with_game(id, |game| game.available_targets(Actor::Hero, kind))
        .ok_or(ApiError::NoSuchGame(id))??;

    let ids: Vec<String> = targets.iter().map(ToString::to_string).collect();
    Ok(Json(json!({
        "action": kind,
        "targets": ids,
    })))
}

/// Submit the hero's action; units answer in the same response
pub async fn make_turn(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let id = req.game_id;
    state
        .with_game_mut(id, |game| match req.to_action_request() {
            Ok(request) => game.make_turn(&request),
            Err(err) => TurnResponse::rejected(&req.action, game.round(), &err),
        })
        .map(Json)
        .ok_or(ApiError::NoSuchGame(id))
}

/// Save document of a game
pub async fn save_game(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<GameId>,
) -> Result<Json<SaveState>, ApiError> {
    state
        .with_game(id, |game| Json(game.save()))
        .ok_or(ApiError::NoSuchGame(id))
}

#[derive(Debug, Deserialize)]
pub struct LoadRequest {
    pub save: SaveState,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Register a game rebuilt from a save document
pub async fn load_game(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<LoadRequest>,
) -> Result<Json<GameResponse>, ApiError> {
    let mut config = state.defaults.clone();
    if req.seed.is_some() {
        config.seed = req.seed;
    }
    let id = state.load(config, &req.save)?;
    view(&state, id)
}

#[derive(Debug, Deserialize)]
pub struct CloseRequest {
    pub game_id: GameId,
}

/// Evict a game from the registry
pub async fn close_game(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<CloseRequest>,
) -> Result<Json<Value>, ApiError> {
    if state.close(req.game_id) {
        Ok(Json(json!({ "closed": true, "game_id": req.game_id })))
    } else {
        Err(ApiError::NoSuchGame(req.game_id))
    }
}
