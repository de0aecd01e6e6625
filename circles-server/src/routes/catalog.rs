//! Catalog endpoint
//!
//! Returns the spell, item, unit and structure templates for the UI.

use std::sync::Arc;

use axum::{extract::State, Json};
use circles_core::Catalog;

use crate::state::ServerState;

pub async fn get_catalog(State(state): State<Arc<ServerState>>) -> Json<Catalog> {
    Json(state.catalog.as_ref().clone())
}
