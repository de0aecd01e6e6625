//! API error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::state::GameId;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("no such game: {0}")]
    NoSuchGame(GameId),
    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NoSuchGame(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<circles_core::GameError> for ApiError {
    fn from(err: circles_core::GameError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<circles_core::ActionError> for ApiError {
    fn from(err: circles_core::ActionError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
