//! OAuth authorization endpoints.

use super::error::ApiError;
use super::AppState;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub code: String,
}

/// GET /api/token/url - Page where the user gets a confirmation code
pub async fn token_url(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "url": state.tokens.check_code_url(),
        "authorized": state.tokens.is_valid().await,
    }))
}

/// POST /api/token - Exchange a confirmation code for tokens
pub async fn set_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.code.trim().is_empty() {
        return Err(ApiError::BadRequest("code is required".to_string()));
    }

    let token = state.tokens.exchange_code(&req.code).await?;
    Ok(Json(json!({
        "status": "ok",
        "expiry": token.expiry,
    })))
}
