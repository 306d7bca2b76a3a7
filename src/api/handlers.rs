use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, OriginalUri, Query, State},
    http::{HeaderMap, Method, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::Permission;
use crate::errors::{AppError, VerifyError};
use crate::models::hiscore::{PlayerHiscoreData, MAX_PLAYER_NAME_LEN};
use crate::models::token::{NewToken, TokenGrant};
use crate::AppState;

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Deserialize)]
pub struct HiscoreParams {
    pub player_name: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Deserialize)]
pub struct LatestParams {
    pub gte_player_id: Option<i64>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Serialize)]
pub struct CreateTokenResponse {
    pub token: String,
}

// ── Auth ─────────────────────────────────────────────────────

/// Check the `token` header for `permission`. A missing header is denied
/// like any other unknown token.
async fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    permission: Permission,
    method: &Method,
    uri: &OriginalUri,
) -> Result<(), AppError> {
    let token = headers
        .get("token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match state.verifier.verify(token, permission.name()).await {
        Ok(_) => Ok(()),
        Err(e @ VerifyError::PermissionDenied { .. }) => {
            tracing::warn!(route = %format!("{} {}", method, uri.0), "token verification failed: {}", e);
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    params
        .map(|Query(p)| p)
        .map_err(|e| AppError::Validation(e.body_text()))
}

fn require_at_least(name: &str, value: i64, min: i64) -> Result<i64, AppError> {
    if value < min {
        return Err(AppError::Validation(format!("{} must be >= {}, got {}", name, min, value)));
    }
    Ok(value)
}

// ── Handlers ─────────────────────────────────────────────────

/// GET /v2/hiscore: snapshots for one player, newest first
pub async fn get_hiscore(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: OriginalUri,
    headers: HeaderMap,
    params: Result<Query<HiscoreParams>, QueryRejection>,
) -> Result<Json<Vec<PlayerHiscoreData>>, AppError> {
    authorize(&state, &headers, Permission::RequestHighscores, &method, &uri).await?;
    let params = query_params(params)?;

    let player_name = params
        .player_name
        .ok_or_else(|| AppError::Validation("player_name is required".into()))?;
    if player_name.chars().count() > MAX_PLAYER_NAME_LEN {
        return Err(AppError::Validation(format!(
            "player_name must be at most {} characters",
            MAX_PLAYER_NAME_LEN
        )));
    }
    let page = require_at_least("page", params.page.unwrap_or(1), 1)?;
    let page_size = require_at_least("page_size", params.page_size.unwrap_or(10), 1)?;
    if page_size > 1000 {
        return Err(AppError::Validation(format!("page_size must be <= 1000, got {}", page_size)));
    }

    let data = state.hiscores.read(&player_name, page, page_size).await?;
    Ok(Json(data))
}

/// GET /v2/hiscore/latest: latest snapshot per player from a player id on
pub async fn get_hiscore_latest(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: OriginalUri,
    headers: HeaderMap,
    params: Result<Query<LatestParams>, QueryRejection>,
) -> Result<Json<Vec<PlayerHiscoreData>>, AppError> {
    authorize(&state, &headers, Permission::RequestHighscores, &method, &uri).await?;
    let params = query_params(params)?;

    let gte_player_id = params
        .gte_player_id
        .ok_or_else(|| AppError::Validation("gte_player_id is required".into()))?;
    let gte_player_id = require_at_least("gte_player_id", gte_player_id, 0)?;
    let page = params
        .page
        .map(|p| require_at_least("page", p, 1))
        .transpose()?;
    let page_size = require_at_least("page_size", params.page_size.unwrap_or(1000), 1)?;

    let data = state
        .hiscores
        .read_latest(gte_player_id, page, page_size)
        .await?;
    Ok(Json(data))
}

/// POST /v2/hiscore: store snapshots for many players
pub async fn post_hiscore(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: OriginalUri,
    headers: HeaderMap,
    body: Result<Json<Vec<PlayerHiscoreData>>, JsonRejection>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    authorize(&state, &headers, Permission::RequestHighscores, &method, &uri).await?;
    let Json(data) = body.map_err(|e| AppError::Validation(e.body_text()))?;

    for row in &data {
        row.validate().map_err(AppError::Validation)?;
    }

    state.hiscores.create(&data).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "Highscore data created successfully."})),
    ))
}

/// POST /v2/tokens: issue a new token with the requested flags
pub async fn create_token(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: OriginalUri,
    headers: HeaderMap,
    body: Result<Json<TokenGrant>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateTokenResponse>), AppError> {
    authorize(&state, &headers, Permission::CreateToken, &method, &uri).await?;
    let Json(grant) = body.map_err(|e| AppError::Validation(e.body_text()))?;

    let new_token = NewToken::generate(grant);
    state.tokens.insert(&new_token).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateTokenResponse {
            token: new_token.token,
        }),
    ))
}
