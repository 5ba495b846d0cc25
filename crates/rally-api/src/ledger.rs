use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{error, warn};

use rally_core::CoreError;
use rally_types::api::{AdjustPointsRequest, AdjustPointsResponse, Claims};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    10
}

fn status_for(e: &CoreError) -> StatusCode {
    match e {
        CoreError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
        CoreError::WriteFailed(_) | CoreError::Ledger(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn adjust(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AdjustPointsRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let outcome = state.commands.adjust(&req).await.map_err(|e| {
        match e {
            CoreError::InvalidAmount(_) => warn!("Rejected adjustment from {}: {}", claims.sub, e),
            _ => error!("Adjustment of {} failed: {}", req.user_id, e),
        }
        status_for(&e)
    })?;

    Ok(Json(AdjustPointsResponse {
        user_id: req.user_id,
        previous: outcome.previous,
        balance: outcome.balance,
    }))
}

pub async fn standing(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let standing = state.commands.standing(&user_id).await.map_err(|e| {
        error!("Standing lookup for {} failed: {}", user_id, e);
        status_for(&e)
    })?;
    Ok(Json(standing))
}

pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let limit = query.limit.clamp(1, 100);
    let board = state.commands.leaderboard(limit).await.map_err(|e| {
        error!("Leaderboard query failed: {}", e);
        status_for(&e)
    })?;
    Ok(Json(board))
}
