use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{debug, error};

use rally_core::render;
use rally_types::api::CancelResolutionResponse;

use crate::state::AppState;

/// A button click relayed by the bridge.
#[derive(Debug, Deserialize)]
pub struct ButtonEvent {
    pub custom_id: String,
    pub user_id: String,
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    cancel_case(&state, case_id).await
}

/// Cancel is open to anyone in the thread, so the clicking user is only logged.
pub async fn handle_button(
    State(state): State<AppState>,
    Json(event): Json<ButtonEvent>,
) -> Result<impl IntoResponse, StatusCode> {
    let case_id = render::parse_cancel_button(&event.custom_id)
        .ok_or(StatusCode::BAD_REQUEST)?
        .to_string();
    debug!("{} pressed cancel on case {}", event.user_id, case_id);
    cancel_case(&state, case_id).await
}

async fn cancel_case(
    state: &AppState,
    case_id: String,
) -> Result<Json<CancelResolutionResponse>, StatusCode> {
    let cancelled = state.resolutions.cancel(&case_id).await.map_err(|e| {
        error!("Cancelling resolution case {} failed: {}", case_id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(CancelResolutionResponse { case_id, cancelled }))
}
