use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::error;

use rally_types::api::{Claims, ReactionOutcomeResponse};
use rally_types::events::ReactionEvent;

use crate::state::AppState;

pub async fn handle_reaction(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(event): Json<ReactionEvent>,
) -> Result<impl IntoResponse, StatusCode> {
    let outcome = state.economy.on_reaction(&event).await.map_err(|e| {
        error!(
            "Dropped reaction {} by {} on {} (from {}): {}",
            event.emoji, event.user_id, event.message.id, claims.sub, e
        );
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(ReactionOutcomeResponse {
        outcome: outcome.label().to_string(),
    }))
}
