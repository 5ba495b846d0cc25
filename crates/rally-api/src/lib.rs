pub mod ledger;
pub mod middleware;
pub mod reactions;
pub mod resolutions;
pub mod state;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::state::AppState;

/// All bridge-facing routes. `/health` is the only unauthenticated one.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/events/reactions", post(reactions::handle_reaction))
        .route("/events/buttons", post(resolutions::handle_button))
        .route("/ledger/adjust", post(ledger::adjust))
        .route("/ledger/leaderboard", get(ledger::leaderboard))
        .route("/ledger/{user_id}/standing", get(ledger::standing))
        .route("/resolutions/{case_id}/cancel", post(resolutions::cancel))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(protected)
        .with_state(state)
}
