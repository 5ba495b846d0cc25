use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// Claims carried by the bearer token of the chat-gateway bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

// -- Ledger --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustAction {
    Add,
    Remove,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdjustPointsRequest {
    pub action: AdjustAction,
    pub points: i64,
    pub user_id: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdjustPointsResponse {
    pub user_id: String,
    pub previous: i64,
    pub balance: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandingResponse {
    pub user_id: String,
    /// 1-based leaderboard position.
    pub rank: usize,
    pub points: i64,
    pub progress_bar: String,
    pub progress_label: String,
    pub points_needed: i64,
    pub current_threshold: i64,
    pub next_threshold: i64,
    pub next_tier_id: String,
    pub next_tier_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub points: i64,
}

// -- Resolutions --

#[derive(Debug, Serialize)]
pub struct CancelResolutionResponse {
    pub case_id: String,
    pub cancelled: bool,
}

// -- Events --

#[derive(Debug, Serialize)]
pub struct ReactionOutcomeResponse {
    pub outcome: String,
}
