use std::sync::Arc;

use rally_core::commands::LedgerCommands;
use rally_core::economy::ReactionEconomy;
use rally_core::resolution::ResolutionWorkflow;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub economy: ReactionEconomy,
    pub commands: LedgerCommands,
    pub resolutions: Arc<ResolutionWorkflow>,
    pub jwt_secret: String,
}
