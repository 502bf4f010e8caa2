use crate::models::config::GameConfig;
use crate::routes;
use crate::services::cues::{CommandCuePlayer, CuePlayer};
use crate::state::AppState;
use axum::Router;
use std::sync::Arc;

pub fn create_app(config: GameConfig) -> Router {
    let cues: Arc<dyn CuePlayer> = Arc::new(CommandCuePlayer::from_config(&config));
    create_app_with(AppState::new(config, cues))
}

pub fn create_app_with(state: AppState) -> Router {
    routes::create_routes(state)
}
