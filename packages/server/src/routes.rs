use crate::state::AppState;
use axum::{routing::get, Router};

use crate::utils::websocket;

mod game;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .nest("/api/game", game::routes(state.clone()))
        .merge(ws_routes(state))
}

fn ws_routes(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(websocket::handler))
        .with_state(state)
}
