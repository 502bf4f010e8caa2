use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::error;

use crate::error::GameError;
use crate::models::segment::SegmentType;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/state", get(get_game_state))
        .route("/players", get(get_players))
        // 管理者用の操作
        .route("/start", post(start_game))
        .route("/next-segment", post(next_segment_handler))
        .route("/jump/:segment", post(jump_handler))
        .route("/reset", post(reset_handler))
        .with_state(state)
}

fn error_response(e: GameError) -> (StatusCode, Json<Value>) {
    let status = if e.is_protocol_violation() {
        StatusCode::CONFLICT
    } else {
        error!("Invariant violation: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(json!({ "error": e.to_string() })))
}

fn respond(result: Result<String, GameError>) -> (StatusCode, Json<Value>) {
    match result {
        Ok(message) => (StatusCode::OK, Json(json!({ "message": message }))),
        Err(e) => error_response(e),
    }
}

pub async fn get_game_state(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.lock().await;
    Json(session.snapshot())
}

async fn get_players(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.lock().await;
    Json(session.game().client_player_list())
}

pub async fn start_game(State(state): State<AppState>) -> impl IntoResponse {
    let mut session = state.session.lock().await;
    let result = session
        .start()
        .await
        .map(|_| "Game started successfully".to_string());
    respond(result)
}

async fn next_segment_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut session = state.session.lock().await;
    let result = session
        .next_segment()
        .await
        .map(|_| format!("フェーズを更新しました: {:?}", session.active_segment()));
    respond(result)
}

async fn jump_handler(
    State(state): State<AppState>,
    Path(segment): Path<SegmentType>,
) -> impl IntoResponse {
    let mut session = state.session.lock().await;
    let result = session
        .jump_to(segment)
        .await
        .map(|_| format!("Jumped to {}", segment));
    respond(result)
}

async fn reset_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut session = state.session.lock().await;
    session.reset();
    respond(Ok("Game reset".to_string()))
}
