use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;
use werewolf_server::{
    app,
    models::config::GameConfig,
    state::AppState,
    utils::test_setup::{setup_test_env, RecordingCuePlayer},
};

fn test_state() -> AppState {
    setup_test_env();
    AppState::new(
        GameConfig::immediate(),
        Arc::new(RecordingCuePlayer::default()),
    )
}

async fn send(app: axum::Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_game_state_snapshot() {
    let state = test_state();
    for (id, name) in [("p1", "Alice"), ("p2", "Bob")] {
        state.session.lock().await.join(id, name).await.unwrap();
    }
    let app = app::create_app_with(state);

    let (status, body) = send(app.clone(), "GET", "/api/game/state").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["started"], false);
    assert_eq!(body["game"]["players"].as_array().unwrap().len(), 2);
    assert_eq!(body["game"]["witch_has_heal_potion"], true);

    let (status, body) = send(app, "GET", "/api/game/players").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[1]["name"], "Bob");
    // 公開一覧には役職を含めない
    assert!(body[1].get("role").is_none());
}

#[tokio::test]
async fn test_jump_before_start_conflicts() {
    let app = app::create_app_with(test_state());
    let (status, body) = send(app, "POST", "/api/game/jump/WITCH-HEAL").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("not started"));
}

#[tokio::test]
async fn test_start_then_jump_to_day() {
    let state = test_state();
    {
        let mut session = state.session.lock().await;
        for i in 0..4 {
            session
                .join(&format!("p{}", i), &format!("Player{}", i))
                .await
                .unwrap();
        }
    }
    let app = app::create_app_with(state.clone());

    let (status, _) = send(app.clone(), "POST", "/api/game/start").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(app.clone(), "POST", "/api/game/jump/DAY").await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(app, "GET", "/api/game/state").await;
    assert_eq!(body["started"], true);
    assert_eq!(body["active_segment"], "DAY");
}

#[tokio::test]
async fn test_websocket_join_and_invalid_message() {
    let state = test_state();
    let app = app::create_app_with(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
        .await
        .unwrap();

    socket
        .send(Message::Text(
            r#"{"message_type":"join","name":"Alice"}"#.to_string(),
        ))
        .await
        .unwrap();

    let mut received = Vec::new();
    while received.len() < 2 {
        let Some(Ok(Message::Text(text))) = socket.next().await else {
            panic!("connection closed early");
        };
        received.push(serde_json::from_str::<serde_json::Value>(&text).unwrap());
    }
    assert_eq!(received[0]["message_type"], "player_data");
    assert_eq!(received[0]["player"]["name"], "Alice");
    assert_eq!(received[1]["message_type"], "player_joined");

    socket
        .send(Message::Text(r#"{"message_type":"seer_peek"}"#.to_string()))
        .await
        .unwrap();
    let Some(Ok(Message::Text(text))) = socket.next().await else {
        panic!("expected an error message");
    };
    let error: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(error["message_type"], "error");

    assert_eq!(state.session.lock().await.game().players().len(), 1);
}
