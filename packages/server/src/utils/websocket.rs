use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::event::{Audience, PlayerDecision, ServerEvent};
use crate::services::notifier::Notifier;
use crate::state::AppState;

pub async fn handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

pub async fn handle_socket(ws: WebSocket, state: AppState) {
    // 接続IDがそのままプレイヤーIDになる
    let connection_id = Uuid::new_v4().to_string();
    info!("New WebSocket connection established: {}", connection_id);

    let (mut sender, mut receiver) = ws.split();
    let mut rx = state.hub.register(&connection_id);

    let connection_id_for_send = connection_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = sender.send(msg).await {
                warn!(
                    "Error sending message to {}: {}",
                    connection_id_for_send, e
                );
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let result = match serde_json::from_str::<PlayerDecision>(&text) {
            Ok(decision) => {
                let mut session = state.session.lock().await;
                session
                    .handle(&connection_id, decision)
                    .await
                    .map_err(|e| e.to_string())
            }
            Err(e) => Err(format!("メッセージのフォーマットが不正です: {}", e)),
        };

        if let Err(message) = result {
            info!("Rejected message from {}: {}", connection_id, message);
            state.hub.notify(
                Audience::Player(connection_id.clone()),
                ServerEvent::Error { message },
            );
        }
    }

    info!("WebSocket connection closed: {}", connection_id);
    state.hub.unregister(&connection_id);
    send_task.abort();
}
