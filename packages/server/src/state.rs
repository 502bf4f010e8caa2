use axum::extract::ws::Message;
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, warn};

use crate::models::config::GameConfig;
use crate::models::event::{Audience, ServerEvent};
use crate::services::{cues::CuePlayer, notifier::Notifier, session::GameSession};

/// 接続IDごとの送信チャネル
#[derive(Default)]
pub struct ConnectionHub {
    connections: RwLock<HashMap<String, mpsc::UnboundedSender<Message>>>,
}

impl ConnectionHub {
    pub fn register(&self, connection_id: &str) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(connection_id.to_string(), tx);
        rx
    }

    pub fn unregister(&self, connection_id: &str) {
        self.connections
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(connection_id);
    }

    pub fn connection_count(&self) -> usize {
        self.connections
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl Notifier for ConnectionHub {
    fn notify(&self, audience: Audience, event: ServerEvent) {
        let text = match serde_json::to_string(&event) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to serialize {}: {}", event.name(), e);
                return;
            }
        };

        let connections = self.connections.read().unwrap_or_else(|e| e.into_inner());
        for (connection_id, tx) in connections.iter() {
            if !audience.includes(connection_id) {
                continue;
            }
            debug!("Sending {} to {}", event.name(), connection_id);
            if let Err(e) = tx.send(Message::Text(text.clone())) {
                warn!("Failed to send {} to {}: {}", event.name(), connection_id, e);
            }
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    /// 判断・管理操作・状態取得はすべてこのロックで直列化する。
    /// フェーズ遷移中に待つキューの再生もロックを保持したまま行うため、
    /// 状態取得や `reset` は再生中の遷移が終わるまで待つ（遷移途中の状態は見せない）。
    pub session: Arc<Mutex<GameSession>>,
    pub hub: Arc<ConnectionHub>,
    pub config: Arc<GameConfig>,
}

impl AppState {
    pub fn new(config: GameConfig, cues: Arc<dyn CuePlayer>) -> Self {
        let config = Arc::new(config);
        let hub = Arc::new(ConnectionHub::default());
        let session = GameSession::new(config.clone(), hub.clone(), cues);
        AppState {
            session: Arc::new(Mutex::new(session)),
            hub,
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hub_delivers_only_to_audience() {
        let hub = ConnectionHub::default();
        let mut alice = hub.register("alice");
        let mut bob = hub.register("bob");

        hub.notify(
            Audience::Player("alice".to_string()),
            ServerEvent::CupidPickRequired,
        );
        hub.notify(Audience::Everyone, ServerEvent::DayVotingOpen);

        let Some(Message::Text(first)) = alice.recv().await else {
            panic!("alice should receive a text message");
        };
        assert!(first.contains("cupid_pick_required"));
        let Some(Message::Text(only)) = bob.recv().await else {
            panic!("bob should receive a text message");
        };
        assert!(only.contains("day_voting_open"));

        hub.unregister("bob");
        assert_eq!(hub.connection_count(), 1);
    }
}
