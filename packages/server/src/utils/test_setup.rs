use async_trait::async_trait;
use dotenvy::dotenv;
use std::sync::{Mutex, Once};

use crate::models::event::{Audience, ServerEvent};
use crate::services::cues::{Cue, CueError, CuePlayer};
use crate::services::notifier::Notifier;

static INIT: Once = Once::new();

pub fn setup_test_env() {
    INIT.call_once(|| {
        dotenv().ok();
        // RUST_LOG が無い場合は warn 以上のみ出力する
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// 送信された通知を記録するだけの Notifier
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Audience, ServerEvent)>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<(Audience, ServerEvent)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(|(_, event)| event.name()).collect()
    }

    /// 指定したプレイヤーに届いた通知
    pub fn received_by(&self, player_id: &str) -> Vec<ServerEvent> {
        self.events()
            .into_iter()
            .filter(|(audience, _)| audience.includes(player_id))
            .map(|(_, event)| event)
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.names().iter().filter(|n| **n == name).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, audience: Audience, event: ServerEvent) {
        self.sent.lock().unwrap().push((audience, event));
    }
}

/// 再生要求を記録するだけの CuePlayer
#[derive(Default)]
pub struct RecordingCuePlayer {
    played: Mutex<Vec<Cue>>,
}

impl RecordingCuePlayer {
    pub fn cues(&self) -> Vec<Cue> {
        self.played.lock().unwrap().clone()
    }

    pub fn position(&self, cue: Cue) -> Option<usize> {
        self.cues().iter().position(|played| *played == cue)
    }
}

#[async_trait]
impl CuePlayer for RecordingCuePlayer {
    async fn play(&self, cue: Cue) -> Result<(), CueError> {
        self.played.lock().unwrap().push(cue);
        Ok(())
    }
}
