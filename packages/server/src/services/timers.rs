use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::models::event::{Audience, ServerEvent};
use crate::services::notifier::Notifier;

/// セッション単位の遅延通知。リセット時にまとめて取り消す
#[derive(Debug, Clone, Default)]
pub struct Timers {
    token: CancellationToken,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取り消されない限り、`delay` 後に通知する。待ち時間 0 なら即時に送る
    pub fn schedule(
        &self,
        delay: Duration,
        notifier: Arc<dyn Notifier>,
        audience: Audience,
        event: ServerEvent,
    ) {
        if delay.is_zero() {
            notifier.notify(audience, event);
            return;
        }

        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Timer for {} cancelled", event.name());
                }
                _ = tokio::time::sleep(delay) => {
                    notifier.notify(audience, event);
                }
            }
        });
    }

    /// 待たずに実行するタスク（取り消し可能）
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = task => {}
            }
        });
    }

    pub fn cancel_all(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_setup::RecordingNotifier;

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let notifier = Arc::new(RecordingNotifier::default());
        let timers = Timers::new();
        timers.schedule(
            Duration::from_secs(7),
            notifier.clone(),
            Audience::Everyone,
            ServerEvent::DayVotingOpen,
        );

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(notifier.events().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(notifier.names(), vec!["day_voting_open"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timers_never_fire() {
        let notifier = Arc::new(RecordingNotifier::default());
        let timers = Timers::new();
        timers.schedule(
            Duration::from_secs(18),
            notifier.clone(),
            Audience::Everyone,
            ServerEvent::HunterPickRequired {
                hunter_id: "h".to_string(),
            },
        );

        timers.cancel_all();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(notifier.events().is_empty());
        assert!(timers.is_cancelled());
    }

    #[tokio::test]
    async fn zero_delay_is_immediate() {
        let notifier = Arc::new(RecordingNotifier::default());
        Timers::new().schedule(
            Duration::ZERO,
            notifier.clone(),
            Audience::Player("p1".to_string()),
            ServerEvent::LoversCanCloseAlert,
        );
        assert_eq!(notifier.names(), vec!["lovers_can_close_alert"]);
    }
}
