use crate::models::event::{Audience, ServerEvent};

/// 参加者への通知の送り先
///
/// 宛先ごとの配送は信頼でき、順序が保たれる前提。配送の失敗は実装側でログに残し、
/// ゲームの状態には影響させない。
pub trait Notifier: Send + Sync {
    fn notify(&self, audience: Audience, event: ServerEvent);
}
