use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::models::{config::GameConfig, role::Team, segment::SegmentType};

/// フェーズ遷移の演出に使う音声キュー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    SegmentStart(SegmentType),
    SegmentEnd(SegmentType),
    DeathAnnouncement { any_deaths: bool },
    Hunter,
    PostHunter,
    LoverDeath,
    PartnerIsHunter,
    HunterIsLover,
    DayVoteLoverDeath,
    DayVoteHunter,
    Winner(Team),
}

impl Cue {
    /// アセットディレクトリからの相対パス（拡張子なし）
    pub fn asset(&self) -> Option<&'static str> {
        let asset = match self {
            Cue::SegmentStart(kind) => match kind {
                SegmentType::Cupid => "Cupidon/Cupidon-1",
                SegmentType::Lovers => "Lovers/combined_lover",
                SegmentType::Werewolf => "Werewolves/Werewolves-1",
                SegmentType::WitchHeal => "Witch/Witch-wake-up",
                SegmentType::WitchPoison => "Witch/Witch-poison",
                SegmentType::Day => "Night-end/combined_audio",
                SegmentType::Hunter => return None,
            },
            Cue::SegmentEnd(kind) => match kind {
                SegmentType::Cupid => "Cupidon/Cupidon-2",
                SegmentType::Lovers => "Lovers/Lover-3",
                SegmentType::Werewolf => "Werewolves/Werewolves-2",
                SegmentType::WitchPoison => "Witch/Witch-end",
                SegmentType::Day => "Day-vote/Vote-Death",
                SegmentType::WitchHeal | SegmentType::Hunter => return None,
            },
            Cue::DeathAnnouncement { any_deaths: true } => "Night-end/combined_audio",
            Cue::DeathAnnouncement { any_deaths: false } => "Night-end/No-deaths-with-start",
            Cue::Hunter => "Hunter/Hunter-1",
            Cue::PostHunter => "Hunter/Hunter-2",
            Cue::LoverDeath => "Lovers/Lover-death",
            Cue::PartnerIsHunter => "Lovers/Second-lover-is-hunter",
            Cue::HunterIsLover => "Hunter/Hunter-is-lover",
            Cue::DayVoteLoverDeath => "Day-vote/Lovers-death",
            Cue::DayVoteHunter => "Day-vote/Hunter-has-partner",
            Cue::Winner(Team::Villagers) => "End-game/Villagers-won",
            Cue::Winner(Team::Werewolves) => "End-game/Werewolves-won",
        };
        Some(asset)
    }

    /// フェーズ開始時のキュー。昼は死亡待ちの有無で変わる
    pub fn segment_start(kind: SegmentType, any_deaths: bool) -> Cue {
        match kind {
            SegmentType::Day => Cue::DeathAnnouncement { any_deaths },
            _ => Cue::SegmentStart(kind),
        }
    }
}

#[derive(Debug, Error)]
pub enum CueError {
    #[error("audio file not found: {0}")]
    Missing(PathBuf),
    #[error("failed to launch audio player: {0}")]
    Io(#[from] std::io::Error),
    #[error("audio player exited with {0}")]
    PlayerFailed(std::process::ExitStatus),
}

/// 音声キューの再生先。失敗してもゲーム進行は止めない
#[async_trait]
pub trait CuePlayer: Send + Sync {
    async fn play(&self, cue: Cue) -> Result<(), CueError>;
}

/// 外部コマンド（例: mpg123）でアセットを再生する
pub struct CommandCuePlayer {
    asset_dir: PathBuf,
    command: Option<String>,
}

impl CommandCuePlayer {
    pub fn new(asset_dir: PathBuf, command: Option<String>) -> Self {
        Self { asset_dir, command }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(config.cue_dir.clone(), config.cue_command.clone())
    }

    fn resolve(&self, asset: &str) -> PathBuf {
        self.asset_dir.join(format!("{}.mp3", asset))
    }
}

#[async_trait]
impl CuePlayer for CommandCuePlayer {
    async fn play(&self, cue: Cue) -> Result<(), CueError> {
        let Some(asset) = cue.asset() else {
            debug!("No audio defined for {:?}", cue);
            return Ok(());
        };

        let path = self.resolve(asset);
        if !path.exists() {
            return Err(CueError::Missing(path));
        }

        let Some(command) = &self.command else {
            info!("Playing audio: {}", path.display());
            return Ok(());
        };

        let status = Command::new(command).arg(&path).status().await?;
        if !status.success() {
            return Err(CueError::PlayerFailed(status));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn witch_heal_has_no_ending_cue() {
        assert_eq!(Cue::SegmentEnd(SegmentType::WitchHeal).asset(), None);
        assert_eq!(
            Cue::SegmentEnd(SegmentType::WitchPoison).asset(),
            Some("Witch/Witch-end")
        );
    }

    #[test]
    fn day_start_depends_on_pending_deaths() {
        assert_eq!(
            Cue::segment_start(SegmentType::Day, false).asset(),
            Some("Night-end/No-deaths-with-start")
        );
        assert_eq!(
            Cue::segment_start(SegmentType::Day, true).asset(),
            Some("Night-end/combined_audio")
        );
        assert_eq!(
            Cue::segment_start(SegmentType::Cupid, true),
            Cue::SegmentStart(SegmentType::Cupid)
        );
    }

    #[tokio::test]
    async fn missing_asset_is_reported() {
        let player = CommandCuePlayer::new(PathBuf::from("/nonexistent-cues"), None);
        let result = player.play(Cue::Hunter).await;
        assert!(matches!(result, Err(CueError::Missing(_))));
    }
}
