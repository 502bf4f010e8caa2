use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::GameError;
use crate::models::{
    config::GameConfig,
    event::{Audience, PlayerDecision, ServerEvent},
    game::{Game, GameSnapshot},
    segment::SegmentType,
};
use crate::services::{
    cues::CuePlayer, events_actions::EventsActions, game_actions::GameActions,
    notifier::Notifier, segments_manager::SegmentsManager,
};

/// 1ゲーム分の状態と進行をまとめたセッション
///
/// タイマーはセッションに属し、`reset` と破棄の際に全て取り消される。
pub struct GameSession {
    config: Arc<GameConfig>,
    game: Game,
    segments: SegmentsManager,
    actions: GameActions,
    started: bool,
}

#[derive(Serialize, Debug, Clone)]
pub struct SessionSnapshot {
    pub started: bool,
    pub active_segment: Option<SegmentType>,
    pub game: GameSnapshot,
}

impl GameSession {
    pub fn new(
        config: Arc<GameConfig>,
        notifier: Arc<dyn Notifier>,
        cues: Arc<dyn CuePlayer>,
    ) -> Self {
        let actions = GameActions::new(config.clone(), notifier, cues);
        Self {
            config,
            game: Game::new(),
            segments: SegmentsManager::new(),
            actions,
            started: false,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn segments(&self) -> &SegmentsManager {
        &self.segments
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn active_segment(&self) -> Option<SegmentType> {
        self.segments.active_segment()
    }

    /// ゲーム開始前の参加。規定人数に達したら自動で開始する
    pub async fn join(&mut self, player_id: &str, name: &str) -> Result<(), GameError> {
        if self.started {
            return Err(GameError::GameAlreadyStarted);
        }

        let player = self.game.add_player(player_id, name)?.list_item();
        self.actions.notify(
            Audience::Player(player_id.to_string()),
            ServerEvent::PlayerData {
                player: player.clone(),
            },
        );
        self.actions
            .notify(Audience::Everyone, ServerEvent::PlayerJoined { player });

        let auto_start = self.config.auto_start_players;
        if auto_start > 0 && self.game.players().len() == auto_start {
            info!("Player count reached {}, starting the game", auto_start);
            self.start().await?;
        }
        Ok(())
    }

    pub async fn start(&mut self) -> Result<(), GameError> {
        self.start_with(|game| game.assign_roles(&mut rand::thread_rng()))
            .await
    }

    /// 役職の割り当て方法を指定して開始する
    pub async fn start_with<F>(&mut self, assign: F) -> Result<(), GameError>
    where
        F: FnOnce(&mut Game) -> Result<(), GameError>,
    {
        if self.started {
            return Err(GameError::GameAlreadyStarted);
        }

        assign(&mut self.game)?;
        self.started = true;

        for player in self.game.players() {
            if let Some(role) = player.role {
                self.actions.notify(
                    Audience::Player(player.id.clone()),
                    ServerEvent::RoleAssigned { role },
                );
            }
        }
        self.actions.villagers_list(&self.game);

        if self
            .segments
            .end_game_if_won(&mut self.game, &self.actions)
            .await
        {
            return Ok(());
        }
        self.segments
            .start_game(&mut self.game, &self.actions)
            .await
    }

    /// 参加者の判断を1件処理する。失敗した判断は状態を変えない
    pub async fn handle(&mut self, sender: &str, decision: PlayerDecision) -> Result<(), GameError> {
        info!("Decision from {}: {:?}", sender, decision);

        match decision {
            PlayerDecision::Join { name } => return self.join(sender, &name).await,
            PlayerDecision::GetPlayersList => {
                self.events().handle_get_players_list(sender);
                return Ok(());
            }
            _ => {}
        }

        if !self.started {
            return Err(GameError::GameNotStarted);
        }
        if self.game.player(sender).is_err() {
            return Err(GameError::NotAPlayer(sender.to_string()));
        }

        let mut events = self.events();
        match decision {
            PlayerDecision::Join { .. } | PlayerDecision::GetPlayersList => Ok(()),
            PlayerDecision::LoversPick { players } => {
                events.handle_lovers_pick(sender, &players).await
            }
            PlayerDecision::LoverClosedAlert => events.handle_lover_closed_alert(sender).await,
            PlayerDecision::WerewolfVote { target } => {
                events.handle_werewolf_vote(sender, &target).await
            }
            PlayerDecision::WerewolfUpdateVote { target, old_target } => {
                events
                    .handle_werewolf_update_vote(sender, &target, &old_target)
                    .await
            }
            PlayerDecision::WitchHeal { heal } => events.handle_witch_heal(sender, heal).await,
            PlayerDecision::WitchPoison { target } => {
                events.handle_witch_poison(sender, target.as_deref()).await
            }
            PlayerDecision::DayVote { target } => events.handle_day_vote(sender, &target).await,
            PlayerDecision::HunterPick { target } => {
                events.handle_hunter_pick(sender, &target).await
            }
        }
    }

    fn events(&mut self) -> EventsActions<'_> {
        EventsActions::new(&mut self.game, &mut self.segments, &self.actions)
    }

    fn ensure_running(&self) -> Result<(), GameError> {
        if !self.started {
            return Err(GameError::GameNotStarted);
        }
        if self.game.is_over() {
            return Err(GameError::GameOver);
        }
        Ok(())
    }

    /// 判断を待たずに現在のフェーズを終える（管理者用）
    pub async fn next_segment(&mut self) -> Result<(), GameError> {
        self.ensure_running()?;
        warn!(
            "Forcing segment {:?} to finish",
            self.segments.active_segment()
        );
        self.segments
            .finish_segment(&mut self.game, &self.actions)
            .await
    }

    /// 任意のフェーズへ移動する（管理者のシナリオ確認用）
    pub async fn jump_to(&mut self, kind: SegmentType) -> Result<(), GameError> {
        self.ensure_running()?;
        warn!("Jumping to segment {}", kind);
        self.segments
            .jump_to(kind, &mut self.game, &self.actions)
            .await
    }

    /// 予約済みのタイマーを全て取り消してから、新しいゲームに置き換える
    pub fn reset(&mut self) {
        info!("Resetting game session");
        self.actions.reset_timers();
        self.game = Game::new();
        self.segments = SegmentsManager::new();
        self.started = false;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            started: self.started,
            active_segment: self.segments.active_segment(),
            game: self.game.snapshot(),
        }
    }
}
