use tracing::{debug, info};

use crate::error::GameError;
use crate::models::{
    event::{Audience, ServerEvent},
    game::Game,
    role::Role,
    segment::SegmentType,
};
use crate::services::{
    cues::Cue,
    game_actions::GameActions,
    segments_manager::{HunterContext, SegmentsManager},
};

/// 参加者の判断を受け取り、ゲームを更新してフェーズを進めるかを決める
///
/// 判断ごとに作られ、セッションの各部品を借用する。
pub struct EventsActions<'a> {
    game: &'a mut Game,
    segments: &'a mut SegmentsManager,
    actions: &'a GameActions,
}

impl<'a> EventsActions<'a> {
    pub fn new(
        game: &'a mut Game,
        segments: &'a mut SegmentsManager,
        actions: &'a GameActions,
    ) -> Self {
        Self {
            game,
            segments,
            actions,
        }
    }

    fn expect_phase(&self, expected: SegmentType) -> Result<(), GameError> {
        if self.game.is_over() {
            return Err(GameError::GameOver);
        }
        let current = self.segments.active_segment();
        if current != Some(expected) {
            return Err(GameError::WrongPhase { expected, current });
        }
        Ok(())
    }

    pub async fn handle_lovers_pick(
        &mut self,
        cupid_id: &str,
        players: &[String],
    ) -> Result<(), GameError> {
        self.expect_phase(SegmentType::Cupid)?;
        self.game.require_special_role(cupid_id, Role::Cupid)?;
        let [first, second] = players else {
            return Err(GameError::InvalidLoversPick);
        };

        self.game.set_lovers(first, second)?;
        self.segments.finish_segment(self.game, self.actions).await
    }

    /// 恋人の2人ともが通知を閉じたら LOVERS を終える
    pub async fn handle_lover_closed_alert(&mut self, player_id: &str) -> Result<(), GameError> {
        self.expect_phase(SegmentType::Lovers)?;
        if !self.game.is_lover(player_id) {
            return Err(GameError::NotALover(player_id.to_string()));
        }

        let acknowledged = self.segments.lover_acknowledged(player_id);
        debug!("Lover {} closed the alert ({}/2)", player_id, acknowledged);
        if acknowledged >= 2 {
            self.segments.finish_segment(self.game, self.actions).await?;
        }
        Ok(())
    }

    pub async fn handle_werewolf_vote(
        &mut self,
        werewolf_id: &str,
        target_id: &str,
    ) -> Result<(), GameError> {
        self.expect_phase(SegmentType::Werewolf)?;
        self.game.handle_werewolf_vote(werewolf_id, target_id)?;
        self.after_werewolf_vote().await
    }

    pub async fn handle_werewolf_update_vote(
        &mut self,
        werewolf_id: &str,
        target_id: &str,
        old_target_id: &str,
    ) -> Result<(), GameError> {
        self.expect_phase(SegmentType::Werewolf)?;
        self.game
            .handle_werewolf_update_vote(werewolf_id, target_id, old_target_id)?;
        self.after_werewolf_vote().await
    }

    async fn after_werewolf_vote(&mut self) -> Result<(), GameError> {
        self.actions.broadcast_werewolf_votes(self.game);
        if !self.game.has_all_werewolves_agreed() {
            return Ok(());
        }

        self.game.handle_all_werewolves_agree()?;
        self.actions.werewolf_voting_complete(self.game);
        self.segments.finish_segment(self.game, self.actions).await
    }

    pub async fn handle_witch_heal(&mut self, witch_id: &str, heal: bool) -> Result<(), GameError> {
        self.expect_phase(SegmentType::WitchHeal)?;
        self.game.require_special_role(witch_id, Role::Witch)?;

        if heal {
            self.game.heal_werewolf_victim()?;
            self.segments.retire(SegmentType::WitchHeal);
        } else {
            info!("Witch skipped heal action");
        }
        self.segments.finish_segment(self.game, self.actions).await
    }

    pub async fn handle_witch_poison(
        &mut self,
        witch_id: &str,
        target_id: Option<&str>,
    ) -> Result<(), GameError> {
        self.expect_phase(SegmentType::WitchPoison)?;
        self.game.require_special_role(witch_id, Role::Witch)?;

        match target_id {
            Some(target_id) => {
                self.game.witch_kill(target_id)?;
                self.segments.retire(SegmentType::WitchPoison);
            }
            None => info!("Witch skipped poison action"),
        }
        self.segments.finish_segment(self.game, self.actions).await
    }

    /// 生存者全員の投票が揃ったら、最多得票者を即時に処刑する
    pub async fn handle_day_vote(&mut self, voter_id: &str, target_id: &str) -> Result<(), GameError> {
        self.expect_phase(SegmentType::Day)?;
        self.game.handle_day_vote(voter_id, target_id)?;

        if !self.game.has_all_players_voted() {
            return Ok(());
        }

        let (victim_id, vote_count) = match self.game.day_vote_target() {
            Ok(target) => target,
            Err(GameError::DayVoteTie(tied)) => {
                info!("Day vote tied between {:?}, voting again", tied);
                self.actions.reopen_day_voting(self.game);
                self.game.clear_day_votes();
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let victim_was_lover = self.game.is_lover(&victim_id);
        let deaths = self.game.eliminate_by_day_vote(&victim_id, vote_count)?;
        self.actions.announce_deaths(&deaths);
        self.segments.after_deaths(self.game);

        if victim_was_lover {
            self.actions.play(Cue::DayVoteLoverDeath).await;
        }

        let hunter_died = self
            .game
            .special_role_player(Role::Hunter)
            .map(|hunter| deaths.iter().any(|death| death.player_id == hunter.id))
            .unwrap_or(false);
        if hunter_died {
            return self
                .segments
                .run_hunter_segment(
                    HunterContext::DayVote,
                    &[Cue::DayVoteHunter],
                    self.game,
                    self.actions,
                )
                .await;
        }

        self.finish_day().await
    }

    async fn finish_day(&mut self) -> Result<(), GameError> {
        if self.segments.end_game_if_won(self.game, self.actions).await {
            return Ok(());
        }
        self.segments.finish_segment(self.game, self.actions).await
    }

    pub async fn handle_hunter_pick(&mut self, hunter_id: &str, target_id: &str) -> Result<(), GameError> {
        self.expect_phase(SegmentType::Hunter)?;
        let is_hunter = self
            .game
            .special_role_player(Role::Hunter)
            .map(|hunter| hunter.id == hunter_id)
            .unwrap_or(false);
        if !is_hunter {
            return Err(GameError::MissingRole {
                player_id: hunter_id.to_string(),
                role: Role::Hunter,
            });
        }

        self.game.kill_hunter_revenge(target_id)?;

        match self.segments.hunter_context() {
            Some(HunterContext::DayVote) => {
                let deaths = self.game.process_pending_deaths()?;
                self.actions.announce_deaths(&deaths);
                self.segments.after_deaths(self.game);
                self.finish_day().await
            }
            _ => {
                self.segments
                    .continue_day_action(self.game, self.actions)
                    .await
            }
        }
    }

    pub fn handle_get_players_list(&self, player_id: &str) {
        self.actions.notify(
            Audience::Player(player_id.to_string()),
            ServerEvent::PlayersList {
                players: self.game.client_player_list(),
            },
        );
    }
}
