use std::sync::Arc;
use tracing::{info, warn};

use crate::error::GameError;
use crate::models::{
    config::GameConfig,
    death::DeathInfo,
    event::{Audience, ServerEvent},
    game::Game,
    role::{Role, Team},
    segment::SegmentType,
};
use crate::services::{
    cues::{Cue, CuePlayer},
    notifier::Notifier,
    timers::Timers,
};

/// 各フェーズの開始時に行うこと（誰に何を促し、何を配信するか）
///
/// ゲームの状態は読むだけで書き換えない。
pub struct GameActions {
    notifier: Arc<dyn Notifier>,
    cues: Arc<dyn CuePlayer>,
    config: Arc<GameConfig>,
    timers: Timers,
}

impl GameActions {
    pub fn new(
        config: Arc<GameConfig>,
        notifier: Arc<dyn Notifier>,
        cues: Arc<dyn CuePlayer>,
    ) -> Self {
        Self {
            notifier,
            cues,
            config,
            timers: Timers::new(),
        }
    }

    pub fn notify(&self, audience: Audience, event: ServerEvent) {
        self.notifier.notify(audience, event);
    }

    /// 予約済みの通知と再生中のキューを全て取り消し、新しいタイマーに切り替える
    pub fn reset_timers(&mut self) {
        self.timers.cancel_all();
        self.timers = Timers::new();
    }

    // ---- 音声キュー ----

    /// キューの再生を待つ。失敗はログに残して続行する
    pub async fn play(&self, cue: Cue) {
        if let Err(e) = self.cues.play(cue).await {
            warn!("Failed to play cue {:?}: {}", cue, e);
        }
    }

    pub fn play_detached(&self, cue: Cue) {
        let cues = self.cues.clone();
        self.timers.spawn(async move {
            if let Err(e) = cues.play(cue).await {
                warn!("Failed to play cue {:?}: {}", cue, e);
            }
        });
    }

    /// LOVERS と DAY の開始キューは待たない
    pub async fn play_segment_start(&self, kind: SegmentType, game: &Game) {
        let cue = Cue::segment_start(kind, !game.death_queue().is_empty());
        match kind {
            SegmentType::Lovers | SegmentType::Day => self.play_detached(cue),
            _ => self.play(cue).await,
        }
    }

    pub async fn play_segment_end(&self, kind: SegmentType) {
        self.play(Cue::SegmentEnd(kind)).await;
    }

    // ---- フェーズ開始時の処理 ----

    pub fn phase_changed(&self, from: Option<SegmentType>, to: SegmentType) {
        info!("Phase change: {:?} -> {}", from, to);
        self.notify(Audience::Everyone, ServerEvent::PhaseChanged { from, to });
    }

    pub fn cupid_action(&self, game: &Game) -> Result<(), GameError> {
        let cupid = game
            .special_role_player(Role::Cupid)
            .ok_or(GameError::MissingSpecialRole(Role::Cupid))?;
        self.notify(
            Audience::Player(cupid.id.clone()),
            ServerEvent::CupidPickRequired,
        );
        Ok(())
    }

    pub fn lovers_action(&self, game: &Game) {
        let Some((first, second)) = game.lovers() else {
            warn!("Lovers phase started without lovers");
            return;
        };

        for (lover, partner) in [(first, second), (second, first)] {
            self.timers.schedule(
                self.config.lover_reveal_delay,
                self.notifier.clone(),
                Audience::Player(lover.id.clone()),
                ServerEvent::PlayerIsLover {
                    partner_name: partner.name.clone(),
                },
            );
            // ダッシュボード用: 閉じるボタンを有効にするまでの待ち時間
            self.timers.schedule(
                self.config.lover_close_delay,
                self.notifier.clone(),
                Audience::Player(lover.id.clone()),
                ServerEvent::LoversCanCloseAlert,
            );
        }
    }

    pub fn werewolf_action(&self, game: &Game) {
        let werewolves = game.living_werewolf_ids();
        self.notify(
            Audience::Group(werewolves),
            ServerEvent::WerewolfPickRequired,
        );
        self.broadcast_werewolf_votes(game);
    }

    pub fn broadcast_werewolf_votes(&self, game: &Game) {
        self.notify(
            Audience::Group(game.living_werewolf_ids()),
            ServerEvent::WerewolfCurrentVotes {
                tallies: game.werewolf_vote_tallies(),
            },
        );
    }

    pub fn werewolf_voting_complete(&self, game: &Game) {
        self.notify(
            Audience::Group(game.living_werewolf_ids()),
            ServerEvent::WerewolfVotingComplete,
        );
    }

    pub fn villagers_list(&self, game: &Game) {
        self.notify(
            Audience::Group(game.living_werewolf_ids()),
            ServerEvent::VillagersList {
                villagers: game.villagers_list(),
            },
        );
    }

    /// 人狼の合意前に呼ぶのは呼び出し側の順序バグ
    pub fn witch_heal_action(&self, game: &Game) -> Result<(), GameError> {
        let witch = game
            .special_role_player(Role::Witch)
            .ok_or(GameError::MissingSpecialRole(Role::Witch))?;
        let victim_id = game.werewolf_target().ok_or(GameError::NoWerewolfConsensus)?;

        self.notify(
            Audience::Player(witch.id.clone()),
            ServerEvent::WitchCanHeal { victim_id },
        );
        Ok(())
    }

    pub fn witch_poison_action(&self, game: &Game) -> Result<(), GameError> {
        let witch = game
            .special_role_player(Role::Witch)
            .ok_or(GameError::MissingSpecialRole(Role::Witch))?;
        self.notify(
            Audience::Player(witch.id.clone()),
            ServerEvent::WitchPickPoisonPlayer,
        );
        Ok(())
    }

    pub fn announce_deaths(&self, deaths: &[DeathInfo]) {
        for death in deaths {
            info!(
                "Announcing death: Player {} died from {}",
                death.player_id, death.cause
            );
        }
        self.notify(
            Audience::Everyone,
            ServerEvent::DeathsAnnounced {
                deaths: deaths.to_vec(),
            },
        );
        for death in deaths {
            self.notify(
                Audience::Player(death.player_id.clone()),
                ServerEvent::PlayerIsDead,
            );
            self.notify(
                Audience::Everyone,
                ServerEvent::PlayerDied {
                    player_id: death.player_id.clone(),
                },
            );
        }
    }

    pub fn open_day_voting(&self) {
        self.timers.schedule(
            self.config.day_vote_delay,
            self.notifier.clone(),
            Audience::Everyone,
            ServerEvent::DayVotingOpen,
        );
    }

    /// 同数首位のため再投票
    pub fn reopen_day_voting(&self, game: &Game) {
        self.notify(
            Audience::Everyone,
            ServerEvent::DayVoteTied {
                tallies: game.day_vote_tallies(),
            },
        );
        self.notify(Audience::Everyone, ServerEvent::DayVotingOpen);
    }

    pub fn hunter_action(&self, game: &Game) -> Result<(), GameError> {
        let hunter = game
            .special_role_player(Role::Hunter)
            .ok_or(GameError::MissingSpecialRole(Role::Hunter))?;
        self.timers.schedule(
            self.config.hunter_prompt_delay,
            self.notifier.clone(),
            Audience::Everyone,
            ServerEvent::HunterPickRequired {
                hunter_id: hunter.id.clone(),
            },
        );
        Ok(())
    }

    /// 勝者と敗者それぞれに結果を通知する
    pub async fn alert_winners_and_losers(&self, game: &Game, winner: Team) {
        info!("Game over, {} won", winner);
        self.play(Cue::Winner(winner)).await;
        self.notify(
            Audience::Group(game.team_ids(winner)),
            ServerEvent::GameWon { team: winner },
        );
        self.notify(
            Audience::Group(game.team_ids(winner.opponent())),
            ServerEvent::GameLost { team: winner },
        );
    }
}

impl Drop for GameActions {
    fn drop(&mut self) {
        self.timers.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::death::DeathCause;
    use crate::utils::test_setup::{RecordingCuePlayer, RecordingNotifier};
    use std::time::Duration;

    fn setup(config: GameConfig) -> (GameActions, Arc<RecordingNotifier>, Arc<RecordingCuePlayer>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let cues = Arc::new(RecordingCuePlayer::default());
        let actions = GameActions::new(Arc::new(config), notifier.clone(), cues.clone());
        (actions, notifier, cues)
    }

    fn game_with(roles: &[(&str, Role)]) -> Game {
        let mut game = Game::new();
        for (id, _) in roles {
            game.add_player(id, &format!("Name-{}", id)).unwrap();
        }
        for (id, role) in roles {
            game.assign_role(id, *role).unwrap();
        }
        game
    }

    #[test]
    fn witch_heal_before_consensus_fails_loudly() {
        let (actions, notifier, _) = setup(GameConfig::immediate());
        let game = game_with(&[("witch", Role::Witch), ("w", Role::Werewolf)]);
        assert_eq!(
            actions.witch_heal_action(&game),
            Err(GameError::NoWerewolfConsensus)
        );
        assert!(notifier.events().is_empty());
    }

    #[test]
    fn werewolf_prompt_only_reaches_living_werewolves() {
        let (actions, notifier, _) = setup(GameConfig::immediate());
        let game = game_with(&[
            ("w1", Role::Werewolf),
            ("w2", Role::Werewolf),
            ("v", Role::Villager),
        ]);
        actions.werewolf_action(&game);

        assert_eq!(
            notifier.names(),
            vec!["werewolf_pick_required", "werewolf_current_votes"]
        );
        assert!(notifier.received_by("v").is_empty());
        assert_eq!(notifier.received_by("w2").len(), 2);
    }

    #[test]
    fn each_death_alerts_the_dead_player() {
        let (actions, notifier, _) = setup(GameConfig::immediate());
        let mut game = game_with(&[("a", Role::Villager), ("w", Role::Werewolf)]);
        game.add_pending_death("a", DeathCause::Werewolves).unwrap();
        let deaths = game.process_pending_deaths().unwrap();

        actions.announce_deaths(&deaths);
        assert_eq!(
            notifier.names(),
            vec!["deaths_announced", "player_is_dead", "player_died"]
        );
        assert!(notifier.received_by("a").contains(&ServerEvent::PlayerIsDead));
    }

    #[tokio::test(start_paused = true)]
    async fn lovers_are_revealed_after_delay() {
        let (actions, notifier, _) = setup(GameConfig::default());
        let mut game = game_with(&[("a", Role::Villager), ("b", Role::Cupid)]);
        game.set_lovers("a", "b").unwrap();

        actions.lovers_action(&game);
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(notifier.count("lovers_can_close_alert"), 2);
        assert_eq!(notifier.count("player_is_lover"), 0);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(notifier.received_by("a").contains(&ServerEvent::PlayerIsLover {
            partner_name: "Name-b".to_string()
        }));
    }

    #[tokio::test]
    async fn winners_and_losers_get_their_own_alert() {
        let (actions, notifier, cues) = setup(GameConfig::immediate());
        let game = game_with(&[("w", Role::Werewolf), ("v", Role::Villager)]);

        actions
            .alert_winners_and_losers(&game, Team::Villagers)
            .await;
        assert_eq!(cues.cues(), vec![Cue::Winner(Team::Villagers)]);
        assert_eq!(
            notifier.received_by("v"),
            vec![ServerEvent::GameWon {
                team: Team::Villagers
            }]
        );
        assert_eq!(
            notifier.received_by("w"),
            vec![ServerEvent::GameLost {
                team: Team::Villagers
            }]
        );
    }
}
