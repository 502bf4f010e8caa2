use std::collections::HashSet;
use tracing::{debug, info};

use crate::error::GameError;
use crate::models::{
    game::Game,
    role::Role,
    segment::{Segment, SegmentTrigger, SegmentType},
};
use crate::services::{
    cues::Cue, game_actions::GameActions, special_scenarios::SpecialScenario,
};

/// 狩人の道連れがどの場面で発生したか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HunterContext {
    /// 夜明けの死亡処理の前（道連れはキューに積まれ、昼の処理で確定する）
    Dawn,
    /// 昼の投票で処刑された（道連れは即時に確定する）
    DayVote,
}

/// フェーズ開始処理の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    /// 参加者の判断を待つ
    Await,
    /// 判断不要のため次のフェーズへ進む
    Continue,
    GameOver,
}

/// 夜と昼のフェーズを進める状態機械
///
/// フェーズ一覧は固定で、実行中に変わるのは `skip` だけ。CUPID と LOVERS は一巡目の後、
/// 魔女のフェーズは魔女の死亡または薬の使用で恒久的にスキップされる。人狼の合意や
/// 昼の投票にはタイムアウトが無く、判断が揃うまで待ち続ける（管理者の
/// `next_segment` で強制的に進められる）。
#[derive(Debug)]
pub struct SegmentsManager {
    segments: Vec<Segment>,
    current: usize,
    active: Option<SegmentType>,
    hunter_context: Option<HunterContext>,
    lovers_acknowledged: HashSet<String>,
}

impl Default for SegmentsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentsManager {
    pub fn new() -> Self {
        Self {
            segments: SegmentType::ORDER.into_iter().map(Segment::new).collect(),
            current: 0,
            active: None,
            hunter_context: None,
            lovers_acknowledged: HashSet::new(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// 参加者の判断を受け付けているフェーズ
    pub fn active_segment(&self) -> Option<SegmentType> {
        self.active
    }

    /// カーソルが指しているフェーズ（狩人の割り込み中も DAY のまま）
    pub fn current_segment_type(&self) -> SegmentType {
        self.segments[self.current].kind
    }

    pub fn is_started(&self) -> bool {
        self.active.is_some()
    }

    pub fn hunter_context(&self) -> Option<HunterContext> {
        self.hunter_context
    }

    pub fn is_retired(&self, kind: SegmentType) -> bool {
        self.segments[kind.index()].skip
    }

    /// フェーズを恒久的にスキップする
    pub fn retire(&mut self, kind: SegmentType) {
        debug!("Retiring segment {}", kind);
        self.segments[kind.index()].skip = true;
    }

    pub fn witch_died(&mut self) {
        self.retire(SegmentType::WitchHeal);
        self.retire(SegmentType::WitchPoison);
    }

    fn mark_first_night_segment(&mut self) {
        if self.current_segment_type().is_first_night_only() {
            self.segments[self.current].skip = true;
        }
    }

    /// カーソルをスキップされていないフェーズまで進める。末尾を越えたら先頭に戻る
    pub fn find_valid_segment(&mut self) {
        self.current = self.next_valid_index(self.current);
    }

    fn next_valid_index(&self, from: usize) -> usize {
        let len = self.segments.len();
        (0..len)
            .map(|offset| (from + offset) % len)
            .find(|index| !self.segments[*index].skip)
            .unwrap_or(from % len)
    }

    /// 状態 × きっかけ -> 次の状態
    pub fn transition(&self, from: SegmentType, trigger: SegmentTrigger) -> SegmentType {
        match (from, trigger) {
            (SegmentType::Day, SegmentTrigger::HunterDown) => SegmentType::Hunter,
            (SegmentType::Hunter, SegmentTrigger::HunterResolved) => SegmentType::Day,
            (_, SegmentTrigger::Completed) => {
                let after = if from == SegmentType::Hunter {
                    SegmentType::Day.index() + 1
                } else {
                    from.index() + 1
                };
                self.segments[self.next_valid_index(after)].kind
            }
            (from, _) => from,
        }
    }

    pub fn lover_acknowledged(&mut self, player_id: &str) -> usize {
        self.lovers_acknowledged.insert(player_id.to_string());
        self.lovers_acknowledged.len()
    }

    fn enter(&mut self, kind: SegmentType, actions: &GameActions) {
        actions.phase_changed(self.active, kind);
        self.active = Some(kind);
    }

    // ---- 進行 ----

    /// 配役済みのゲームを最初のフェーズから始める
    pub async fn start_game(
        &mut self,
        game: &mut Game,
        actions: &GameActions,
    ) -> Result<(), GameError> {
        if game.special_role_player(Role::Cupid).is_none() {
            self.retire(SegmentType::Cupid);
            self.retire(SegmentType::Lovers);
        }
        if game.special_role_player(Role::Witch).is_none() {
            self.witch_died();
        }

        self.current = 0;
        self.find_valid_segment();
        self.play_segment(game, actions).await
    }

    /// 現在のフェーズを開始する。判断が不要なフェーズは続けて次へ進める
    pub async fn play_segment(
        &mut self,
        game: &mut Game,
        actions: &GameActions,
    ) -> Result<(), GameError> {
        loop {
            if game.is_over() {
                return Ok(());
            }
            match self.run_current(game, actions).await? {
                Flow::Await | Flow::GameOver => return Ok(()),
                Flow::Continue => self.complete_current(actions).await,
            }
        }
    }

    /// 現在のフェーズを終えて次のフェーズを開始する
    pub async fn finish_segment(
        &mut self,
        game: &mut Game,
        actions: &GameActions,
    ) -> Result<(), GameError> {
        self.complete_current(actions).await;
        self.play_segment(game, actions).await
    }

    async fn complete_current(&mut self, actions: &GameActions) {
        let kind = self.current_segment_type();
        actions.play_segment_end(kind).await;
        self.mark_first_night_segment();
        self.hunter_context = None;

        let next = self.transition(kind, SegmentTrigger::Completed);
        debug!("Segment {} completed, next is {}", kind, next);
        self.current = next.index();
    }

    /// 指定したフェーズへ移動して開始する（管理者のデバッグ用）
    pub async fn jump_to(
        &mut self,
        kind: SegmentType,
        game: &mut Game,
        actions: &GameActions,
    ) -> Result<(), GameError> {
        if kind == SegmentType::Hunter {
            self.current = SegmentType::Day.index();
            return self
                .run_hunter_segment(HunterContext::Dawn, &[Cue::Hunter], game, actions)
                .await;
        }
        self.hunter_context = None;
        self.current = kind.index();
        self.play_segment(game, actions).await
    }

    async fn run_current(
        &mut self,
        game: &mut Game,
        actions: &GameActions,
    ) -> Result<Flow, GameError> {
        let kind = self.current_segment_type();
        info!("[SEGMENT] Playing segment: {}", kind);

        if kind == SegmentType::Day {
            return self.run_day_segment(game, actions).await;
        }

        match kind {
            SegmentType::Cupid => {
                let Some(cupid) = game.special_role_player(Role::Cupid) else {
                    return Ok(Flow::Continue);
                };
                if !cupid.is_alive {
                    return Ok(Flow::Continue);
                }
                self.enter(kind, actions);
                actions.play_segment_start(kind, game).await;
                actions.cupid_action(game)?;
            }
            SegmentType::Lovers => {
                if game.lovers().is_none() {
                    return Ok(Flow::Continue);
                }
                self.enter(kind, actions);
                self.lovers_acknowledged.clear();
                actions.play_segment_start(kind, game).await;
                actions.lovers_action(game);
            }
            SegmentType::Werewolf => {
                self.enter(kind, actions);
                game.clear_werewolf_votes();
                actions.play_segment_start(kind, game).await;
                actions.werewolf_action(game);
            }
            SegmentType::WitchHeal => {
                if !self.witch_can_act(game) {
                    return Ok(Flow::Continue);
                }
                if !game.can_witch_heal() {
                    self.retire(kind);
                    return Ok(Flow::Continue);
                }
                if !game.has_all_werewolves_agreed() {
                    info!("Werewolves reached no agreement, nothing for the witch to heal");
                    return Ok(Flow::Continue);
                }
                self.enter(kind, actions);
                actions.play_segment_start(kind, game).await;
                actions.witch_heal_action(game)?;
            }
            SegmentType::WitchPoison => {
                if !self.witch_can_act(game) {
                    return Ok(Flow::Continue);
                }
                if !game.can_witch_poison() {
                    self.retire(kind);
                    return Ok(Flow::Continue);
                }
                self.enter(kind, actions);
                actions.play_segment_start(kind, game).await;
                actions.witch_poison_action(game)?;
            }
            SegmentType::Day | SegmentType::Hunter => return Ok(Flow::Continue),
        }

        Ok(Flow::Await)
    }

    fn witch_can_act(&mut self, game: &Game) -> bool {
        let alive = game
            .special_role_player(Role::Witch)
            .map(|witch| witch.is_alive)
            .unwrap_or(false);
        if !alive {
            self.witch_died();
        }
        alive
    }

    /// 夜明け: 狩人 -> 恋人 -> 通常の順に割り込みを確認する
    async fn run_day_segment(
        &mut self,
        game: &mut Game,
        actions: &GameActions,
    ) -> Result<Flow, GameError> {
        let scenario = SpecialScenario::at_dawn(game);
        // 特殊な場面では通常の狩人・恋人の演出の代わりにその場面の演出を流す
        let narration = scenario.map(SpecialScenario::cues).unwrap_or(&[Cue::Hunter]);

        if game.hunter_is_in_death_queue() {
            return self
                .run_hunter_segment(HunterContext::Dawn, narration, game, actions)
                .await
                .map(|_| Flow::Await);
        }

        if game.is_one_of_lovers_in_death_queue() {
            if let Some(scenario) = scenario {
                info!("Special scenario: {:?}", scenario);
                return self
                    .run_hunter_segment(HunterContext::Dawn, narration, game, actions)
                    .await
                    .map(|_| Flow::Await);
            }

            self.enter(SegmentType::Day, actions);
            actions.play(Cue::LoverDeath).await;
            return self.day_action(game, actions).await;
        }

        self.enter(SegmentType::Day, actions);
        actions.play_segment_start(SegmentType::Day, game).await;
        self.day_action(game, actions).await
    }

    /// 死亡を確定して発表し、勝敗を判定してから昼の投票を開く
    async fn day_action(
        &mut self,
        game: &mut Game,
        actions: &GameActions,
    ) -> Result<Flow, GameError> {
        let deaths = game.process_pending_deaths()?;
        actions.announce_deaths(&deaths);
        self.after_deaths(game);

        if self.end_game_if_won(game, actions).await {
            return Ok(Flow::GameOver);
        }

        game.clear_day_votes();
        actions.open_day_voting();
        Ok(Flow::Await)
    }

    /// 死亡処理の後始末（魔女が死んでいればそのフェーズを退役させる）
    pub fn after_deaths(&mut self, game: &Game) {
        let witch_dead = game
            .special_role_player(Role::Witch)
            .map(|witch| !witch.is_alive)
            .unwrap_or(false);
        if witch_dead {
            self.witch_died();
        }
    }

    pub async fn end_game_if_won(&mut self, game: &mut Game, actions: &GameActions) -> bool {
        let Some(winner) = game.check_if_winner() else {
            return false;
        };
        game.declare_winner(winner);
        actions.alert_winners_and_losers(game, winner).await;
        true
    }

    /// 狩人の道連れ選択を開く。選択が届くまで進まない
    pub async fn run_hunter_segment(
        &mut self,
        context: HunterContext,
        narration: &[Cue],
        game: &mut Game,
        actions: &GameActions,
    ) -> Result<(), GameError> {
        let from = self.active.unwrap_or(SegmentType::Day);
        let next = self.transition(SegmentType::Day, SegmentTrigger::HunterDown);
        debug!("Hunter down during {} ({:?})", from, context);

        for cue in narration {
            actions.play(*cue).await;
        }
        self.hunter_context = Some(context);
        self.enter(next, actions);
        actions.hunter_action(game)
    }

    /// 夜明けの狩人の選択が終わったら、昼の通常処理を再開する
    ///
    /// 狩人と道連れの死亡は他の夜の死亡と同じ発表で確定し、勝敗判定はその後に行う。
    pub async fn continue_day_action(
        &mut self,
        game: &mut Game,
        actions: &GameActions,
    ) -> Result<(), GameError> {
        self.hunter_context = None;
        if game.is_over() {
            return Ok(());
        }

        let resumed = self.transition(SegmentType::Hunter, SegmentTrigger::HunterResolved);
        self.enter(resumed, actions);
        actions.play(Cue::PostHunter).await;
        self.day_action(game, actions).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::GameConfig;
    use crate::models::death::DeathCause;
    use crate::models::event::ServerEvent;
    use crate::utils::test_setup::{RecordingCuePlayer, RecordingNotifier};
    use std::sync::Arc;

    fn setup() -> (GameActions, Arc<RecordingNotifier>, Arc<RecordingCuePlayer>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let cues = Arc::new(RecordingCuePlayer::default());
        let actions = GameActions::new(
            Arc::new(GameConfig::immediate()),
            notifier.clone(),
            cues.clone(),
        );
        (actions, notifier, cues)
    }

    fn game_with(roles: &[(&str, Role)]) -> Game {
        let mut game = Game::new();
        for (id, _) in roles {
            game.add_player(id, id).unwrap();
        }
        for (id, role) in roles {
            game.assign_role(id, *role).unwrap();
        }
        game
    }

    #[test]
    fn cursor_wraps_past_retired_segments() {
        let mut segments = SegmentsManager::new();
        segments.retire(SegmentType::Cupid);
        segments.retire(SegmentType::Lovers);
        segments.witch_died();

        segments.current = SegmentType::Day.index() + 1;
        segments.find_valid_segment();
        assert_eq!(segments.current_segment_type(), SegmentType::Werewolf);

        assert_eq!(
            segments.transition(SegmentType::Werewolf, SegmentTrigger::Completed),
            SegmentType::Day
        );
        assert_eq!(
            segments.transition(SegmentType::Day, SegmentTrigger::Completed),
            SegmentType::Werewolf
        );
    }

    #[test]
    fn hunter_is_only_reached_by_trigger() {
        let segments = SegmentsManager::new();
        assert!(segments.is_retired(SegmentType::Hunter));
        assert_eq!(
            segments.transition(SegmentType::Day, SegmentTrigger::HunterDown),
            SegmentType::Hunter
        );
        assert_eq!(
            segments.transition(SegmentType::Hunter, SegmentTrigger::HunterResolved),
            SegmentType::Day
        );
        assert_eq!(
            segments.transition(SegmentType::Hunter, SegmentTrigger::Completed),
            SegmentType::Cupid
        );
    }

    #[tokio::test]
    async fn first_night_segments_retire_after_one_pass() {
        let (actions, _, _) = setup();
        let mut game = game_with(&[
            ("c", Role::Cupid),
            ("a", Role::Villager),
            ("b", Role::Villager),
            ("w", Role::Werewolf),
        ]);
        let mut segments = SegmentsManager::new();

        segments.start_game(&mut game, &actions).await.unwrap();
        assert_eq!(segments.active_segment(), Some(SegmentType::Cupid));

        game.set_lovers("a", "b").unwrap();
        segments.finish_segment(&mut game, &actions).await.unwrap();
        assert_eq!(segments.active_segment(), Some(SegmentType::Lovers));

        segments.finish_segment(&mut game, &actions).await.unwrap();
        assert_eq!(segments.active_segment(), Some(SegmentType::Werewolf));
        assert!(segments.is_retired(SegmentType::Cupid));
        assert!(segments.is_retired(SegmentType::Lovers));
        // 魔女がいないので魔女のフェーズは最初から退役している
        assert!(segments.is_retired(SegmentType::WitchHeal));
    }

    #[tokio::test]
    async fn hunter_in_death_queue_short_circuits_day() {
        let (actions, notifier, cues) = setup();
        let mut game = game_with(&[
            ("h", Role::Hunter),
            ("a", Role::Villager),
            ("b", Role::Villager),
            ("w", Role::Werewolf),
        ]);
        let mut segments = SegmentsManager::new();
        game.add_pending_death("h", DeathCause::Werewolves).unwrap();

        segments
            .jump_to(SegmentType::Day, &mut game, &actions)
            .await
            .unwrap();

        assert_eq!(segments.active_segment(), Some(SegmentType::Hunter));
        assert_eq!(segments.hunter_context(), Some(HunterContext::Dawn));
        assert_eq!(cues.cues(), vec![Cue::Hunter]);
        assert!(notifier.received_by("h").contains(&ServerEvent::HunterPickRequired {
            hunter_id: "h".to_string()
        }));
        // 狩人の選択まで死亡は確定しない
        assert!(game.player("h").unwrap().is_alive);
        assert_eq!(notifier.count("deaths_announced"), 0);
    }

    #[tokio::test]
    async fn plain_day_announces_and_opens_voting() {
        let (actions, notifier, _) = setup();
        let mut game = game_with(&[
            ("a", Role::Villager),
            ("b", Role::Villager),
            ("c", Role::Villager),
            ("w", Role::Werewolf),
        ]);
        let mut segments = SegmentsManager::new();
        game.add_pending_death("a", DeathCause::Werewolves).unwrap();

        segments
            .jump_to(SegmentType::Day, &mut game, &actions)
            .await
            .unwrap();

        assert_eq!(segments.active_segment(), Some(SegmentType::Day));
        assert!(!game.player("a").unwrap().is_alive);
        assert_eq!(notifier.count("deaths_announced"), 1);
        assert_eq!(notifier.count("day_voting_open"), 1);
        assert!(!game.is_over());
    }

    #[tokio::test]
    async fn witch_segments_retire_when_witch_dies_at_dawn() {
        let (actions, _, _) = setup();
        let mut game = game_with(&[
            ("witch", Role::Witch),
            ("a", Role::Villager),
            ("b", Role::Villager),
            ("w", Role::Werewolf),
        ]);
        let mut segments = SegmentsManager::new();
        game.add_pending_death("witch", DeathCause::Werewolves)
            .unwrap();

        segments
            .jump_to(SegmentType::Day, &mut game, &actions)
            .await
            .unwrap();
        assert!(segments.is_retired(SegmentType::WitchHeal));
        assert!(segments.is_retired(SegmentType::WitchPoison));
    }
}
