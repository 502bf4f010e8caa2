use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::{
    death::{DeathCause, DeathInfo, PendingDeath},
    event::VoteTallies,
    player::{Player, PlayerListItem},
    role::{Role, Team},
};
use crate::error::GameError;
use crate::services::death_manager::DeathManager;

/// ゲーム全体の状態。他の全コンポーネントはここを読み書きする
#[derive(Debug, Clone)]
pub struct Game {
    players: Vec<Player>,
    special_role_players: HashMap<Role, String>,
    deaths: DeathManager,
    lovers: Option<(String, String)>,
    werewolf_votes: HashMap<String, String>, // 投票者ID -> 対象ID
    day_votes: HashMap<String, String>,      // 投票者ID -> 対象ID
    witch_has_heal_potion: bool,
    witch_has_poison_potion: bool,
    roles_assigned: bool,
    winner: Option<Team>,
}

/// 管理画面向けのスナップショット
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GameSnapshot {
    pub players: Vec<Player>,
    pub lovers: Option<(String, String)>,
    pub pending_deaths: Vec<PendingDeath>,
    pub werewolf_votes: VoteTallies,
    pub day_votes: VoteTallies,
    pub witch_has_heal_potion: bool,
    pub witch_has_poison_potion: bool,
    pub winner: Option<Team>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

fn tally<'a>(votes: impl Iterator<Item = &'a String>) -> VoteTallies {
    let mut tallies = VoteTallies::new();
    for target in votes {
        *tallies.entry(target.clone()).or_insert(0) += 1;
    }
    tallies
}

impl Game {
    pub fn new() -> Self {
        Game {
            players: Vec::new(),
            special_role_players: HashMap::new(),
            deaths: DeathManager::new(),
            lovers: None,
            werewolf_votes: HashMap::new(),
            day_votes: HashMap::new(),
            witch_has_heal_potion: true,
            witch_has_poison_potion: true,
            roles_assigned: false,
            winner: None,
        }
    }

    // ---- 名簿 ----

    pub fn roster_closed(&self) -> bool {
        self.roles_assigned || self.players.iter().any(|p| p.role.is_some())
    }

    pub fn add_player(&mut self, id: &str, name: &str) -> Result<&Player, GameError> {
        if self.roster_closed() {
            return Err(GameError::RosterClosed);
        }
        if self.players.iter().any(|p| p.id == id) {
            return Err(GameError::DuplicatePlayer(id.to_string()));
        }

        self.players.push(Player::new(id.to_string(), name.to_string()));
        info!("Player joined: {} ({}), player count: {}", name, id, self.players.len());
        Ok(&self.players[self.players.len() - 1])
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: &str) -> Result<&Player, GameError> {
        self.players
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| GameError::UnknownPlayer(id.to_string()))
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_alive)
    }

    pub fn client_player_list(&self) -> Vec<PlayerListItem> {
        self.players.iter().map(Player::list_item).collect()
    }

    pub fn villagers_list(&self) -> Vec<PlayerListItem> {
        self.deaths
            .team_villagers()
            .iter()
            .filter_map(|id| self.player(id).ok())
            .map(Player::list_item)
            .collect()
    }

    fn team_alive(&self, team: &[String]) -> Vec<&Player> {
        team.iter()
            .filter_map(|id| self.player(id).ok())
            .filter(|p| p.is_alive)
            .collect()
    }

    pub fn living_werewolves(&self) -> Vec<&Player> {
        self.team_alive(self.deaths.team_werewolves())
    }

    pub fn living_villagers(&self) -> Vec<&Player> {
        self.team_alive(self.deaths.team_villagers())
    }

    pub fn living_werewolf_ids(&self) -> Vec<String> {
        self.living_werewolves()
            .into_iter()
            .map(|p| p.id.clone())
            .collect()
    }

    pub fn team_ids(&self, team: Team) -> Vec<String> {
        match team {
            Team::Werewolves => self.deaths.team_werewolves().to_vec(),
            Team::Villagers => self.deaths.team_villagers().to_vec(),
        }
    }

    // ---- 役職 ----

    /// 人数に応じた役職プール。特殊役職は1役職につき1人まで
    pub fn role_pool(player_count: usize) -> Vec<Role> {
        if player_count < 4 {
            return vec![Role::Villager; player_count];
        }

        let werewolf_count = (player_count / 3).max(1);
        let mut roles = vec![Role::Werewolf; werewolf_count];
        roles.push(Role::Cupid);
        if player_count >= 6 {
            roles.push(Role::Witch);
        }
        if player_count >= 8 {
            // 2人目のキューピッドの席は村人で埋める
            roles.push(Role::Hunter);
        }
        roles.resize(player_count, Role::Villager);
        roles
    }

    pub fn assign_roles<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), GameError> {
        if self.roster_closed() {
            return Err(GameError::RolesAlreadyAssigned);
        }

        let mut pool = Self::role_pool(self.players.len());
        pool.shuffle(rng);
        debug!("Shuffled roles: {:?}", pool);

        let ids: Vec<String> = self.players.iter().map(|p| p.id.clone()).collect();
        for (id, role) in ids.iter().zip(pool) {
            self.assign_role(id, role)?;
        }
        self.roles_assigned = true;
        Ok(())
    }

    /// 1人に役職を割り当て、陣営と特殊役職の台帳に登録する
    pub fn assign_role(&mut self, player_id: &str, role: Role) -> Result<(), GameError> {
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or_else(|| GameError::UnknownPlayer(player_id.to_string()))?;
        if player.role.is_some() {
            return Err(GameError::RoleAlreadyAssigned(player_id.to_string()));
        }
        player.role = Some(role);
        info!("Assigning role {} to player {}", role, player.name);

        match role.team() {
            Team::Werewolves => self.deaths.add_team_werewolf(player_id),
            Team::Villagers => self.deaths.add_team_villager(player_id),
        }

        if role.is_special() {
            if let Some(holder) = self.special_role_players.get(&role) {
                warn!("{} already held by {}, keeping the first holder", role, holder);
            } else {
                self.special_role_players.insert(role, player_id.to_string());
            }
        }
        Ok(())
    }

    pub fn special_role_player(&self, role: Role) -> Option<&Player> {
        self.special_role_players
            .get(&role)
            .and_then(|id| self.player(id).ok())
    }

    pub fn require_special_role(&self, player_id: &str, role: Role) -> Result<(), GameError> {
        match self.special_role_player(role) {
            Some(holder) if holder.id == player_id => {
                if holder.is_alive {
                    Ok(())
                } else {
                    Err(GameError::PlayerDead(player_id.to_string()))
                }
            }
            _ => Err(GameError::MissingRole {
                player_id: player_id.to_string(),
                role,
            }),
        }
    }

    // ---- 恋人 ----

    pub fn set_lovers(&mut self, first: &str, second: &str) -> Result<(), GameError> {
        if self.lovers.is_some() {
            return Err(GameError::LoversAlreadySet);
        }
        if first == second {
            return Err(GameError::InvalidLoversPick);
        }
        self.player(first)?;
        self.player(second)?;

        self.lovers = Some((first.to_string(), second.to_string()));
        info!("Lovers set: {} and {}", first, second);
        Ok(())
    }

    pub fn lovers(&self) -> Option<(&Player, &Player)> {
        let (first, second) = self.lovers.as_ref()?;
        Some((self.player(first).ok()?, self.player(second).ok()?))
    }

    pub fn is_lover(&self, player_id: &str) -> bool {
        self.lovers
            .as_ref()
            .map(|(a, b)| a == player_id || b == player_id)
            .unwrap_or(false)
    }

    pub fn partner_of(&self, player_id: &str) -> Option<&Player> {
        let (a, b) = self.lovers.as_ref()?;
        let partner = if a == player_id {
            b
        } else if b == player_id {
            a
        } else {
            return None;
        };
        self.player(partner).ok()
    }

    /// 死亡待ちキューに入っている恋人
    pub fn lovers_in_death_queue(&self) -> Vec<&Player> {
        match self.lovers() {
            Some((a, b)) => [a, b]
                .into_iter()
                .filter(|lover| self.deaths.is_in_death_queue(&lover.id))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn is_one_of_lovers_in_death_queue(&self) -> bool {
        !self.lovers_in_death_queue().is_empty()
    }

    pub fn hunter_is_in_death_queue(&self) -> bool {
        self.special_role_player(Role::Hunter)
            .map(|hunter| self.deaths.is_in_death_queue(&hunter.id))
            .unwrap_or(false)
    }

    // ---- 人狼の投票（全会一致） ----

    fn validate_werewolf_vote(&self, voter_id: &str, target_id: &str) -> Result<(), GameError> {
        let voter = self
            .player(voter_id)
            .map_err(|_| GameError::NotAWerewolf(voter_id.to_string()))?;
        if !voter.is_werewolf() {
            return Err(GameError::NotAWerewolf(voter_id.to_string()));
        }
        if !voter.is_alive {
            return Err(GameError::PlayerDead(voter_id.to_string()));
        }

        match self.player(target_id) {
            Ok(target) if target.is_alive && !target.is_werewolf() => Ok(()),
            _ => Err(GameError::InvalidTarget(target_id.to_string())),
        }
    }

    pub fn handle_werewolf_vote(&mut self, voter_id: &str, target_id: &str) -> Result<(), GameError> {
        self.validate_werewolf_vote(voter_id, target_id)?;
        self.werewolf_votes
            .insert(voter_id.to_string(), target_id.to_string());
        info!("Werewolf {} voted for {}", voter_id, target_id);
        Ok(())
    }

    pub fn handle_werewolf_update_vote(
        &mut self,
        voter_id: &str,
        new_target_id: &str,
        old_target_id: &str,
    ) -> Result<(), GameError> {
        self.validate_werewolf_vote(voter_id, new_target_id)?;

        let current = self.werewolf_votes.get(voter_id);
        if current.map(String::as_str) != Some(old_target_id) {
            return Err(GameError::StaleVote {
                expected: old_target_id.to_string(),
                actual: current.cloned(),
            });
        }

        self.werewolf_votes
            .insert(voter_id.to_string(), new_target_id.to_string());
        info!(
            "Werewolf {} changed vote from {} to {}",
            voter_id, old_target_id, new_target_id
        );
        Ok(())
    }

    pub fn werewolf_vote_tallies(&self) -> VoteTallies {
        tally(self.werewolf_votes.values())
    }

    pub fn clear_werewolf_votes(&mut self) {
        self.werewolf_votes.clear();
    }

    /// 生存している人狼全員が投票済みで、全員が同じ対象を選んでいる
    pub fn has_all_werewolves_agreed(&self) -> bool {
        self.unanimous_werewolf_target().is_some()
    }

    fn unanimous_werewolf_target(&self) -> Option<&String> {
        let living = self.living_werewolves();
        let mut votes = living.iter().map(|w| self.werewolf_votes.get(&w.id));
        let first = votes.next()??;
        votes.all(|vote| vote == Some(first)).then_some(first)
    }

    pub fn werewolf_target(&self) -> Option<String> {
        self.unanimous_werewolf_target().cloned()
    }

    /// 全会一致の対象を人狼による死亡としてキューに積む
    pub fn handle_all_werewolves_agree(&mut self) -> Result<String, GameError> {
        let victim = self
            .werewolf_target()
            .ok_or(GameError::NoWerewolfConsensus)?;
        self.deaths.add_pending_death(&victim, DeathCause::Werewolves);
        info!("Werewolves agreed on {}", victim);
        Ok(victim)
    }

    // ---- 死亡キュー ----

    pub fn deaths(&self) -> &DeathManager {
        &self.deaths
    }

    pub fn death_queue(&self) -> &[PendingDeath] {
        self.deaths.pending_deaths()
    }

    pub fn add_pending_death(&mut self, player_id: &str, cause: DeathCause) -> Result<(), GameError> {
        self.player(player_id)?;
        self.deaths.add_pending_death(player_id, cause);
        Ok(())
    }

    pub fn kill_hunter_revenge(&mut self, target_id: &str) -> Result<(), GameError> {
        let hunter_id = self
            .special_role_player(Role::Hunter)
            .map(|hunter| hunter.id.clone())
            .ok_or(GameError::MissingSpecialRole(Role::Hunter))?;

        match self.player(target_id) {
            Ok(target) if target.is_alive && target.id != hunter_id => {}
            _ => return Err(GameError::InvalidTarget(target_id.to_string())),
        }

        self.deaths.add_hunter_revenge(target_id, &hunter_id);
        info!("Hunter {} takes {} down with them", hunter_id, target_id);
        Ok(())
    }

    // 生存中なら死亡させて名前を返す
    fn kill_player(&mut self, player_id: &str) -> Option<String> {
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == player_id && p.is_alive)?;
        player.kill();
        if player.has_role(Role::Witch) {
            self.witch_has_heal_potion = false;
            self.witch_has_poison_potion = false;
        }
        Some(player.name.clone())
    }

    /// キューを空にして死亡を確定させる。恋人の後追いもここで生成する
    pub fn process_pending_deaths(&mut self) -> Result<Vec<DeathInfo>, GameError> {
        if let Some(unknown) = self
            .deaths
            .pending_deaths()
            .iter()
            .find(|d| self.player(&d.player_id).is_err())
        {
            return Err(GameError::UnknownPlayer(unknown.player_id.clone()));
        }

        let pending = self.deaths.take_pending_deaths();
        debug!("Processing pending deaths: {:?}", pending);

        let mut death_infos = Vec::new();
        for death in pending {
            let Some(name) = self.kill_player(&death.player_id) else {
                debug!("{} already dead, skipping {}", death.player_id, death.cause);
                continue;
            };
            let player_id = death.player_id.clone();
            let cause = death.cause;
            death_infos.push(death.into_death_info(name));

            // 後追いが次の後追いを生むことはない
            if cause == DeathCause::PartnerSuicide {
                continue;
            }
            let Some(partner_id) = self.partner_of(&player_id).map(|p| p.id.clone()) else {
                continue;
            };
            if let Some(partner_name) = self.kill_player(&partner_id) {
                death_infos.push(
                    PendingDeath::lover_suicide(partner_id, player_id).into_death_info(partner_name),
                );
            }
        }

        Ok(death_infos)
    }

    // ---- 魔女 ----

    pub fn can_witch_heal(&self) -> bool {
        self.witch_has_heal_potion
    }

    pub fn can_witch_poison(&self) -> bool {
        self.witch_has_poison_potion
    }

    /// 今夜の人狼の犠牲者がキューにいるか
    pub fn has_werewolf_victim(&self) -> bool {
        self.deaths
            .pending_deaths()
            .iter()
            .any(|d| d.cause == DeathCause::Werewolves)
    }

    /// 人狼による死亡を取り消す。犠牲者がいなければ薬は消費しない
    pub fn heal_werewolf_victim(&mut self) -> Result<Vec<PendingDeath>, GameError> {
        if !self.witch_has_heal_potion {
            return Err(GameError::PotionUnavailable("heal"));
        }
        if !self.has_werewolf_victim() {
            return Err(GameError::NothingToHeal);
        }
        let healed = self.deaths.heal_werewolves_victim();
        self.witch_has_heal_potion = false;
        info!("Witch healed {:?}", healed);
        Ok(healed)
    }

    pub fn witch_kill(&mut self, target_id: &str) -> Result<(), GameError> {
        if !self.witch_has_poison_potion {
            return Err(GameError::PotionUnavailable("poison"));
        }
        match self.player(target_id) {
            Ok(target) if target.is_alive => {}
            _ => return Err(GameError::InvalidTarget(target_id.to_string())),
        }
        self.deaths.add_witch_poison(target_id);
        self.witch_has_poison_potion = false;
        info!("Witch poisoned {}", target_id);
        Ok(())
    }

    // ---- 昼の投票（相対多数） ----

    pub fn handle_day_vote(&mut self, voter_id: &str, target_id: &str) -> Result<(), GameError> {
        let voter = self
            .player(voter_id)
            .map_err(|_| GameError::NotAPlayer(voter_id.to_string()))?;
        if !voter.is_alive {
            return Err(GameError::PlayerDead(voter_id.to_string()));
        }
        match self.player(target_id) {
            Ok(target) if target.is_alive => {}
            _ => return Err(GameError::InvalidTarget(target_id.to_string())),
        }

        self.day_votes
            .insert(voter_id.to_string(), target_id.to_string());
        info!("Player {} voted to eliminate {}", voter_id, target_id);
        Ok(())
    }

    pub fn day_vote_tallies(&self) -> VoteTallies {
        tally(self.day_votes.values())
    }

    pub fn has_all_players_voted(&self) -> bool {
        let mut alive = self.alive_players().peekable();
        alive.peek().is_some() && alive.all(|p| self.day_votes.contains_key(&p.id))
    }

    /// 最多得票の対象と得票数。同数首位は失敗とする
    pub fn day_vote_target(&self) -> Result<(String, usize), GameError> {
        let tallies = self.day_vote_tallies();
        debug!("day vote tallies {:?}", tallies);

        let max_votes = tallies.values().copied().max().ok_or(GameError::NoDayVotes)?;
        let leaders: Vec<String> = tallies
            .into_iter()
            .filter(|(_, votes)| *votes == max_votes)
            .map(|(target, _)| target)
            .collect();

        match leaders.as_slice() {
            [target] => Ok((target.clone(), max_votes)),
            _ => Err(GameError::DayVoteTie(leaders)),
        }
    }

    pub fn clear_day_votes(&mut self) {
        self.day_votes.clear();
    }

    /// 昼の処刑は即時に確定する（キューに残さない）
    pub fn eliminate_by_day_vote(
        &mut self,
        target_id: &str,
        vote_count: usize,
    ) -> Result<Vec<DeathInfo>, GameError> {
        self.player(target_id)?;
        self.deaths.add_day_vote_elimination(target_id, vote_count);
        let deaths = self.process_pending_deaths()?;
        self.clear_day_votes();
        Ok(deaths)
    }

    // ---- 勝敗 ----

    pub fn check_if_winner(&self) -> Option<Team> {
        let villagers = self.living_villagers();
        let werewolves = self.living_werewolves();
        debug!(
            "villagers alive {}, werewolves alive {}",
            villagers.len(),
            werewolves.len()
        );

        if werewolves.is_empty() {
            return Some(Team::Villagers);
        }

        if let ([_], [last_villager]) = (werewolves.as_slice(), villagers.as_slice()) {
            // 薬を残した魔女が最後の村人なら、もう1ラウンド続く
            if last_villager.has_role(Role::Witch)
                && (self.witch_has_heal_potion || self.witch_has_poison_potion)
            {
                return None;
            }
            return Some(Team::Werewolves);
        }

        None
    }

    pub fn declare_winner(&mut self, team: Team) {
        self.winner = Some(team);
    }

    pub fn winner(&self) -> Option<Team> {
        self.winner
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            players: self.players.clone(),
            lovers: self.lovers.clone(),
            pending_deaths: self.deaths.pending_deaths().to_vec(),
            werewolf_votes: self.werewolf_vote_tallies(),
            day_votes: self.day_vote_tallies(),
            witch_has_heal_potion: self.witch_has_heal_potion,
            witch_has_poison_potion: self.witch_has_poison_potion,
            winner: self.winner,
        }
    }
}
