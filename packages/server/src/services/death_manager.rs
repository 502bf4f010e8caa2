use crate::models::death::{DeathCause, DeathMetadata, PendingDeath};

/// 陣営の名簿と死亡待ちキューの管理
///
/// キューはプレイヤーごとに最大1件。同じプレイヤーへの2件目は上書きし、
/// 元の並び順を保つ。
#[derive(Debug, Clone, Default)]
pub struct DeathManager {
    team_werewolves: Vec<String>,
    team_villagers: Vec<String>,
    pending_deaths: Vec<PendingDeath>,
}

impl DeathManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_team_werewolf(&mut self, player_id: &str) {
        if !self.team_werewolves.iter().any(|id| id == player_id) {
            self.team_werewolves.push(player_id.to_string());
        }
    }

    pub fn add_team_villager(&mut self, player_id: &str) {
        if !self.team_villagers.iter().any(|id| id == player_id) {
            self.team_villagers.push(player_id.to_string());
        }
    }

    pub fn team_werewolves(&self) -> &[String] {
        &self.team_werewolves
    }

    pub fn team_villagers(&self) -> &[String] {
        &self.team_villagers
    }

    fn upsert(&mut self, death: PendingDeath) {
        match self
            .pending_deaths
            .iter_mut()
            .find(|d| d.player_id == death.player_id)
        {
            Some(existing) => *existing = death,
            None => self.pending_deaths.push(death),
        }
    }

    pub fn add_pending_death(&mut self, player_id: &str, cause: DeathCause) {
        self.upsert(PendingDeath::new(player_id, cause));
    }

    pub fn add_lover_suicide(&mut self, lover_id: &str, dead_lover_id: &str) {
        self.upsert(PendingDeath::lover_suicide(lover_id, dead_lover_id));
    }

    pub fn add_hunter_revenge(&mut self, victim_id: &str, hunter_id: &str) {
        self.upsert(
            PendingDeath::new(victim_id, DeathCause::HunterRevenge).with_metadata(DeathMetadata {
                hunter_id: Some(hunter_id.to_string()),
                ..Default::default()
            }),
        );
    }

    pub fn add_day_vote_elimination(&mut self, victim_id: &str, vote_count: usize) {
        self.upsert(
            PendingDeath::new(victim_id, DeathCause::DayVote).with_metadata(DeathMetadata {
                vote_count: Some(vote_count),
                ..Default::default()
            }),
        );
    }

    pub fn add_witch_poison(&mut self, victim_id: &str) {
        self.upsert(PendingDeath::new(victim_id, DeathCause::WitchPoison));
    }

    pub fn remove_pending_death(&mut self, player_id: &str) -> Option<PendingDeath> {
        let index = self
            .pending_deaths
            .iter()
            .position(|d| d.player_id == player_id)?;
        Some(self.pending_deaths.remove(index))
    }

    pub fn pending_deaths(&self) -> &[PendingDeath] {
        &self.pending_deaths
    }

    pub fn is_in_death_queue(&self, player_id: &str) -> bool {
        self.pending_deaths.iter().any(|d| d.player_id == player_id)
    }

    /// 魔女の回復: 人狼による死亡だけを取り消す（毒による死亡は残る）
    pub fn heal_werewolves_victim(&mut self) -> Vec<PendingDeath> {
        let (healed, remaining) = self
            .pending_deaths
            .drain(..)
            .partition(|d| d.cause == DeathCause::Werewolves);
        self.pending_deaths = remaining;
        healed
    }

    pub fn take_pending_deaths(&mut self) -> Vec<PendingDeath> {
        std::mem::take(&mut self.pending_deaths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_cause_overwrites_in_place() {
        let mut deaths = DeathManager::new();
        deaths.add_pending_death("a", DeathCause::Werewolves);
        deaths.add_pending_death("b", DeathCause::Werewolves);
        deaths.add_witch_poison("a");

        let pending = deaths.pending_deaths();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].player_id, "a");
        assert_eq!(pending[0].cause, DeathCause::WitchPoison);
        assert_eq!(pending[1].player_id, "b");
    }

    #[test]
    fn named_constructors_carry_metadata() {
        let mut deaths = DeathManager::new();
        deaths.add_hunter_revenge("victim", "hunter");
        deaths.add_lover_suicide("partner", "lover");
        deaths.add_day_vote_elimination("voted", 3);

        let pending = deaths.pending_deaths();
        assert_eq!(
            pending[0].metadata.as_ref().unwrap().hunter_id.as_deref(),
            Some("hunter")
        );
        assert_eq!(pending[1].cause, DeathCause::PartnerSuicide);
        assert_eq!(
            pending[1].metadata.as_ref().unwrap().lover_id.as_deref(),
            Some("lover")
        );
        assert_eq!(pending[2].metadata.as_ref().unwrap().vote_count, Some(3));
    }

    #[test]
    fn heal_only_cancels_werewolf_deaths() {
        let mut deaths = DeathManager::new();
        deaths.add_pending_death("victim", DeathCause::Werewolves);
        deaths.add_witch_poison("poisoned");

        let healed = deaths.heal_werewolves_victim();
        assert_eq!(healed.len(), 1);
        assert!(!deaths.is_in_death_queue("victim"));
        assert!(deaths.is_in_death_queue("poisoned"));
    }

    #[test]
    fn remove_and_take_drain_the_queue() {
        let mut deaths = DeathManager::new();
        deaths.add_pending_death("a", DeathCause::Werewolves);
        deaths.add_witch_poison("b");

        assert_eq!(deaths.remove_pending_death("a").unwrap().player_id, "a");
        assert!(deaths.remove_pending_death("a").is_none());
        assert_eq!(deaths.take_pending_deaths().len(), 1);
        assert!(deaths.pending_deaths().is_empty());
    }

    #[test]
    fn teams_are_append_only_without_duplicates() {
        let mut deaths = DeathManager::new();
        deaths.add_team_werewolf("w1");
        deaths.add_team_werewolf("w1");
        deaths.add_team_villager("v1");
        assert_eq!(deaths.team_werewolves(), ["w1".to_string()]);
        assert_eq!(deaths.team_villagers(), ["v1".to_string()]);
    }
}
