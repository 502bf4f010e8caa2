use crate::models::{game::Game, role::Role};
use crate::services::cues::Cue;

/// 通常の死亡演出では表現できない、原因が重なる場面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialScenario {
    /// 死亡する恋人の相手が狩人
    PartnerIsHunter,
    /// 死亡する狩人自身が恋人
    HunterIsLover,
}

impl SpecialScenario {
    /// 夜明けの死亡待ちキューから該当する場面を判定する
    pub fn at_dawn(game: &Game) -> Option<Self> {
        let hunter = game.special_role_player(Role::Hunter)?;
        if !game.is_lover(&hunter.id) {
            return None;
        }

        if game.hunter_is_in_death_queue() {
            return Some(SpecialScenario::HunterIsLover);
        }

        let partner_dying = game
            .partner_of(&hunter.id)
            .map(|partner| game.deaths().is_in_death_queue(&partner.id))
            .unwrap_or(false);
        if hunter.is_alive && partner_dying {
            return Some(SpecialScenario::PartnerIsHunter);
        }

        None
    }

    /// 狩人の道連れ選択の前に、通常の演出の代わりに流すキュー
    pub fn cues(self) -> &'static [Cue] {
        match self {
            SpecialScenario::PartnerIsHunter => &[Cue::PartnerIsHunter],
            SpecialScenario::HunterIsLover => &[Cue::HunterIsLover],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::death::DeathCause;

    fn lovers_game(first: Role, second: Role) -> Game {
        let mut game = Game::new();
        for id in ["p1", "p2", "p3", "w"] {
            game.add_player(id, id).unwrap();
        }
        game.assign_role("p1", first).unwrap();
        game.assign_role("p2", second).unwrap();
        game.assign_role("p3", Role::Villager).unwrap();
        game.assign_role("w", Role::Werewolf).unwrap();
        game.set_lovers("p1", "p2").unwrap();
        game
    }

    #[test]
    fn dying_lover_with_hunter_partner() {
        let mut game = lovers_game(Role::Villager, Role::Hunter);
        assert_eq!(SpecialScenario::at_dawn(&game), None);

        game.add_pending_death("p1", DeathCause::Werewolves).unwrap();
        assert_eq!(
            SpecialScenario::at_dawn(&game),
            Some(SpecialScenario::PartnerIsHunter)
        );
    }

    #[test]
    fn dying_hunter_who_is_a_lover() {
        let mut game = lovers_game(Role::Hunter, Role::Villager);
        game.add_pending_death("p1", DeathCause::Werewolves).unwrap();
        assert_eq!(
            SpecialScenario::at_dawn(&game),
            Some(SpecialScenario::HunterIsLover)
        );
    }

    #[test]
    fn plain_lover_death_is_not_special() {
        let mut game = lovers_game(Role::Villager, Role::Villager);
        game.add_pending_death("p1", DeathCause::Werewolves).unwrap();
        assert_eq!(SpecialScenario::at_dawn(&game), None);
    }
}
