use crate::models::{role::Role, segment::SegmentType};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    // --- プロトコル違反（状態は変更しない） ---
    #[error("decision not allowed during {current:?} (expected {expected})")]
    WrongPhase {
        expected: SegmentType,
        current: Option<SegmentType>,
    },
    #[error("player {player_id} does not hold the {role} role")]
    MissingRole { player_id: String, role: Role },
    #[error("player {0} is not a werewolf and cannot vote during the werewolf phase")]
    NotAWerewolf(String),
    #[error("target {0} is not a valid target")]
    InvalidTarget(String),
    #[error("vote mismatch: expected {expected}, but current vote is {actual:?}")]
    StaleVote {
        expected: String,
        actual: Option<String>,
    },
    #[error("the roster is closed once roles are assigned")]
    RosterClosed,
    #[error("player {0} has already joined")]
    DuplicatePlayer(String),
    #[error("lovers have already been chosen")]
    LoversAlreadySet,
    #[error("lovers pick must name two different players")]
    InvalidLoversPick,
    #[error("the witch has no {0} potion left")]
    PotionUnavailable(&'static str),
    #[error("there is no werewolf victim to heal")]
    NothingToHeal,
    #[error("player {0} is dead")]
    PlayerDead(String),
    #[error("connection {0} has not joined the game")]
    NotAPlayer(String),
    #[error("player {0} is not one of the lovers")]
    NotALover(String),
    #[error("the game is over")]
    GameOver,
    #[error("the game has not started")]
    GameNotStarted,
    #[error("the game has already started")]
    GameAlreadyStarted,

    // --- 不変条件違反（呼び出し側の順序バグ） ---
    #[error("player {0} not found")]
    UnknownPlayer(String),
    #[error("no werewolf victim found, werewolves have not reached agreement")]
    NoWerewolfConsensus,
    #[error("tie in day vote between {0:?}")]
    DayVoteTie(Vec<String>),
    #[error("no valid target found in day vote")]
    NoDayVotes,
    #[error("roles have already been assigned")]
    RolesAlreadyAssigned,
    #[error("player {0} already has a role")]
    RoleAlreadyAssigned(String),
    #[error("no player holds the {0} role")]
    MissingSpecialRole(Role),
}

impl GameError {
    /// 参加者からの不正な判断かどうか（false なら呼び出し側の不変条件違反）
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            GameError::WrongPhase { .. }
                | GameError::MissingRole { .. }
                | GameError::NotAWerewolf(_)
                | GameError::InvalidTarget(_)
                | GameError::StaleVote { .. }
                | GameError::RosterClosed
                | GameError::DuplicatePlayer(_)
                | GameError::LoversAlreadySet
                | GameError::InvalidLoversPick
                | GameError::PotionUnavailable(_)
                | GameError::NothingToHeal
                | GameError::PlayerDead(_)
                | GameError::NotAPlayer(_)
                | GameError::NotALover(_)
                | GameError::GameOver
                | GameError::GameNotStarted
                | GameError::GameAlreadyStarted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_error_kinds() {
        assert!(GameError::NotAWerewolf("p1".into()).is_protocol_violation());
        assert!(GameError::StaleVote {
            expected: "a".into(),
            actual: Some("b".into())
        }
        .is_protocol_violation());
        assert!(GameError::NothingToHeal.is_protocol_violation());
        assert!(!GameError::NoWerewolfConsensus.is_protocol_violation());
        assert!(!GameError::DayVoteTie(vec!["a".into(), "b".into()]).is_protocol_violation());
        assert!(!GameError::UnknownPlayer("x".into()).is_protocol_violation());
    }
}
