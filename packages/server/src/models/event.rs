use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{
    death::DeathInfo,
    player::PlayerListItem,
    role::{Role, Team},
    segment::SegmentType,
};

/// 投票先ID -> 得票数
pub type VoteTallies = BTreeMap<String, usize>;

/// 参加者の接続から届く判断（受信メッセージ）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum PlayerDecision {
    /// ゲーム開始前のみ
    Join { name: String },
    GetPlayersList,
    /// キューピッドのみ、一度だけ
    LoversPick { players: Vec<String> },
    LoverClosedAlert,
    WerewolfVote { target: String },
    WerewolfUpdateVote { target: String, old_target: String },
    WitchHeal { heal: bool },
    WitchPoison { target: Option<String> },
    DayVote { target: String },
    HunterPick { target: String },
}

/// エンジンから参加者へ送るアナウンス（送信メッセージ）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum ServerEvent {
    PlayerData { player: PlayerListItem },
    PlayerJoined { player: PlayerListItem },
    PlayersList { players: Vec<PlayerListItem> },
    VillagersList { villagers: Vec<PlayerListItem> },
    RoleAssigned { role: Role },
    PhaseChanged {
        from: Option<SegmentType>,
        to: SegmentType,
    },
    CupidPickRequired,
    PlayerIsLover { partner_name: String },
    LoversCanCloseAlert,
    WerewolfPickRequired,
    WerewolfCurrentVotes { tallies: VoteTallies },
    WerewolfVotingComplete,
    WitchCanHeal { victim_id: String },
    WitchPickPoisonPlayer,
    DeathsAnnounced { deaths: Vec<DeathInfo> },
    PlayerIsDead,
    PlayerDied { player_id: String },
    DayVotingOpen,
    DayVoteTied { tallies: VoteTallies },
    HunterPickRequired { hunter_id: String },
    GameWon { team: Team },
    GameLost { team: Team },
    Error { message: String },
}

/// 通知の宛先
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    Player(String),
    Group(Vec<String>),
    Everyone,
}

impl Audience {
    pub fn includes(&self, player_id: &str) -> bool {
        match self {
            Audience::Player(id) => id == player_id,
            Audience::Group(ids) => ids.iter().any(|id| id == player_id),
            Audience::Everyone => true,
        }
    }
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::PlayerData { .. } => "player_data",
            ServerEvent::PlayerJoined { .. } => "player_joined",
            ServerEvent::PlayersList { .. } => "players_list",
            ServerEvent::VillagersList { .. } => "villagers_list",
            ServerEvent::RoleAssigned { .. } => "role_assigned",
            ServerEvent::PhaseChanged { .. } => "phase_changed",
            ServerEvent::CupidPickRequired => "cupid_pick_required",
            ServerEvent::PlayerIsLover { .. } => "player_is_lover",
            ServerEvent::LoversCanCloseAlert => "lovers_can_close_alert",
            ServerEvent::WerewolfPickRequired => "werewolf_pick_required",
            ServerEvent::WerewolfCurrentVotes { .. } => "werewolf_current_votes",
            ServerEvent::WerewolfVotingComplete => "werewolf_voting_complete",
            ServerEvent::WitchCanHeal { .. } => "witch_can_heal",
            ServerEvent::WitchPickPoisonPlayer => "witch_pick_poison_player",
            ServerEvent::DeathsAnnounced { .. } => "deaths_announced",
            ServerEvent::PlayerIsDead => "player_is_dead",
            ServerEvent::PlayerDied { .. } => "player_died",
            ServerEvent::DayVotingOpen => "day_voting_open",
            ServerEvent::DayVoteTied { .. } => "day_vote_tied",
            ServerEvent::HunterPickRequired { .. } => "hunter_pick_required",
            ServerEvent::GameWon { .. } => "game_won",
            ServerEvent::GameLost { .. } => "game_lost",
            ServerEvent::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decisions_parse_from_tagged_json() {
        let vote: PlayerDecision =
            serde_json::from_str(r#"{"message_type":"werewolf_vote","target":"p2"}"#).unwrap();
        assert_eq!(
            vote,
            PlayerDecision::WerewolfVote {
                target: "p2".to_string()
            }
        );

        let skip: PlayerDecision =
            serde_json::from_str(r#"{"message_type":"witch_poison","target":null}"#).unwrap();
        assert_eq!(skip, PlayerDecision::WitchPoison { target: None });
    }

    #[test]
    fn unknown_decision_is_rejected() {
        let result =
            serde_json::from_str::<PlayerDecision>(r#"{"message_type":"seer_peek","target":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn server_event_tag_matches_name() {
        let event = ServerEvent::HunterPickRequired {
            hunter_id: "h".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["message_type"], event.name());
        assert_eq!(json["hunter_id"], "h");
    }
}
