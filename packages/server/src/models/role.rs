use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Villager, // 村人
    Werewolf, // 人狼
    Cupid,    // キューピッド
    Witch,    // 魔女
    Hunter,   // 狩人
    Seer,     // 占い師（予約のみ、配役されない）
}

/// 勝敗判定で使う陣営
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Villagers,
    Werewolves,
}

impl Role {
    /// 固有のフェーズを持つ役職かどうか
    pub fn is_special(self) -> bool {
        !matches!(self, Role::Villager | Role::Werewolf)
    }

    pub fn team(self) -> Team {
        match self {
            Role::Werewolf => Team::Werewolves,
            _ => Team::Villagers,
        }
    }
}

impl Team {
    pub fn opponent(self) -> Team {
        match self {
            Team::Villagers => Team::Werewolves,
            Team::Werewolves => Team::Villagers,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Villager => write!(f, "VILLAGER"),
            Role::Werewolf => write!(f, "WEREWOLF"),
            Role::Cupid => write!(f, "CUPID"),
            Role::Witch => write!(f, "WITCH"),
            Role::Hunter => write!(f, "HUNTER"),
            Role::Seer => write!(f, "SEER"),
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Villagers => write!(f, "villagers"),
            Team::Werewolves => write!(f, "werewolves"),
        }
    }
}
