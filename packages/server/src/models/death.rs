use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeathCause {
    Werewolves,     // 夜の人狼の襲撃
    WitchPoison,    // 魔女の毒
    DayVote,        // 昼の投票による処刑
    HunterRevenge,  // 狩人の道連れ
    PartnerSuicide, // 恋人の後追い
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hunter_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lover_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_count: Option<usize>,
}

/// 死亡処理待ちのキューに積まれた死亡
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDeath {
    pub player_id: String,
    pub cause: DeathCause,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DeathMetadata>,
}

/// 確定した死亡（全員へのアナウンス用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeathInfo {
    pub player_id: String,
    pub player_name: String,
    pub cause: DeathCause,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DeathMetadata>,
}

impl PendingDeath {
    pub fn new(player_id: impl Into<String>, cause: DeathCause) -> Self {
        Self {
            player_id: player_id.into(),
            cause,
            metadata: None,
        }
    }

    /// 恋人の死亡に伴う後追い
    pub fn lover_suicide(lover_id: impl Into<String>, dead_lover_id: impl Into<String>) -> Self {
        Self::new(lover_id, DeathCause::PartnerSuicide).with_metadata(DeathMetadata {
            lover_id: Some(dead_lover_id.into()),
            ..Default::default()
        })
    }

    pub fn with_metadata(mut self, metadata: DeathMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn into_death_info(self, player_name: String) -> DeathInfo {
        DeathInfo {
            player_id: self.player_id,
            player_name,
            cause: self.cause,
            timestamp: Utc::now(),
            metadata: self.metadata,
        }
    }
}

impl fmt::Display for DeathCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeathCause::Werewolves => "WEREWOLVES",
            DeathCause::WitchPoison => "WITCH_POISON",
            DeathCause::DayVote => "DAY_VOTE",
            DeathCause::HunterRevenge => "HUNTER_REVENGE",
            DeathCause::PartnerSuicide => "PARTNER_SUICIDE",
        };
        write!(f, "{}", label)
    }
}
