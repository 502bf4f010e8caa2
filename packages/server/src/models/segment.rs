use serde::{Deserialize, Serialize};
use std::fmt;

/// 夜と昼のサイクルを構成するフェーズ
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentType {
    #[serde(rename = "CUPID")]
    Cupid,
    #[serde(rename = "LOVERS")]
    Lovers,
    #[serde(rename = "WEREWOLF")]
    Werewolf,
    #[serde(rename = "WITCH-HEAL")]
    WitchHeal,
    #[serde(rename = "WITCH-POISON")]
    WitchPoison,
    #[serde(rename = "DAY")]
    Day,
    #[serde(rename = "HUNTER")]
    Hunter,
}

/// フェーズ遷移のきっかけ
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentTrigger {
    /// 現在のフェーズが完了した
    Completed,
    /// 夜明けまたは昼の投票で狩人が死亡した
    HunterDown,
    /// 狩人が道連れ相手を選んだ
    HunterResolved,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentType,
    pub skip: bool,
}

impl SegmentType {
    /// 固定順のフェーズ一覧。HUNTER はカーソルでは到達せず、昼の分岐からのみ入る
    pub const ORDER: [SegmentType; 7] = [
        SegmentType::Cupid,
        SegmentType::Lovers,
        SegmentType::Werewolf,
        SegmentType::WitchHeal,
        SegmentType::WitchPoison,
        SegmentType::Day,
        SegmentType::Hunter,
    ];

    /// 初夜のみのフェーズ
    pub fn is_first_night_only(self) -> bool {
        matches!(self, SegmentType::Cupid | SegmentType::Lovers)
    }

    pub fn index(self) -> usize {
        Self::ORDER
            .iter()
            .position(|kind| *kind == self)
            .unwrap_or_default()
    }
}

impl Segment {
    pub fn new(kind: SegmentType) -> Self {
        // HUNTER は常にスキップ扱い（昼の分岐から明示的に入る）
        Self {
            kind,
            skip: kind == SegmentType::Hunter,
        }
    }
}

impl fmt::Display for SegmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SegmentType::Cupid => "CUPID",
            SegmentType::Lovers => "LOVERS",
            SegmentType::Werewolf => "WEREWOLF",
            SegmentType::WitchHeal => "WITCH-HEAL",
            SegmentType::WitchPoison => "WITCH-POISON",
            SegmentType::Day => "DAY",
            SegmentType::Hunter => "HUNTER",
        };
        write!(f, "{}", label)
    }
}
