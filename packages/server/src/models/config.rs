use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub bind_addr: String,
    pub allowed_origin: String,
    // この人数に達したら自動でゲームを開始する（0 で無効）
    pub auto_start_players: usize,
    // 恋人の通知までの待ち時間
    pub lover_reveal_delay: Duration,
    // 恋人が通知を閉じられるようになるまでの待ち時間
    pub lover_close_delay: Duration,
    // 昼の投票開始までの待ち時間
    pub day_vote_delay: Duration,
    // 狩人の道連れ選択を促すまでの待ち時間
    pub hunter_prompt_delay: Duration,
    pub cue_dir: PathBuf,
    // 音声再生に使う外部コマンド（未設定ならログのみ）
    pub cue_command: Option<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            allowed_origin: "http://localhost:3000".to_string(),
            auto_start_players: 6,
            lover_reveal_delay: Duration::from_millis(4_000),
            lover_close_delay: Duration::from_millis(3_000),
            day_vote_delay: Duration::from_millis(7_000),
            hunter_prompt_delay: Duration::from_millis(18_000),
            cue_dir: PathBuf::from("./assets"),
            cue_command: None,
        }
    }
}

fn duration_from_env(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

impl GameConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = env::var("WEREWOLF_BIND_ADDR").unwrap_or(defaults.bind_addr);
        let allowed_origin =
            env::var("WEREWOLF_ALLOWED_ORIGIN").unwrap_or(defaults.allowed_origin);
        let auto_start_players = env::var("WEREWOLF_AUTO_START_PLAYERS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.auto_start_players);
        let lover_reveal_delay =
            duration_from_env("WEREWOLF_LOVER_REVEAL_DELAY_MS", defaults.lover_reveal_delay);
        let lover_close_delay =
            duration_from_env("WEREWOLF_LOVER_CLOSE_DELAY_MS", defaults.lover_close_delay);
        let day_vote_delay =
            duration_from_env("WEREWOLF_DAY_VOTE_DELAY_MS", defaults.day_vote_delay);
        let hunter_prompt_delay = duration_from_env(
            "WEREWOLF_HUNTER_PROMPT_DELAY_MS",
            defaults.hunter_prompt_delay,
        );
        let cue_dir = env::var("WEREWOLF_CUE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.cue_dir);
        let cue_command = env::var("WEREWOLF_CUE_COMMAND")
            .ok()
            .filter(|v| !v.trim().is_empty());

        Self {
            bind_addr,
            allowed_origin,
            auto_start_players,
            lover_reveal_delay,
            lover_close_delay,
            day_vote_delay,
            hunter_prompt_delay,
            cue_dir,
            cue_command,
        }
    }

    /// 待ち時間なし・自動開始なし（テスト用）
    pub fn immediate() -> Self {
        Self {
            auto_start_players: 0,
            lover_reveal_delay: Duration::ZERO,
            lover_close_delay: Duration::ZERO,
            day_vote_delay: Duration::ZERO,
            hunter_prompt_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_table_pacing() {
        let config = GameConfig::default();
        assert_eq!(config.auto_start_players, 6);
        assert_eq!(config.lover_reveal_delay, Duration::from_secs(4));
        assert_eq!(config.lover_close_delay, Duration::from_secs(3));
        assert_eq!(config.day_vote_delay, Duration::from_secs(7));
        assert_eq!(config.hunter_prompt_delay, Duration::from_secs(18));
    }

    #[test]
    fn immediate_has_no_delays() {
        let config = GameConfig::immediate();
        assert_eq!(config.auto_start_players, 0);
        assert!(config.day_vote_delay.is_zero());
        assert!(config.hunter_prompt_delay.is_zero());
    }
}
