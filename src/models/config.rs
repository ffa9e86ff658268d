use std::env;
use std::time::Duration;

use once_cell::sync::Lazy;

/// Process-wide defaults, used when a session is started without an
/// explicit configuration.
pub static CONFIG: Lazy<GameConfig> = Lazy::new(GameConfig::default);

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub min_players: usize,
    pub max_players: usize,
    /// Face-down cards dealt to the table.
    pub table_cards: usize,
    /// Wait inserted for a requested role nobody holds, so timing does not
    /// reveal card placement.
    pub cover_delay: Duration,
    pub day_duration: Duration,
    /// How long before the end of the day the warning is announced.
    pub warning_offset: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: 3,
            max_players: 10,
            table_cards: 3,
            cover_delay: Duration::from_millis(env_u64("ONE_NIGHT_COVER_MILLIS", 10_000)),
            day_duration: Duration::from_secs(env_u64("ONE_NIGHT_DAY_SECONDS", 600)),
            warning_offset: Duration::from_secs(env_u64("ONE_NIGHT_WARNING_SECONDS", 30)),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
