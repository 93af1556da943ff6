use crate::domain::RoomConfig;
use std::{env, str::FromStr, time::Duration};

// Runtime/server constants (not gameplay tuning).

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

pub fn http_port() -> u16 {
    env_parse("ROOM_SERVER_PORT").unwrap_or(3001)
}

/// Gameplay defaults for every room, with env overrides.
pub fn room_config() -> RoomConfig {
    let defaults = RoomConfig::default();
    RoomConfig {
        max_clients: env_parse::<usize>("MAX_CLIENTS")
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_clients),
        day_night_duration: env_parse::<u64>("DAY_NIGHT_SECS")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.day_night_duration),
        // 0 disables the victory condition.
        victory_time_limit: env_parse::<u64>("VICTORY_TIME_LIMIT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.victory_time_limit),
        seed: env_parse("ROOM_SEED"),
        ..defaults
    }
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const UPDATE_BROADCAST_CAPACITY: usize = 128;

pub const TICK_INTERVAL: Duration = Duration::from_millis(50);
// Pinned room clients land in when they omit `room_id`.
pub const DEFAULT_ROOM_ID: &str = "default";
