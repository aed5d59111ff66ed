use std::{env, path::PathBuf, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("GAME_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

pub fn tick_interval() -> Duration {
    let millis = env::var("TICK_INTERVAL_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .unwrap_or(50);
    Duration::from_millis(millis)
}

// Ticks between periodic save passes; 0 disables them.
pub fn persist_every_ticks() -> u64 {
    env::var("PERSIST_EVERY_TICKS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(100)
}

pub fn game_data_path() -> PathBuf {
    env::var("GAME_DATA_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config/world.toml"))
}

// In-memory storage is used when unset.
pub fn database_url() -> Option<String> {
    env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty())
}

pub fn rng_seed() -> Option<u64> {
    env::var("RNG_SEED").ok().and_then(|value| value.parse().ok())
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;
