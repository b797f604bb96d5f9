use std::{env, net::IpAddr, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_host() -> IpAddr {
    env::var("RACE_SERVER_HOST")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(IpAddr::from([0, 0, 0, 0]))
}

pub fn http_port() -> u16 {
    env::var("RACE_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080)
}

/// Artificial latency before a control input reaches the race loop (0 disables).
pub fn input_delay() -> Duration {
    millis_from_env("RACE_INPUT_DELAY_MS")
}

/// Artificial latency before each world snapshot is broadcast (0 disables).
pub fn output_delay() -> Duration {
    millis_from_env("RACE_OUTPUT_DELAY_MS")
}

fn millis_from_env(key: &str) -> Duration {
    let millis = env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(0);
    Duration::from_millis(millis)
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;

pub const TICK_INTERVAL: Duration = Duration::from_millis(16);
pub const BOOST_SPAWN_INTERVAL: Duration = Duration::from_secs(15);
pub const MAX_PLAYERS: usize = 8;
