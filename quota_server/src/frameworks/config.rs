use std::{env, time::Duration};

// Runtime/server settings read from the environment.

pub fn http_port() -> u16 {
    env::var("QUOTA_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3004)
}

pub fn database_url() -> Option<String> {
    env::var("DATABASE_URL")
        .ok()
        .filter(|value| !value.trim().is_empty())
}

pub fn upstream_generator_url() -> Option<String> {
    env::var("UPSTREAM_GENERATOR_URL")
        .ok()
        .filter(|value| !value.trim().is_empty())
}

pub fn upstream_generator_timeout() -> Duration {
    let millis = env::var("UPSTREAM_GENERATOR_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(4000);
    Duration::from_millis(millis)
}

// Comma-separated bearer tokens that unlock unmetered member generation.
pub fn member_access_tokens() -> Vec<String> {
    env::var("MEMBER_ACCESS_TOKENS")
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
