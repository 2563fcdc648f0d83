// src/config.rs

use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;

/// Integrity violations tolerated before the attempt is force-submitted with no answers.
pub const DEFAULT_VIOLATION_LIMIT: u32 = 3;

/// Remaining seconds at which the one-time "time almost up" warning fires.
pub const TIME_WARNING_SECONDS: u64 = 60;

pub const DEFAULT_TICK_MILLIS: u64 = 1000;

/// Controller-facing subset of the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptPolicy {
    pub violation_limit: u32,
    pub time_warning_seconds: u64,
}

impl Default for AttemptPolicy {
    fn default() -> Self {
        Self {
            violation_limit: DEFAULT_VIOLATION_LIMIT,
            time_warning_seconds: TIME_WARNING_SECONDS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub quiz_file: String,
    pub rust_log: String,
    pub log_dir: String,
    pub policy: AttemptPolicy,
    pub tick_interval: Duration,
    pub attempts_used: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let quiz_file = env::var("QUIZ_FILE").unwrap_or_else(|_| "quiz.json".to_string());

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

        let policy = AttemptPolicy {
            violation_limit: parse_var("PROCTOR_VIOLATION_LIMIT", DEFAULT_VIOLATION_LIMIT),
            time_warning_seconds: parse_var("PROCTOR_TIME_WARNING_SECS", TIME_WARNING_SECONDS),
        };

        let tick_interval =
            Duration::from_millis(parse_var("PROCTOR_TICK_MS", DEFAULT_TICK_MILLIS).max(1));

        let attempts_used = parse_var("PROCTOR_ATTEMPTS_USED", 0);

        Self {
            quiz_file,
            rust_log,
            log_dir,
            policy,
            tick_interval,
            attempts_used,
        }
    }
}

/// Reads a numeric variable, falling back to `default` when unset or unparsable.
fn parse_var<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
