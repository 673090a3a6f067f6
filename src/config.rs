//! Runtime configuration and the scheduling constants that are part of the
//! observable contract.

use std::path::PathBuf;
use std::time::Duration;

/// Upper bound on never-seen cards introduced per day.
pub const MAX_NEW_CARDS_PER_DAY: usize = 15;
/// Upper bound on the size of one daily queue (due + new).
pub const MAX_DAILY_QUEUE: usize = 75;
/// A due backlog larger than this should trigger a burnout warning.
pub const BURNOUT_WARNING_THRESHOLD: usize = 80;
/// Average time spent on a single card, for session length estimates.
pub const SECONDS_PER_CARD: usize = 8;
/// Size of the bootstrap queue for a learner without history.
pub const FIRST_SESSION_CARD_COUNT: usize = 5;

pub const MIN_EASE_FACTOR: f64 = 1.3;
pub const MAX_EASE_FACTOR: f64 = 2.5;
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// How long a swipe can be undone.
pub const UNDO_WINDOW: Duration = Duration::from_millis(3000);

const DEFAULT_DB_PATH: &str = "db.sqlite3";

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub undo_window: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            undo_window: UNDO_WINDOW,
        }
    }
}

impl Config {
    /// Reads `VOCAB_DB_PATH` and `VOCAB_UNDO_WINDOW_MS`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("VOCAB_DB_PATH").filter(|p| !p.is_empty()) {
            config.db_path = PathBuf::from(path);
        }

        match lookup("VOCAB_UNDO_WINDOW_MS").map(|v| v.parse::<u64>()) {
            Some(Ok(ms)) => config.undo_window = Duration::from_millis(ms),
            Some(Err(e)) => {
                tracing::warn!("Ignoring invalid VOCAB_UNDO_WINDOW_MS: {}", e);
            }
            None => {}
        }

        config
    }
}
