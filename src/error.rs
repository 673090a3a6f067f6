//! Error type shared by the schedule store, catalog and seed importer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("No schedule to revert for card {card_id} (user {user_id})")]
    NoScheduleToRevert { card_id: String, user_id: String },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(i64),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Stable code reported to callers in place of the message.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Database(_) => "STORAGE_ERROR",
            StoreError::NoScheduleToRevert { .. } => "NO_SCHEDULE_TO_REVERT",
            StoreError::InvalidTimestamp(_) => "INVALID_TIMESTAMP",
            StoreError::Json(_) => "INVALID_PAYLOAD",
            StoreError::Io(_) => "IO_ERROR",
            StoreError::LockPoisoned => "STORAGE_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
