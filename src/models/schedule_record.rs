//! Per-(user, card) spaced repetition state and the snapshot used to undo a
//! single adjustment.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRecord {
    pub user_id: String,
    pub card_id: String,
    pub interval: i32,
    pub ease_factor: f64,
    pub next_review_at: DateTime<Utc>,
    pub review_count: u32,
    pub accuracy: f64,
    pub depth_level: u8,
}

impl ScheduleRecord {
    /// Captures the mutable fields so an adjustment can be rolled back exactly.
    pub fn snapshot(&self) -> ScheduleSnapshot {
        ScheduleSnapshot::Prior {
            interval: self.interval,
            ease_factor: self.ease_factor,
            next_review_at: self.next_review_at,
            review_count: self.review_count,
            accuracy: self.accuracy,
            depth_level: self.depth_level,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at <= now
    }
}

/// State of a schedule before an adjustment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ScheduleSnapshot {
    /// The adjustment was the card's first review; there was no record.
    NoPriorSchedule,
    #[serde(rename_all = "camelCase")]
    Prior {
        interval: i32,
        ease_factor: f64,
        next_review_at: DateTime<Utc>,
        review_count: u32,
        accuracy: f64,
        depth_level: u8,
    },
}
