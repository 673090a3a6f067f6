//! SM-2 (SuperMemo 2) spaced repetition algorithm.
//!
//! The SM-2 algorithm calculates review intervals from recall quality:
//! - Each card carries an ease factor (EF) bounded to [1.3, 2.5]
//! - Quality grades 0-2: interval drops back to 1 day and EF loses 0.2
//! - Quality grades 3-5: interval grows 1 day → 6 days → previous × EF
//! - The next review is returned as an absolute UTC timestamp, never a duration

use super::{Response, ScheduleRecord};
use crate::config::{INITIAL_EASE_FACTOR, MAX_EASE_FACTOR, MIN_EASE_FACTOR};
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Sm2Review {
    pub next_interval: i32,
    pub next_ease_factor: f64,
    pub next_review_at: DateTime<Utc>,
}

/// Calculates the next interval, ease factor and due timestamp.
/// quality: 0-5 (0 = complete blackout, 5 = perfect response)
pub fn calculate_next_review(
    quality: u8,
    previous_interval: i32,
    ease_factor: f64,
    review_count: u32,
    now: DateTime<Utc>,
) -> Sm2Review {
    let (next_interval, next_ease_factor) = if quality < 3 {
        (1, (ease_factor - 0.2).max(MIN_EASE_FACTOR))
    } else {
        let interval = match review_count {
            0 => 1,
            1 => 6,
            _ => (previous_interval as f64 * ease_factor).round() as i32,
        };

        let q = quality as f64;
        let ef = ease_factor + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02));
        (interval, ef.clamp(MIN_EASE_FACTOR, MAX_EASE_FACTOR))
    };

    Sm2Review {
        next_interval,
        next_ease_factor,
        next_review_at: now + Duration::days(next_interval as i64),
    }
}

/// Interval (in days) each answer would produce, for the swipe hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalPreview {
    pub know: i32,
    pub dont_know: i32,
}

pub fn preview_intervals(record: Option<&ScheduleRecord>, now: DateTime<Utc>) -> IntervalPreview {
    let (interval, ease, count) = record
        .map(|r| (r.interval, r.ease_factor, r.review_count))
        .unwrap_or((0, INITIAL_EASE_FACTOR, 0));

    let for_response =
        |response: Response| calculate_next_review(response.quality(), interval, ease, count, now);

    IntervalPreview {
        know: for_response(Response::Know).next_interval,
        dont_know: for_response(Response::DontKnow).next_interval,
    }
}

/// Short human label for an interval in days ("1d", "2w", "3mo", "1y").
pub fn format_interval(days: i32) -> String {
    match days {
        d if d <= 0 => "now".to_string(),
        d if d < 7 => format!("{}d", d),
        d if d < 30 => format!("{}w", d / 7),
        d if d < 365 => format!("{}mo", d / 30),
        d => format!("{}y", d / 365),
    }
}
