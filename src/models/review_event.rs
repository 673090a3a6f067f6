//! Learner input (swipe directions, responses) and the append-only review log.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Swipe gesture on a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Right,
    Left,
    Up,
}

impl Direction {
    /// Quality recorded in the review log for this gesture.
    pub fn quality(self) -> u8 {
        match self {
            Direction::Right => 4,
            Direction::Left => 1,
            Direction::Up => 0,
        }
    }

    /// Answer fed to the scheduler. Only a right swipe counts as recalled.
    pub fn response(self) -> Response {
        match self {
            Direction::Right => Response::Know,
            Direction::Left | Direction::Up => Response::DontKnow,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Right => "right",
            Direction::Left => "left",
            Direction::Up => "up",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "right" | "r" => Ok(Direction::Right),
            "left" | "l" => Ok(Direction::Left),
            "up" | "u" => Ok(Direction::Up),
            other => Err(format!("unknown swipe direction '{}'", other)),
        }
    }
}

/// Answer to "do you know this word?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Response {
    Know,
    DontKnow,
}

impl Response {
    pub fn quality(self) -> u8 {
        match self {
            Response::Know => 4,
            Response::DontKnow => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    CardReviewed,
    DepthAdvanced,
    ScheduleReverted,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::CardReviewed => "CARD_REVIEWED",
            EventType::DepthAdvanced => "DEPTH_ADVANCED",
            EventType::ScheduleReverted => "SCHEDULE_REVERTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CARD_REVIEWED" => Some(EventType::CardReviewed),
            "DEPTH_ADVANCED" => Some(EventType::DepthAdvanced),
            "SCHEDULE_REVERTED" => Some(EventType::ScheduleReverted),
            _ => None,
        }
    }
}

/// Entry of the append-only review log. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardReviewEvent {
    pub id: String,
    pub user_id: String,
    pub card_id: String,
    pub event_type: EventType,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
