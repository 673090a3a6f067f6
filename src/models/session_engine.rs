//! In-memory position tracking for one learning screen.
//!
//! Holds the ordered queue, the index of the card on screen and a single-slot
//! undo buffer. The buffer expires `undo_window` after the swipe that filled
//! it; expiry only removes the ability to undo, it never touches schedules.

use super::{Card, Direction, ScheduleSnapshot};
use crate::clock::Clock;
use crate::config::UNDO_WINDOW;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Most recent swipe, kept until it is undone, replaced or expires.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoEntry {
    pub card_id: String,
    pub direction: Direction,
    /// State to restore if the swipe is undone. `None` when the caller had
    /// no snapshot (the revert will then be approximate).
    pub snapshot: Option<ScheduleSnapshot>,
    pub recorded_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Loading,
    /// `position` is 1-based.
    Active { position: usize, total: usize },
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueProgress {
    pub current: usize,
    pub total: usize,
}

pub struct SessionEngine {
    cards: Vec<Card>,
    loaded: bool,
    current_index: usize,
    undo_buffer: Option<UndoEntry>,
    undo_window: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl SessionEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_undo_window(clock, UNDO_WINDOW)
    }

    pub fn with_undo_window(clock: Arc<dyn Clock>, undo_window: Duration) -> Self {
        Self {
            cards: Vec::new(),
            loaded: false,
            current_index: 0,
            undo_buffer: None,
            undo_window: TimeDelta::from_std(undo_window)
                .unwrap_or_else(|_| TimeDelta::milliseconds(UNDO_WINDOW.as_millis() as i64)),
            clock,
        }
    }

    /// Replaces the queue and starts from the first card.
    pub fn load_queue(&mut self, cards: Vec<Card>) {
        self.undo_buffer = None;
        self.cards = cards;
        self.current_index = 0;
        self.loaded = true;
    }

    /// Moves past the current card and opens a fresh undo window.
    ///
    /// Returns false, leaving position and undo buffer alone, when the queue
    /// is already exhausted.
    pub fn record_swipe(
        &mut self,
        card_id: &str,
        direction: Direction,
        snapshot: Option<ScheduleSnapshot>,
    ) -> bool {
        if self.current_index >= self.cards.len() {
            return false;
        }

        let now = self.clock.now();
        self.current_index += 1;
        self.undo_buffer = Some(UndoEntry {
            card_id: card_id.to_string(),
            direction,
            snapshot,
            recorded_at: now,
            expires_at: now + self.undo_window,
        });
        true
    }

    /// The pending undo, if its window is still open.
    pub fn undo_buffer(&self) -> Option<&UndoEntry> {
        let now = self.clock.now();
        self.undo_buffer.as_ref().filter(|entry| now < entry.expires_at)
    }

    /// Drops the undo buffer once its window has passed. Returns true if it did.
    pub fn poll_expiry(&mut self) -> bool {
        let expired = self.undo_buffer.is_some() && self.undo_buffer().is_none();
        if expired {
            tracing::debug!("Undo window expired");
            self.undo_buffer = None;
        }
        expired
    }

    /// Steps back one card and hands out the buffered swipe.
    ///
    /// Only the session position is reverted; the caller reverts the schedule
    /// with the returned entry.
    pub fn undo_last_swipe(&mut self) -> Option<UndoEntry> {
        self.poll_expiry();
        let entry = self.undo_buffer.take()?;
        self.current_index = self.current_index.saturating_sub(1);
        Some(entry)
    }

    pub fn current_card(&self) -> Option<&Card> {
        self.cards.get(self.current_index)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn queue_progress(&self) -> QueueProgress {
        let total = self.cards.len();
        QueueProgress {
            current: (self.current_index + 1).min(total),
            total,
        }
    }

    pub fn remaining_count(&self) -> usize {
        self.cards.len().saturating_sub(self.current_index)
    }

    pub fn phase(&self) -> SessionPhase {
        if !self.loaded {
            SessionPhase::Loading
        } else if self.current_index < self.cards.len() {
            SessionPhase::Active {
                position: self.current_index + 1,
                total: self.cards.len(),
            }
        } else {
            SessionPhase::Exhausted
        }
    }

    /// Full teardown when the learning screen goes away.
    pub fn reset_session(&mut self) {
        self.undo_buffer = None;
        self.cards.clear();
        self.current_index = 0;
        self.loaded = false;
    }
}
