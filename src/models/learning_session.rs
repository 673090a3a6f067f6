//! Learning session management for swipe-based review.
//! Connects the on-screen queue to the schedule store: a swipe adjusts the
//! card's SM-2 schedule and advances, an undo restores the schedule and steps back.

use super::session_engine::{QueueProgress, SessionEngine, SessionPhase, UndoEntry};
use super::{Card, Direction};
use crate::clock::Clock;
use crate::database::{ScheduleAdjustment, ScheduleStore};
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// One learner working through one queue.
pub struct LearningSession {
    pub user_id: String,
    store: Arc<ScheduleStore>,
    engine: SessionEngine,
}

impl LearningSession {
    pub fn new(
        user_id: &str,
        store: Arc<ScheduleStore>,
        clock: Arc<dyn Clock>,
        undo_window: Duration,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            store,
            engine: SessionEngine::with_undo_window(clock, undo_window),
        }
    }

    pub fn start(&mut self, cards: Vec<Card>) {
        tracing::debug!(user_id = %self.user_id, cards = cards.len(), "Learning session started");
        self.engine.load_queue(cards);
    }

    pub fn current_card(&self) -> Option<&Card> {
        self.engine.current_card()
    }

    /// Grades the current card and moves on.
    ///
    /// Returns `Ok(None)` when the queue is already exhausted. The review log
    /// write is best effort: a failure there is logged and the swipe still
    /// goes through.
    pub fn swipe(&mut self, direction: Direction) -> Result<Option<ScheduleAdjustment>> {
        let Some(card_id) = self.engine.current_card().map(|c| c.id.clone()) else {
            return Ok(None);
        };

        let adjustment = self
            .store
            .adjust_schedule(&card_id, &self.user_id, direction.response())?;

        if let Err(e) = self
            .store
            .log_learning_event(&card_id, &self.user_id, direction)
        {
            tracing::warn!(card_id = %card_id, "Failed to log review event: {}", e);
        }

        self.engine.record_swipe(
            &card_id,
            direction,
            Some(adjustment.previous_state.clone()),
        );
        Ok(Some(adjustment))
    }

    /// Reverts the last swipe if its undo window is still open.
    ///
    /// The schedule is restored first; if that fails the session position is
    /// left alone so the undo can be retried.
    pub fn undo(&mut self) -> Result<Option<UndoEntry>> {
        let Some(entry) = self.engine.undo_buffer().cloned() else {
            self.engine.poll_expiry();
            return Ok(None);
        };

        self.store
            .revert_schedule_adjustment(&entry.card_id, &self.user_id, entry.snapshot.as_ref())?;
        self.engine.undo_last_swipe();
        Ok(Some(entry))
    }

    pub fn pending_undo(&self) -> Option<&UndoEntry> {
        self.engine.undo_buffer()
    }

    pub fn progress(&self) -> QueueProgress {
        self.engine.queue_progress()
    }

    pub fn phase(&self) -> SessionPhase {
        self.engine.phase()
    }

    pub fn remaining_count(&self) -> usize {
        self.engine.remaining_count()
    }

    pub fn is_completed(&self) -> bool {
        self.engine.phase() == SessionPhase::Exhausted
    }

    /// Tears the session down (screen unmount). Schedules are untouched.
    pub fn end(&mut self) {
        self.engine.reset_session();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::UNDO_WINDOW;
    use crate::database::Database;
    use crate::models::EventType;
    use chrono::{TimeDelta, TimeZone, Utc};

    const USER: &str = "learner";

    fn session_with(n: usize) -> (LearningSession, Arc<ScheduleStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ));
        let store = Arc::new(ScheduleStore::new(
            Database::open_in_memory().unwrap(),
            clock.clone(),
        ));
        let mut session = LearningSession::new(USER, store.clone(), clock.clone(), UNDO_WINDOW);
        let cards = (0..n)
            .map(|i| Card::new(&format!("c{}", i), "word", "definition", 0))
            .collect();
        session.start(cards);
        (session, store, clock)
    }

    #[test]
    fn test_swipe_adjusts_logs_and_advances() {
        let (mut session, store, _) = session_with(2);

        let adjustment = session.swipe(Direction::Right).unwrap().unwrap();
        assert_eq!(adjustment.record.card_id, "c0");
        assert_eq!(session.current_card().unwrap().id, "c1");
        assert!(store.get_schedule("c0", USER).unwrap().is_some());

        let events = store.events_for("c0", USER).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::CardReviewed);
    }

    #[test]
    fn test_swipe_on_exhausted_queue() {
        let (mut session, _, _) = session_with(1);
        session.swipe(Direction::Left).unwrap();
        assert!(session.is_completed());
        assert!(session.swipe(Direction::Left).unwrap().is_none());

        // The real swipe is still the one that gets undone.
        let entry = session.undo().unwrap().unwrap();
        assert_eq!(entry.card_id, "c0");
        assert_eq!(session.current_card().unwrap().id, "c0");
        assert!(session.undo().unwrap().is_none());
    }

    #[test]
    fn test_undo_restores_schedule_and_position() {
        let (mut session, store, clock) = session_with(2);
        session.swipe(Direction::Right).unwrap();
        session.start(vec![Card::new("c0", "word", "definition", 0)]);
        clock.advance_days(1);

        let before = store.get_schedule("c0", USER).unwrap().unwrap();
        session.swipe(Direction::Left).unwrap();
        clock.advance(TimeDelta::milliseconds(1000));

        let entry = session.undo().unwrap().unwrap();
        assert_eq!(entry.card_id, "c0");
        assert_eq!(session.current_card().unwrap().id, "c0");
        assert_eq!(store.get_schedule("c0", USER).unwrap().unwrap(), before);
    }

    #[test]
    fn test_undo_after_window_is_noop() {
        let (mut session, store, clock) = session_with(2);
        session.swipe(Direction::Right).unwrap();
        clock.advance(TimeDelta::milliseconds(3000));

        assert!(session.undo().unwrap().is_none());
        assert!(session.pending_undo().is_none());
        assert_eq!(session.current_card().unwrap().id, "c1");
        assert!(store.get_schedule("c0", USER).unwrap().is_some());
    }

    #[test]
    fn test_progress_and_end() {
        let (mut session, _, _) = session_with(3);
        session.swipe(Direction::Right).unwrap();
        assert_eq!(session.progress(), QueueProgress { current: 2, total: 3 });
        assert_eq!(session.remaining_count(), 2);

        session.end();
        assert_eq!(session.phase(), SessionPhase::Loading);
    }
}
