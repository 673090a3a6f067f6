//! Per-(user, card) schedule persistence
//!
//! Applies SM-2 results to `schedule_records`, writes the review event log and
//! rolls adjustments back from snapshots. Every mutation runs in a single
//! IMMEDIATE transaction under the connection lock, so schedule rows and the
//! events describing them commit or roll back together and read-modify-write
//! cycles on the same card never interleave.

use super::Database;
use super::db::{millis_column, to_millis, truncate_to_millis};
use crate::clock::Clock;
use crate::config::INITIAL_EASE_FACTOR;
use crate::error::{Result, StoreError};
use crate::models::depth::{MIN_DEPTH_LEVEL, calculate_depth_level};
use crate::models::sm2::calculate_next_review;
use crate::models::{
    CardReviewEvent, Direction, EventType, Response, ScheduleRecord, ScheduleSnapshot,
};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of a successful `adjust_schedule`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleAdjustment {
    pub next_review_at: DateTime<Utc>,
    /// Hand this back to `revert_schedule_adjustment` to undo exactly.
    pub previous_state: ScheduleSnapshot,
    pub record: ScheduleRecord,
    pub depth_advanced: bool,
}

pub struct ScheduleStore {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl ScheduleStore {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn get_schedule(&self, card_id: &str, user_id: &str) -> Result<Option<ScheduleRecord>> {
        let conn = self.db.lock()?;
        Ok(select_record(&conn, user_id, card_id)?)
    }

    /// Applies one answer to the card's schedule, creating the record on the
    /// first review.
    pub fn adjust_schedule(
        &self,
        card_id: &str,
        user_id: &str,
        response: Response,
    ) -> Result<ScheduleAdjustment> {
        let now = self.clock.now();
        let quality = response.quality();
        let hit = if quality >= 3 { 1.0 } else { 0.0 };

        let mut conn = self.db.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (record, previous_state, depth_advanced) = match select_record(&tx, user_id, card_id)? {
            None => {
                let review = calculate_next_review(quality, 0, INITIAL_EASE_FACTOR, 0, now);
                let record = ScheduleRecord {
                    user_id: user_id.to_string(),
                    card_id: card_id.to_string(),
                    interval: review.next_interval,
                    ease_factor: review.next_ease_factor,
                    next_review_at: truncate_to_millis(review.next_review_at)?,
                    review_count: 1,
                    accuracy: hit,
                    depth_level: MIN_DEPTH_LEVEL,
                };
                (record, ScheduleSnapshot::NoPriorSchedule, false)
            }
            Some(prev) => {
                let review = calculate_next_review(
                    quality,
                    prev.interval,
                    prev.ease_factor,
                    prev.review_count,
                    now,
                );
                let review_count = prev.review_count + 1;
                let accuracy = (prev.accuracy * prev.review_count as f64 + hit) / review_count as f64;
                let depth_level =
                    calculate_depth_level(review_count, review.next_ease_factor, accuracy);

                let record = ScheduleRecord {
                    user_id: user_id.to_string(),
                    card_id: card_id.to_string(),
                    interval: review.next_interval,
                    ease_factor: review.next_ease_factor,
                    next_review_at: truncate_to_millis(review.next_review_at)?,
                    review_count,
                    accuracy,
                    depth_level,
                };
                let advanced = depth_level > prev.depth_level;
                (record, prev.snapshot(), advanced)
            }
        };

        write_record(&tx, &record)?;

        if depth_advanced {
            if let ScheduleSnapshot::Prior { depth_level: from, .. } = &previous_state {
                let payload = json!({
                    "from": from,
                    "to": record.depth_level,
                    "reviewCount": record.review_count,
                    "timestamp": now.to_rfc3339(),
                });
                insert_event(&tx, user_id, card_id, EventType::DepthAdvanced, &payload, now)?;
            }
        }

        tx.commit()?;

        debug!(
            user_id,
            card_id,
            quality,
            interval = record.interval,
            ease_factor = record.ease_factor,
            review_count = record.review_count,
            "Schedule adjusted"
        );
        if depth_advanced {
            info!(user_id, card_id, depth_level = record.depth_level, "Depth level advanced");
        }

        Ok(ScheduleAdjustment {
            next_review_at: record.next_review_at,
            previous_state,
            record,
            depth_advanced,
        })
    }

    /// Rolls a card's schedule back.
    ///
    /// With a snapshot the previous state is restored exactly. Records are
    /// never deleted, so undoing a first review resets the record to a
    /// never-reviewed state that is due now. Without a snapshot the revert
    /// is approximate: the review count drops by one and the card becomes due
    /// now, but ease factor, accuracy and depth stay as they are.
    pub fn revert_schedule_adjustment(
        &self,
        card_id: &str,
        user_id: &str,
        previous_state: Option<&ScheduleSnapshot>,
    ) -> Result<()> {
        let now = self.clock.now();

        let mut conn = self.db.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = select_record(&tx, user_id, card_id)?.ok_or_else(|| {
            StoreError::NoScheduleToRevert {
                card_id: card_id.to_string(),
                user_id: user_id.to_string(),
            }
        })?;

        let mode = match previous_state {
            Some(ScheduleSnapshot::Prior {
                interval,
                ease_factor,
                next_review_at,
                review_count,
                accuracy,
                depth_level,
            }) => {
                let restored = ScheduleRecord {
                    interval: *interval,
                    ease_factor: *ease_factor,
                    next_review_at: *next_review_at,
                    review_count: *review_count,
                    accuracy: *accuracy,
                    depth_level: *depth_level,
                    ..current
                };
                write_record(&tx, &restored)?;
                "snapshot"
            }
            Some(ScheduleSnapshot::NoPriorSchedule) => {
                let unreviewed = ScheduleRecord {
                    interval: 0,
                    ease_factor: INITIAL_EASE_FACTOR,
                    next_review_at: truncate_to_millis(now)?,
                    review_count: 0,
                    accuracy: 0.0,
                    depth_level: MIN_DEPTH_LEVEL,
                    ..current
                };
                write_record(&tx, &unreviewed)?;
                "firstReview"
            }
            None => {
                warn!(
                    user_id,
                    card_id, "Reverting without a snapshot; ease factor and accuracy are kept"
                );
                let approximate = ScheduleRecord {
                    review_count: current.review_count.saturating_sub(1),
                    next_review_at: truncate_to_millis(now)?,
                    ..current
                };
                write_record(&tx, &approximate)?;
                "approximate"
            }
        };

        let payload = json!({ "mode": mode, "timestamp": now.to_rfc3339() });
        insert_event(&tx, user_id, card_id, EventType::ScheduleReverted, &payload, now)?;

        tx.commit()?;
        debug!(user_id, card_id, mode, "Schedule reverted");
        Ok(())
    }

    /// Appends a CARD_REVIEWED event. Returns the event id.
    pub fn log_learning_event(
        &self,
        card_id: &str,
        user_id: &str,
        direction: Direction,
    ) -> Result<String> {
        let now = self.clock.now();
        let payload = json!({
            "direction": direction.as_str(),
            "quality": direction.quality(),
            "timestamp": now.to_rfc3339(),
        });

        let conn = self.db.lock()?;
        insert_event(&conn, user_id, card_id, EventType::CardReviewed, &payload, now)
    }

    /// Records due at or before now, most overdue first.
    pub fn due_schedules(&self, user_id: &str) -> Result<Vec<ScheduleRecord>> {
        let now = to_millis(self.clock.now());
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, card_id, interval_days, ease_factor, next_review_at, review_count, accuracy, depth_level
             FROM schedule_records
             WHERE user_id = ?1 AND next_review_at <= ?2
             ORDER BY next_review_at ASC, card_id ASC",
        )?;
        let records = stmt
            .query_map(params![user_id, now], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Ids of every card the user has ever reviewed.
    pub fn reviewed_card_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(
            "SELECT card_id FROM schedule_records WHERE user_id = ?1 ORDER BY card_id ASC",
        )?;
        let ids = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    /// Review log for one card, oldest first.
    pub fn events_for(&self, card_id: &str, user_id: &str) -> Result<Vec<CardReviewEvent>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, card_id, event_type, payload, created_at
             FROM review_events
             WHERE user_id = ?1 AND card_id = ?2
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let events = stmt
            .query_map(params![user_id, card_id], row_to_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }
}

fn select_record(
    conn: &Connection,
    user_id: &str,
    card_id: &str,
) -> rusqlite::Result<Option<ScheduleRecord>> {
    conn.query_row(
        "SELECT user_id, card_id, interval_days, ease_factor, next_review_at, review_count, accuracy, depth_level
         FROM schedule_records
         WHERE user_id = ?1 AND card_id = ?2",
        params![user_id, card_id],
        row_to_record,
    )
    .optional()
}

fn write_record(conn: &Connection, record: &ScheduleRecord) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO schedule_records
            (user_id, card_id, interval_days, ease_factor, next_review_at, review_count, accuracy, depth_level)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(user_id, card_id) DO UPDATE SET
            interval_days = excluded.interval_days,
            ease_factor = excluded.ease_factor,
            next_review_at = excluded.next_review_at,
            review_count = excluded.review_count,
            accuracy = excluded.accuracy,
            depth_level = excluded.depth_level",
        params![
            record.user_id,
            record.card_id,
            record.interval,
            record.ease_factor,
            to_millis(record.next_review_at),
            record.review_count,
            record.accuracy,
            record.depth_level
        ],
    )?;
    Ok(())
}

fn insert_event(
    conn: &Connection,
    user_id: &str,
    card_id: &str,
    event_type: EventType,
    payload: &serde_json::Value,
    created_at: DateTime<Utc>,
) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO review_events (id, user_id, card_id, event_type, payload, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id,
            user_id,
            card_id,
            event_type.as_str(),
            serde_json::to_string(payload)?,
            to_millis(created_at)
        ],
    )?;
    Ok(id)
}

fn row_to_record(row: &Row) -> rusqlite::Result<ScheduleRecord> {
    Ok(ScheduleRecord {
        user_id: row.get(0)?,
        card_id: row.get(1)?,
        interval: row.get(2)?,
        ease_factor: row.get(3)?,
        next_review_at: millis_column(row, 4)?,
        review_count: row.get(5)?,
        accuracy: row.get(6)?,
        depth_level: row.get(7)?,
    })
}

fn row_to_event(row: &Row) -> rusqlite::Result<CardReviewEvent> {
    let event_type: String = row.get(3)?;
    let payload: String = row.get(4)?;

    Ok(CardReviewEvent {
        id: row.get(0)?,
        user_id: row.get(1)?,
        card_id: row.get(2)?,
        event_type: EventType::parse(&event_type).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                Type::Text,
                format!("unknown event type {}", event_type).into(),
            )
        })?,
        payload: serde_json::from_str(&payload)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        created_at: millis_column(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, TimeZone};

    const USER: &str = "user-1";

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
    }

    fn store() -> (ScheduleStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let store = ScheduleStore::new(Database::open_in_memory().unwrap(), clock.clone());
        (store, clock)
    }

    fn count_events(store: &ScheduleStore, card_id: &str, event_type: EventType) -> usize {
        store
            .events_for(card_id, USER)
            .unwrap()
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    #[test]
    fn test_first_review_creates_record() {
        let (store, _) = store();

        let adjustment = store.adjust_schedule("c1", USER, Response::Know).unwrap();

        assert_eq!(adjustment.previous_state, ScheduleSnapshot::NoPriorSchedule);
        assert_eq!(adjustment.next_review_at, start() + Duration::days(1));

        let record = store.get_schedule("c1", USER).unwrap().unwrap();
        assert_eq!(record.interval, 1);
        assert_eq!(record.review_count, 1);
        assert_eq!(record.accuracy, 1.0);
        assert_eq!(record.depth_level, 1);
        assert_eq!(record, adjustment.record);
    }

    #[test]
    fn test_first_review_failure_sets_zero_accuracy() {
        let (store, _) = store();
        store.adjust_schedule("c1", USER, Response::DontKnow).unwrap();

        let record = store.get_schedule("c1", USER).unwrap().unwrap();
        assert_eq!(record.accuracy, 0.0);
        assert_eq!(record.interval, 1);
        assert!((record.ease_factor - 2.3).abs() < 1e-9);
    }

    #[test]
    fn test_second_review_and_running_accuracy() {
        let (store, clock) = store();
        store.adjust_schedule("c1", USER, Response::Know).unwrap();
        clock.advance_days(1);

        let adjustment = store.adjust_schedule("c1", USER, Response::Know).unwrap();
        assert_eq!(adjustment.record.interval, 6);
        assert_eq!(adjustment.record.review_count, 2);
        assert!(matches!(
            adjustment.previous_state,
            ScheduleSnapshot::Prior { review_count: 1, interval: 1, .. }
        ));

        clock.advance_days(6);
        let adjustment = store.adjust_schedule("c1", USER, Response::DontKnow).unwrap();
        assert_eq!(adjustment.record.interval, 1);
        assert_eq!(adjustment.record.review_count, 3);
        assert!((adjustment.record.accuracy - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_undo_with_snapshot_is_exact() {
        let (store, clock) = store();
        store.adjust_schedule("c1", USER, Response::Know).unwrap();
        clock.advance_days(1);
        store.adjust_schedule("c1", USER, Response::DontKnow).unwrap();
        clock.advance(Duration::hours(30));

        let before = store.get_schedule("c1", USER).unwrap().unwrap();
        let adjustment = store.adjust_schedule("c1", USER, Response::Know).unwrap();
        assert_ne!(store.get_schedule("c1", USER).unwrap().unwrap(), before);

        store
            .revert_schedule_adjustment("c1", USER, Some(&adjustment.previous_state))
            .unwrap();

        let after = store.get_schedule("c1", USER).unwrap().unwrap();
        assert_eq!(after, before);
        assert_eq!(after.ease_factor.to_bits(), before.ease_factor.to_bits());
        assert_eq!(after.accuracy.to_bits(), before.accuracy.to_bits());
    }

    #[test]
    fn test_undo_first_review_resets_record_and_keeps_log() {
        let (store, clock) = store();
        store.log_learning_event("c1", USER, Direction::Right).unwrap();
        let adjustment = store.adjust_schedule("c1", USER, Response::Know).unwrap();

        clock.advance(Duration::seconds(2));
        store
            .revert_schedule_adjustment("c1", USER, Some(&adjustment.previous_state))
            .unwrap();

        let record = store.get_schedule("c1", USER).unwrap().unwrap();
        assert_eq!(record.review_count, 0);
        assert_eq!(record.interval, 0);
        assert_eq!(record.ease_factor, INITIAL_EASE_FACTOR);
        assert_eq!(record.accuracy, 0.0);
        assert_eq!(record.depth_level, MIN_DEPTH_LEVEL);
        assert_eq!(record.next_review_at, clock.now());
        assert_eq!(store.due_schedules(USER).unwrap().len(), 1);
        assert_eq!(count_events(&store, "c1", EventType::CardReviewed), 1);
        assert_eq!(count_events(&store, "c1", EventType::ScheduleReverted), 1);

        // Reviewing again counts as the first real review.
        let again = store.adjust_schedule("c1", USER, Response::Know).unwrap();
        assert_eq!(again.record.review_count, 1);
        assert_eq!(again.record.interval, 1);
        assert_eq!(again.record.accuracy, 1.0);
    }

    #[test]
    fn test_revert_without_record_fails() {
        let (store, _) = store();
        let err = store
            .revert_schedule_adjustment("missing", USER, None)
            .unwrap_err();
        assert_eq!(err.code(), "NO_SCHEDULE_TO_REVERT");
    }

    #[test]
    fn test_lossy_revert_without_snapshot() {
        let (store, clock) = store();
        store.adjust_schedule("c1", USER, Response::Know).unwrap();
        clock.advance_days(1);
        store.adjust_schedule("c1", USER, Response::Know).unwrap();
        let adjusted = store.get_schedule("c1", USER).unwrap().unwrap();

        clock.advance(Duration::seconds(5));
        store.revert_schedule_adjustment("c1", USER, None).unwrap();

        let reverted = store.get_schedule("c1", USER).unwrap().unwrap();
        assert_eq!(reverted.review_count, 1);
        assert_eq!(reverted.next_review_at, clock.now());
        assert_eq!(reverted.ease_factor, adjusted.ease_factor);
        assert_eq!(reverted.accuracy, adjusted.accuracy);
        assert_eq!(reverted.interval, adjusted.interval);
    }

    #[test]
    fn test_depth_advanced_events() {
        let (store, clock) = store();
        for _ in 0..10 {
            store.adjust_schedule("c1", USER, Response::Know).unwrap();
            clock.advance_days(1);
        }

        let record = store.get_schedule("c1", USER).unwrap().unwrap();
        assert_eq!(record.depth_level, 4);
        assert_eq!(count_events(&store, "c1", EventType::DepthAdvanced), 3);

        let events = store.events_for("c1", USER).unwrap();
        let last = events
            .iter()
            .filter(|e| e.event_type == EventType::DepthAdvanced)
            .last()
            .unwrap();
        assert_eq!(last.payload["from"], 3);
        assert_eq!(last.payload["to"], 4);
    }

    #[test]
    fn test_failed_event_write_rolls_back_schedule() {
        let (store, clock) = store();
        for _ in 0..2 {
            store.adjust_schedule("c1", USER, Response::Know).unwrap();
            clock.advance_days(1);
        }
        let before = store.get_schedule("c1", USER).unwrap().unwrap();
        store
            .db
            .lock()
            .unwrap()
            .execute_batch("DROP TABLE review_events")
            .unwrap();

        // The third correct answer reaches depth 2, so an event must be written.
        let err = store.adjust_schedule("c1", USER, Response::Know).unwrap_err();

        assert_eq!(err.code(), "STORAGE_ERROR");
        assert_eq!(store.get_schedule("c1", USER).unwrap(), Some(before));
    }

    #[test]
    fn test_depth_regression_emits_nothing() {
        let (store, clock) = store();
        for _ in 0..10 {
            store.adjust_schedule("c1", USER, Response::Know).unwrap();
            clock.advance_days(1);
        }
        store.adjust_schedule("c1", USER, Response::DontKnow).unwrap();
        store.adjust_schedule("c1", USER, Response::DontKnow).unwrap();

        let record = store.get_schedule("c1", USER).unwrap().unwrap();
        assert_eq!(record.depth_level, 2);
        assert_eq!(count_events(&store, "c1", EventType::DepthAdvanced), 3);
    }

    #[test]
    fn test_log_learning_event_payload() {
        let (store, _) = store();
        let id = store.log_learning_event("c1", USER, Direction::Up).unwrap();

        let events = store.events_for("c1", USER).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, id);
        assert_eq!(events[0].event_type, EventType::CardReviewed);
        assert_eq!(events[0].payload["direction"], "up");
        assert_eq!(events[0].payload["quality"], 0);
        assert_eq!(events[0].created_at, start());
    }

    #[test]
    fn test_due_schedules_most_overdue_first() {
        let (store, clock) = store();
        // Reviewed on different days, each due one day later.
        for card in ["t3", "t1", "t5"] {
            store.adjust_schedule(card, USER, Response::Know).unwrap();
        }
        let conn = store.db.lock().unwrap();
        for (card, days_ago) in [("t3", 3), ("t1", 1), ("t5", 5)] {
            conn.execute(
                "UPDATE schedule_records SET next_review_at = ?1 WHERE card_id = ?2",
                params![to_millis(start() - Duration::days(days_ago)), card],
            )
            .unwrap();
        }
        drop(conn);

        let due: Vec<String> = store
            .due_schedules(USER)
            .unwrap()
            .into_iter()
            .map(|r| r.card_id)
            .collect();
        assert_eq!(due, vec!["t5", "t3", "t1"]);

        clock.set(start() - Duration::days(4));
        assert_eq!(store.due_schedules(USER).unwrap().len(), 1);
        assert!(store.due_schedules("someone-else").unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_adjustments_are_serialized() {
        let (store, _) = store();
        let store = Arc::new(store);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let store = Arc::clone(&store);
                scope.spawn(move || {
                    for _ in 0..5 {
                        store.adjust_schedule("c1", USER, Response::Know).unwrap();
                    }
                });
            }
        });

        let record = store.get_schedule("c1", USER).unwrap().unwrap();
        assert_eq!(record.review_count, 40);
        assert_eq!(store.reviewed_card_ids(USER).unwrap(), vec!["c1".to_string()]);
    }
}
