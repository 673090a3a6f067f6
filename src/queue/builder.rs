//! Daily review queue
//!
//! Overdue cards come first, most overdue at the front, capped at
//! `MAX_DAILY_QUEUE`. Whatever room is left (at most `MAX_NEW_CARDS_PER_DAY`)
//! is filled with cards the learner has never reviewed, easiest first.

use crate::config::{
    BURNOUT_WARNING_THRESHOLD, MAX_DAILY_QUEUE, MAX_NEW_CARDS_PER_DAY, SECONDS_PER_CARD,
};
use crate::database::{CardCatalog, ScheduleStore};
use crate::error::Result;
use crate::models::Card;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueResult {
    pub cards: Vec<Card>,
    pub due_count: usize,
    pub new_count: usize,
    pub estimated_minutes: usize,
    /// Due cards before the daily cap was applied.
    pub total_due: usize,
}

impl QueueResult {
    pub fn burnout_warning(&self) -> bool {
        self.total_due > BURNOUT_WARNING_THRESHOLD
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

pub fn estimated_minutes(card_count: usize) -> usize {
    (card_count * SECONDS_PER_CARD).div_ceil(60)
}

pub struct QueueBuilder<'a, C: CardCatalog> {
    pub(crate) store: &'a ScheduleStore,
    pub(crate) catalog: &'a C,
}

impl<'a, C: CardCatalog> QueueBuilder<'a, C> {
    pub fn new(store: &'a ScheduleStore, catalog: &'a C) -> Self {
        Self { store, catalog }
    }

    pub fn fetch_sr_queue(&self, user_id: &str) -> Result<QueueResult> {
        let due = self.store.due_schedules(user_id)?;
        let total_due = due.len();

        let due_ids: Vec<String> = due
            .into_iter()
            .take(MAX_DAILY_QUEUE)
            .map(|record| record.card_id)
            .collect();
        let due_cards = restore_order(self.catalog.get_cards_by_ids(&due_ids)?, &due_ids);

        let remaining = MAX_NEW_CARDS_PER_DAY.min(MAX_DAILY_QUEUE.saturating_sub(due_cards.len()));
        let new_cards = if remaining > 0 {
            self.catalog.get_unreviewed_cards_for_user(user_id, remaining)?
        } else {
            Vec::new()
        };

        let due_count = due_cards.len();
        let new_count = new_cards.len();
        let mut cards = due_cards;
        cards.extend(new_cards);

        info!(
            user_id,
            due_count, new_count, total_due, "Review queue built"
        );

        Ok(QueueResult {
            estimated_minutes: estimated_minutes(cards.len()),
            cards,
            due_count,
            new_count,
            total_due,
        })
    }
}

/// Puts catalog rows back into the order of `ids`, dropping ids with no row.
fn restore_order(cards: Vec<Card>, ids: &[String]) -> Vec<Card> {
    let mut by_id: HashMap<String, Card> =
        cards.into_iter().map(|card| (card.id.clone(), card)).collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}
