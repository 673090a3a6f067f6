//! Bootstrap word selection for a learner with no review history.
//!
//! Goal-tagged words at the learner's level come first, then any word at that
//! level, then words one level up. A short catalog yields a short list; the
//! caller shows that as "no content", not as a failure.

use super::QueueBuilder;
use crate::config::FIRST_SESSION_CARD_COUNT;
use crate::database::CardCatalog;
use crate::error::Result;
use crate::models::Card;

impl<C: CardCatalog> QueueBuilder<'_, C> {
    pub fn select_first_session_words(
        &self,
        level: i32,
        goal_tag: Option<&str>,
    ) -> Result<Vec<Card>> {
        let mut chosen: Vec<Card> = Vec::with_capacity(FIRST_SESSION_CARD_COUNT);

        if let Some(tag) = goal_tag {
            chosen.extend(
                self.catalog
                    .get_cards_by_topic_and_difficulty(level, tag)?
                    .into_iter()
                    .take(FIRST_SESSION_CARD_COUNT),
            );
        }

        for fill_level in [level, level.saturating_add(1)] {
            if chosen.len() >= FIRST_SESSION_CARD_COUNT {
                break;
            }
            let exclude: Vec<String> = chosen.iter().map(|card| card.id.clone()).collect();
            let fill = self.catalog.get_cards_by_difficulty(
                fill_level,
                &exclude,
                FIRST_SESSION_CARD_COUNT - chosen.len(),
            )?;
            chosen.extend(fill);
        }

        if chosen.len() < FIRST_SESSION_CARD_COUNT {
            tracing::info!(
                level,
                goal = goal_tag.unwrap_or("-"),
                found = chosen.len(),
                "Not enough words for a full first session"
            );
        }

        Ok(chosen)
    }
}
