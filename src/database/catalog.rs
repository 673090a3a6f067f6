//! Card catalog lookups
//!
//! `CardCatalog` is the narrow interface the queue builder reads dictionary
//! content through. `SqliteCatalog` serves it from the `cards` table.

use super::Database;
use crate::error::Result;
use crate::models::Card;
use rusqlite::types::Type;
use rusqlite::{Connection, Row, ToSql, params};

pub trait CardCatalog {
    /// Cards with the given ids, in no particular order. Unknown ids are skipped.
    fn get_cards_by_ids(&self, ids: &[String]) -> Result<Vec<Card>>;

    /// Cards at exactly `level`, ordered by id.
    fn get_cards_by_difficulty(
        &self,
        level: i32,
        exclude_ids: &[String],
        limit: usize,
    ) -> Result<Vec<Card>>;

    /// Cards at `level` carrying `topic_tag`, ordered by id.
    fn get_cards_by_topic_and_difficulty(&self, level: i32, topic_tag: &str) -> Result<Vec<Card>>;

    /// Cards of any level not in `exclude_ids`, easiest first.
    fn get_unreviewed_cards(&self, exclude_ids: &[String], limit: usize) -> Result<Vec<Card>>;

    /// Cards of any level `user_id` has no schedule for, easiest first.
    fn get_unreviewed_cards_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<Card>>;
}

const CARD_COLUMNS: &str = "id, word, definition, part_of_speech, difficulty_level, topic_tags, example_sentence, pronunciation";

#[derive(Clone)]
pub struct SqliteCatalog {
    db: Database,
}

impl SqliteCatalog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Inserts or replaces a card. Returns the card id.
    pub fn upsert_card(&self, card: &Card) -> Result<String> {
        let conn = self.db.lock()?;
        write_card(&conn, card)?;
        Ok(card.id.clone())
    }

    /// Inserts or replaces all cards in one transaction; either every card
    /// lands or none does.
    pub fn upsert_cards(&self, cards: &[Card]) -> Result<usize> {
        let mut conn = self.db.lock()?;
        let tx = conn.transaction()?;
        for card in cards {
            write_card(&tx, card)?;
        }
        tx.commit()?;
        Ok(cards.len())
    }

    pub fn card_count(&self) -> Result<usize> {
        let conn = self.db.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Every card, ordered by difficulty then id.
    pub fn all_cards(&self) -> Result<Vec<Card>> {
        self.get_unreviewed_cards(&[], usize::MAX)
    }

    fn query_cards(&self, sql: &str, args: &[&dyn ToSql]) -> Result<Vec<Card>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let cards = stmt
            .query_map(args, row_to_card)?
            .collect::<rusqlite::Result<Vec<Card>>>()?;
        Ok(cards)
    }
}

fn write_card(conn: &Connection, card: &Card) -> Result<()> {
    let tags = serde_json::to_string(&card.topic_tags)?;

    conn.execute(
        "INSERT INTO cards (id, word, definition, part_of_speech, difficulty_level, topic_tags, example_sentence, pronunciation)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(id) DO UPDATE SET
            word = excluded.word,
            definition = excluded.definition,
            part_of_speech = excluded.part_of_speech,
            difficulty_level = excluded.difficulty_level,
            topic_tags = excluded.topic_tags,
            example_sentence = excluded.example_sentence,
            pronunciation = excluded.pronunciation",
        params![
            card.id,
            card.word,
            card.definition,
            card.part_of_speech,
            card.difficulty_level,
            tags,
            card.example_sentence,
            card.pronunciation
        ],
    )?;
    Ok(())
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn row_to_card(row: &Row) -> rusqlite::Result<Card> {
    let tags_json: String = row.get(5)?;
    let topic_tags = serde_json::from_str(&tags_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;

    Ok(Card {
        id: row.get(0)?,
        word: row.get(1)?,
        definition: row.get(2)?,
        part_of_speech: row.get(3)?,
        difficulty_level: row.get(4)?,
        topic_tags,
        example_sentence: row.get(6)?,
        pronunciation: row.get(7)?,
    })
}

impl CardCatalog for SqliteCatalog {
    fn get_cards_by_ids(&self, ids: &[String]) -> Result<Vec<Card>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {} FROM cards WHERE id IN ({})",
            CARD_COLUMNS,
            placeholders(ids.len())
        );
        let args: Vec<&dyn ToSql> = ids.iter().map(|id| id as &dyn ToSql).collect();
        self.query_cards(&sql, &args)
    }

    fn get_cards_by_difficulty(
        &self,
        level: i32,
        exclude_ids: &[String],
        limit: usize,
    ) -> Result<Vec<Card>> {
        let limit = sql_limit(limit);
        let mut sql = format!("SELECT {} FROM cards WHERE difficulty_level = ?", CARD_COLUMNS);
        if !exclude_ids.is_empty() {
            sql.push_str(&format!(" AND id NOT IN ({})", placeholders(exclude_ids.len())));
        }
        sql.push_str(" ORDER BY id ASC LIMIT ?");

        let mut args: Vec<&dyn ToSql> = vec![&level];
        args.extend(exclude_ids.iter().map(|id| id as &dyn ToSql));
        args.push(&limit);
        self.query_cards(&sql, &args)
    }

    fn get_cards_by_topic_and_difficulty(&self, level: i32, topic_tag: &str) -> Result<Vec<Card>> {
        // Tags are a JSON array column; match them in memory.
        let sql = format!(
            "SELECT {} FROM cards WHERE difficulty_level = ? ORDER BY id ASC",
            CARD_COLUMNS
        );
        let cards = self.query_cards(&sql, &[&level as &dyn ToSql])?;
        Ok(cards.into_iter().filter(|c| c.has_tag(topic_tag)).collect())
    }

    fn get_unreviewed_cards(&self, exclude_ids: &[String], limit: usize) -> Result<Vec<Card>> {
        let limit = sql_limit(limit);
        let mut sql = format!("SELECT {} FROM cards", CARD_COLUMNS);
        if !exclude_ids.is_empty() {
            sql.push_str(&format!(" WHERE id NOT IN ({})", placeholders(exclude_ids.len())));
        }
        sql.push_str(" ORDER BY difficulty_level ASC, id ASC LIMIT ?");

        let mut args: Vec<&dyn ToSql> = exclude_ids.iter().map(|id| id as &dyn ToSql).collect();
        args.push(&limit);
        self.query_cards(&sql, &args)
    }

    fn get_unreviewed_cards_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<Card>> {
        // The exclusion stays in SQL so it doesn't grow with the review history.
        let limit = sql_limit(limit);
        let sql = format!(
            "SELECT {} FROM cards
             WHERE id NOT IN (SELECT card_id FROM schedule_records WHERE user_id = ?)
             ORDER BY difficulty_level ASC, id ASC LIMIT ?",
            CARD_COLUMNS
        );
        self.query_cards(&sql, &[&user_id as &dyn ToSql, &limit])
    }
}
