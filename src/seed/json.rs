//! JSON import/export for the card catalog.
//! Import validates every entry and reports all problems at once instead of
//! stopping at the first bad card.

use crate::database::SqliteCatalog;
use crate::error::Result;
use crate::models::Card;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Outcome of a seed import.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SeedReport {
    pub imported: usize,
    /// One message per rejected entry.
    pub errors: Vec<String>,
}

impl SeedReport {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// Problems with a single card, empty when it is valid.
pub fn validate_card(card: &Card) -> Vec<String> {
    let mut problems = Vec::new();
    if card.id.trim().is_empty() {
        problems.push("missing id".to_string());
    }
    if card.word.trim().is_empty() {
        problems.push("missing word".to_string());
    }
    if card.definition.trim().is_empty() {
        problems.push("missing definition".to_string());
    }
    if card.difficulty_level < 0 {
        problems.push(format!("negative difficulty {}", card.difficulty_level));
    }
    problems
}

/// Loads a JSON array of cards into the catalog.
/// Fails if the file can't be read, isn't a JSON array of cards, or the
/// write fails; valid cards are written in one transaction, so a failed
/// import leaves the catalog untouched.
pub fn import_cards(path: impl AsRef<Path>, catalog: &SqliteCatalog) -> Result<SeedReport> {
    let contents = fs::read_to_string(path.as_ref())?;
    let cards: Vec<Card> = serde_json::from_str(&contents)?;

    let mut report = SeedReport::default();
    let mut seen = HashSet::new();
    let mut valid = Vec::with_capacity(cards.len());

    for (index, card) in cards.iter().enumerate() {
        let mut problems = validate_card(card);
        if !card.id.trim().is_empty() && !seen.insert(card.id.clone()) {
            problems.push(format!("duplicate id '{}'", card.id));
        }

        if problems.is_empty() {
            valid.push(card.clone());
        } else {
            report
                .errors
                .push(format!("entry {}: {}", index, problems.join(", ")));
        }
    }

    report.imported = catalog.upsert_cards(&valid)?;

    tracing::info!(
        path = %path.as_ref().display(),
        imported = report.imported,
        errors = report.error_count(),
        "Card seed imported"
    );
    for error in &report.errors {
        tracing::warn!("Rejected seed card {}", error);
    }

    Ok(report)
}

/// Writes the whole catalog as pretty-printed JSON.
pub fn export_cards_to_path(catalog: &SqliteCatalog, path: impl AsRef<Path>) -> Result<usize> {
    let cards = catalog.all_cards()?;
    fs::write(path.as_ref(), serde_json::to_string_pretty(&cards)?)?;
    Ok(cards.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{CardCatalog, Database};

    fn catalog() -> SqliteCatalog {
        SqliteCatalog::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn test_import_cards() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        fs::write(
            &path,
            r#"[
  {
    "id": "w1",
    "word": "passport",
    "definition": "paszport",
    "partOfSpeech": "noun",
    "difficultyLevel": 0,
    "topicTags": ["travel"]
  },
  {
    "id": "w2",
    "word": "hypothesis",
    "definition": "hipoteza",
    "partOfSpeech": "noun",
    "difficultyLevel": 3
  }
]"#,
        )
        .unwrap();

        let catalog = catalog();
        let report = import_cards(&path, &catalog).unwrap();

        assert_eq!(report.imported, 2);
        assert!(report.errors.is_empty());
        let cards = catalog.get_cards_by_ids(&["w1".to_string()]).unwrap();
        assert_eq!(cards[0].topic_tags, vec!["travel".to_string()]);
    }

    #[test]
    fn test_import_collects_all_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        fs::write(
            &path,
            r#"[
  {"id": "ok", "word": "w", "definition": "d", "partOfSpeech": "", "difficultyLevel": 0},
  {"id": "", "word": "", "definition": "d", "partOfSpeech": "", "difficultyLevel": 0},
  {"id": "neg", "word": "w", "definition": "d", "partOfSpeech": "", "difficultyLevel": -1},
  {"id": "ok", "word": "again", "definition": "d", "partOfSpeech": "", "difficultyLevel": 1}
]"#,
        )
        .unwrap();

        let catalog = catalog();
        let report = import_cards(&path, &catalog).unwrap();

        assert_eq!(report.imported, 1);
        assert_eq!(report.error_count(), 3);
        assert!(report.errors[0].starts_with("entry 1: missing id, missing word"));
        assert!(report.errors[2].contains("duplicate id 'ok'"));
        assert_eq!(catalog.card_count().unwrap(), 1);
    }

    #[test]
    fn test_failed_import_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        fs::write(
            &path,
            r#"[
  {"id": "w1", "word": "passport", "definition": "paszport", "partOfSpeech": "noun", "difficultyLevel": 0},
  {"id": "w2", "word": "ticket", "definition": "bilet", "partOfSpeech": "noun", "difficultyLevel": 0},
  {"id": "w3", "word": "luggage", "definition": "bagaż", "partOfSpeech": "noun", "difficultyLevel": 0}
]"#,
        )
        .unwrap();

        let db = Database::open_in_memory().unwrap();
        let catalog = SqliteCatalog::new(db.clone());
        db.lock()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_w2 BEFORE INSERT ON cards WHEN NEW.id = 'w2'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let result = import_cards(&path, &catalog);

        assert_eq!(result.unwrap_err().code(), "STORAGE_ERROR");
        assert_eq!(catalog.card_count().unwrap(), 0);
    }

    #[test]
    fn test_import_nonexistent_file() {
        let result = import_cards("nonexistent_file_xyz123.json", &catalog());
        assert_eq!(result.unwrap_err().code(), "IO_ERROR");
    }

    #[test]
    fn test_import_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ this is not valid json }").unwrap();

        let result = import_cards(&path, &catalog());
        assert_eq!(result.unwrap_err().code(), "INVALID_PAYLOAD");
    }

    #[test]
    fn test_export_writes_catalog() {
        let catalog = catalog();
        catalog.upsert_card(&Card::new("b", "bread", "chleb", 1)).unwrap();
        catalog.upsert_card(&Card::new("a", "apple", "jabłko", 0)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        assert_eq!(export_cards_to_path(&catalog, &path).unwrap(), 2);

        let written: Vec<Card> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written[0].id, "a");
        assert_eq!(written[1].definition, "chleb");
    }
}
