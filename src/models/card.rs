//! Card is a dictionary entry: a word, its definition and the metadata the
//! queue builder selects on (difficulty and topic tags).
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub word: String,
    pub definition: String,
    pub part_of_speech: String,
    pub difficulty_level: i32,
    #[serde(default)]
    pub topic_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_sentence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronunciation: Option<String>,
}

impl Card {
    pub fn new(id: &str, word: &str, definition: &str, difficulty_level: i32) -> Self {
        Self {
            id: id.to_string(),
            word: word.to_string(),
            definition: definition.to_string(),
            part_of_speech: String::new(),
            difficulty_level,
            topic_tags: Vec::new(),
            example_sentence: None,
            pronunciation: None,
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.topic_tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.topic_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}
