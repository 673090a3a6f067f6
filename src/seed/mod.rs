pub mod json;

pub use json::{SeedReport, export_cards_to_path, import_cards};
