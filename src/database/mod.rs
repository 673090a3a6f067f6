pub mod catalog;
pub mod db;
pub mod schedule_store;

pub use catalog::{CardCatalog, SqliteCatalog};
pub use db::Database;
pub use schedule_store::{ScheduleAdjustment, ScheduleStore};
