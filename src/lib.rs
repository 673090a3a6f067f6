pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod queue;
pub mod seed;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use database::{CardCatalog, Database, ScheduleAdjustment, ScheduleStore, SqliteCatalog};
pub use error::{Result, StoreError};
pub use models::{
    Card, Direction, LearningSession, Response, ScheduleRecord, ScheduleSnapshot, SessionEngine,
};
pub use queue::{QueueBuilder, QueueResult};
