//! Daily review queue assembly and first-session word selection.

pub mod builder;
pub mod first_session;

pub use builder::{QueueBuilder, QueueResult};
