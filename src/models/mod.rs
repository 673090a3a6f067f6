pub mod card;
pub mod depth;
pub mod learning_session;
pub mod review_event;
pub mod schedule_record;
pub mod session_engine;
pub mod sm2;

pub use card::Card;
pub use depth::calculate_depth_level;
pub use learning_session::LearningSession;
pub use review_event::{CardReviewEvent, Direction, EventType, Response};
pub use schedule_record::{ScheduleRecord, ScheduleSnapshot};
pub use session_engine::{QueueProgress, SessionEngine, SessionPhase, UndoEntry};
pub use sm2::{Sm2Review, calculate_next_review};
