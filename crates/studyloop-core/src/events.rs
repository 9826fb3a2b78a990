use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Every state change the pipeline makes produces an Event.
/// The UI renders them; nothing in the core consumes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    ConceptReviewed {
        concept_id: String,
        quality: u8,
        repetition: u32,
        interval: u32,
        next_review: NaiveDate,
    },
    XpAwarded {
        user_id: String,
        amount: u64,
        total: u64,
        level: u64,
    },
    LevelUp {
        user_id: String,
        level: u64,
    },
    BadgeUnlocked {
        user_id: String,
        badge_id: String,
    },
    SessionCompleted {
        course_id: String,
        session_number: u32,
        at: DateTime<Utc>,
    },
    CourseCompleted {
        user_id: String,
        course_id: String,
    },
    StreakExtended {
        user_id: String,
        streak: u32,
    },
}
