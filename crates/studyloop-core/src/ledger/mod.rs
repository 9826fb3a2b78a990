//! Learner XP, level, streak and time-on-task.
//!
//! Every mutation takes a snapshot and returns a new one. Callers serialize
//! read-apply-write per learner; see `storage::Database::update_progress`.

mod user_progress;

pub use user_progress::{level_for_xp, ProgressDelta, ProgressSummary, UserProgress, XP_PER_LEVEL};
