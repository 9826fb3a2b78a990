//! Courses: the daily session calendar and a learner's cursor through cards.

mod planner;
mod progress;
mod session;

pub use planner::{plan, PlannerConfig, SessionPlanner};
pub use progress::{CardCompletion, CourseProgress};
pub use session::{CourseSession, CourseSessionDraft};
