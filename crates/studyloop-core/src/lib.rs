//! # Studyloop Core Library
//!
//! Memory scheduling and progression engine for a self-paced learning app.
//! All operations are available through the `studyloop` CLI binary, which is a
//! thin layer over this library.
//!
//! ## Architecture
//!
//! - **Review**: SM-2 spaced-repetition scheduling of memory concepts
//! - **Course**: Partitioning a course's cards into dated daily sessions
//! - **Ledger**: XP, level, streak and time-on-task snapshots
//! - **Badges**: Data-driven achievements evaluated against learner stats
//! - **Storage**: SQLite persistence and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`ReviewScheduler`]: Next review date for a recall grade
//! - [`SessionPlanner`]: Daily session calendar for a course
//! - [`UserProgress`]: Immutable progress snapshot with delta functions
//! - [`ReviewPipeline`]: Persists an action and reports what it unlocked
//! - [`Database`]: Engine state persistence
//! - [`Config`]: Application configuration management

pub mod badges;
pub mod course;
pub mod engine;
pub mod error;
pub mod events;
pub mod grading;
pub mod ledger;
pub mod review;
pub mod storage;

pub use badges::{default_catalog, evaluate, Badge, BadgeDefinition, BadgeStatus, Metric, StatsSnapshot};
pub use course::{plan, CourseProgress, CourseSession, CourseSessionDraft, SessionPlanner};
pub use engine::{plan_course, CardOutcome, ReviewOutcome, ReviewPipeline};
pub use error::{ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use events::Event;
pub use grading::{GradeRequest, GradeResponse};
pub use ledger::{ProgressDelta, UserProgress};
pub use review::{schedule, MemoryConcept, Quality, ReviewScheduler, ReviewState};
pub use storage::{Config, Course, Database};
