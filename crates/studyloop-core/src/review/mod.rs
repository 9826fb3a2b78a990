//! Spaced-repetition review scheduling.
//!
//! A [`MemoryConcept`] carries its [`ReviewState`]; each recall event maps the
//! state through [`schedule`] to the next state. Nothing here touches storage.

mod concept;
mod quality;
mod scheduler;

pub use concept::{MemoryConcept, ReviewState};
pub use quality::Quality;
pub use scheduler::{
    next_easiness, preview_intervals, schedule, ReviewScheduler, SchedulerConfig,
    DEFAULT_EASINESS, MIN_EASINESS,
};
