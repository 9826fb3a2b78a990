//! SM-2 style interval scheduling.
//!
//! The easiness factor moves on every review, including failures, so it tracks
//! long-run difficulty. Intervals grow 1 -> 6 -> `previous * ef` days across
//! consecutive successes and collapse back to one day on any failure.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{Quality, ReviewState};

/// Easiness floor.
pub const MIN_EASINESS: f64 = 1.3;
/// Easiness assigned to newly introduced concepts.
pub const DEFAULT_EASINESS: f64 = 2.5;

const FIRST_INTERVAL: u32 = 1;
const SECOND_INTERVAL: u32 = 6;

/// Easiness after a review of grade `quality`, clamped to [`MIN_EASINESS`].
pub fn next_easiness(ef: f64, quality: Quality) -> f64 {
    let miss = (Quality::MAX - quality.value()) as f64;
    let next = ef + (0.1 - miss * (0.08 + miss * 0.02));
    next.max(MIN_EASINESS)
}

/// Map a review state and a recall grade to the next review state.
///
/// Total and pure: `today` is the evaluation date and becomes `last_reviewed`.
/// `next_review` is always `today + interval`; an interval that would run past
/// the end of the calendar is shortened to end on [`NaiveDate::MAX`].
pub fn schedule(state: &ReviewState, quality: Quality, today: NaiveDate) -> ReviewState {
    let easiness_factor = next_easiness(state.easiness_factor, quality);

    let (repetition, grown) = if quality.is_pass() {
        let repetition = state.repetition.saturating_add(1);
        let interval = match repetition {
            1 => FIRST_INTERVAL,
            2 => SECOND_INTERVAL,
            _ => grow_interval(state.interval, easiness_factor),
        };
        (repetition, interval)
    } else {
        (0, FIRST_INTERVAL)
    };

    let (interval, next_review) = match today.checked_add_days(Days::new(grown as u64)) {
        Some(next_review) => (grown, next_review),
        None => {
            let room = NaiveDate::MAX.signed_duration_since(today).num_days();
            (u32::try_from(room).unwrap_or(u32::MAX), NaiveDate::MAX)
        }
    };

    tracing::debug!(
        quality = quality.value(),
        repetition,
        interval,
        easiness_factor,
        %next_review,
        "scheduled review"
    );

    ReviewState {
        repetition,
        easiness_factor,
        interval,
        next_review,
        last_reviewed: Some(today),
    }
}

/// `round(previous * ef)`, half away from zero, never below one day.
fn grow_interval(previous: u32, ef: f64) -> u32 {
    let grown = (previous.max(1) as f64 * ef).round();
    if grown >= u32::MAX as f64 {
        u32::MAX
    } else {
        (grown as u32).max(1)
    }
}

/// Interval in days each grade would produce, indexed by grade.
///
/// Used to label answer buttons ("again: 1d, good: 15d").
pub fn preview_intervals(state: &ReviewState, today: NaiveDate) -> [u32; 6] {
    let mut out = [0; 6];
    for quality in Quality::all() {
        out[quality.value() as usize] = schedule(state, quality, today).interval;
    }
    out
}

/// Scheduler defaults for newly introduced concepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_initial_easiness")]
    pub initial_easiness: f64,
}

fn default_initial_easiness() -> f64 {
    DEFAULT_EASINESS
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_easiness: default_initial_easiness(),
        }
    }
}

/// Entry point bound to a [`SchedulerConfig`].
pub struct ReviewScheduler {
    config: SchedulerConfig,
}

impl ReviewScheduler {
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
        }
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Fresh state for a concept introduced on `introduced`.
    ///
    /// An initial easiness below the floor is raised to [`MIN_EASINESS`].
    pub fn initial_state(&self, introduced: NaiveDate) -> ReviewState {
        ReviewState::with_easiness(introduced, self.config.initial_easiness.max(MIN_EASINESS))
    }

    pub fn schedule(&self, state: &ReviewState, quality: Quality, today: NaiveDate) -> ReviewState {
        schedule(state, quality, today)
    }
}

impl Default for ReviewScheduler {
    fn default() -> Self {
        Self::new()
    }
}
