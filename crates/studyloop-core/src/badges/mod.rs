//! Achievements.
//!
//! A [`Badge`] pairs an unlock predicate with a progress function over a
//! [`StatsSnapshot`]. [`evaluate`] runs any table of them without knowing
//! their thresholds.

mod catalog;
mod definition;
mod evaluator;

pub use catalog::default_catalog;
pub use definition::{Badge, BadgeDefinition, Metric, StatsSnapshot};
pub use evaluator::{evaluate, newly_unlocked, BadgeStatus};
