use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Aggregate learner stats that badges are judged on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub xp: u64,
    pub streak: u32,
    pub courses_completed: u32,
    pub concepts_learned: u32,
    pub courses_created: u32,
}

/// A single stat a threshold badge can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Xp,
    Streak,
    CoursesCompleted,
    ConceptsLearned,
    CoursesCreated,
}

impl Metric {
    pub fn read(self, stats: &StatsSnapshot) -> u64 {
        match self {
            Metric::Xp => stats.xp,
            Metric::Streak => stats.streak as u64,
            Metric::CoursesCompleted => stats.courses_completed as u64,
            Metric::ConceptsLearned => stats.concepts_learned as u64,
            Metric::CoursesCreated => stats.courses_created as u64,
        }
    }
}

type Predicate = Arc<dyn Fn(&StatsSnapshot) -> bool + Send + Sync>;
type ProgressFn = Arc<dyn Fn(&StatsSnapshot) -> f64 + Send + Sync>;

/// Static achievement definition.
#[derive(Clone)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub color: String,
    unlock: Predicate,
    progress: ProgressFn,
}

impl Badge {
    /// Badge with arbitrary unlock and progress logic.
    ///
    /// `progress` should reach 100 whenever `unlock` holds; the evaluator
    /// rejects the badge otherwise.
    pub fn custom(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        unlock: impl Fn(&StatsSnapshot) -> bool + Send + Sync + 'static,
        progress: impl Fn(&StatsSnapshot) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            icon: "award".into(),
            color: "#6366f1".into(),
            unlock: Arc::new(unlock),
            progress: Arc::new(progress),
        }
    }

    /// Unlocks once `metric` reaches `target`; progress is the linear ratio.
    pub fn threshold(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        metric: Metric,
        target: u64,
    ) -> Self {
        let target = target.max(1);
        Self::custom(
            id,
            name,
            description,
            move |s| metric.read(s) >= target,
            move |s| metric.read(s) as f64 * 100.0 / target as f64,
        )
    }

    pub fn with_style(mut self, icon: impl Into<String>, color: impl Into<String>) -> Self {
        self.icon = icon.into();
        self.color = color.into();
        self
    }

    pub fn is_unlocked(&self, stats: &StatsSnapshot) -> bool {
        (self.unlock)(stats)
    }

    /// Raw progress as the badge computes it; may fall outside 0..=100.
    pub fn raw_progress(&self, stats: &StatsSnapshot) -> f64 {
        (self.progress)(stats)
    }
}

impl fmt::Debug for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Badge")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("icon", &self.icon)
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}

/// Serializable threshold badge, e.g. loaded from a JSON catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_color")]
    pub color: String,
    pub metric: Metric,
    pub target: u64,
}

fn default_icon() -> String {
    "award".into()
}
fn default_color() -> String {
    "#6366f1".into()
}

impl TryFrom<BadgeDefinition> for Badge {
    type Error = ValidationError;

    fn try_from(def: BadgeDefinition) -> Result<Self, Self::Error> {
        let malformed = |message: &str| ValidationError::MalformedBadge {
            badge_id: def.id.clone(),
            message: message.into(),
        };
        if def.id.trim().is_empty() {
            return Err(malformed("id is empty"));
        }
        if def.name.trim().is_empty() {
            return Err(malformed("name is empty"));
        }
        if def.target == 0 {
            return Err(malformed("target must be greater than zero"));
        }
        Ok(
            Badge::threshold(def.id, def.name, def.description, def.metric, def.target)
                .with_style(def.icon, def.color),
        )
    }
}
