use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// XP required per level.
pub const XP_PER_LEVEL: u64 = 500;

/// Level for a given XP total; starts at 1.
pub fn level_for_xp(xp: u64) -> u64 {
    xp / XP_PER_LEVEL + 1
}

/// Aggregate learner stats. `level` is always derived from `xp`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgress {
    pub xp: u64,
    pub streak: u32,
    pub today_minutes: u32,
    #[serde(default)]
    pub completed_lessons: BTreeSet<String>,
}

impl UserProgress {
    pub fn level(&self) -> u64 {
        level_for_xp(self.xp)
    }

    /// # Errors
    /// [`ValidationError::NegativeAmount`] when `amount < 0`.
    pub fn add_xp(&self, amount: i64) -> Result<Self, ValidationError> {
        let amount = non_negative("xp", amount)?;
        Ok(Self {
            xp: self.xp.saturating_add(amount),
            ..self.clone()
        })
    }

    /// Idempotent: an id already present leaves the set unchanged.
    pub fn complete_lesson(&self, lesson_id: &str) -> Self {
        let mut next = self.clone();
        next.completed_lessons.insert(lesson_id.to_string());
        next
    }

    /// The caller guarantees at most one call per learner per calendar day.
    pub fn increment_streak(&self) -> Self {
        Self {
            streak: self.streak.saturating_add(1),
            ..self.clone()
        }
    }

    /// # Errors
    /// [`ValidationError::NegativeAmount`] when `amount < 0`.
    pub fn add_minutes(&self, amount: i64) -> Result<Self, ValidationError> {
        let amount = non_negative("minutes", amount)?;
        let amount = u32::try_from(amount).unwrap_or(u32::MAX);
        Ok(Self {
            today_minutes: self.today_minutes.saturating_add(amount),
            ..self.clone()
        })
    }

    /// Start a new calendar day: today's minutes go back to zero.
    pub fn roll_over_day(&self) -> Self {
        Self {
            today_minutes: 0,
            ..self.clone()
        }
    }

    /// Streak lapsed (a day was missed).
    pub fn break_streak(&self) -> Self {
        Self {
            streak: 0,
            ..self.clone()
        }
    }

    pub fn summary(&self) -> ProgressSummary {
        let level = self.level();
        let level_floor = (level - 1) * XP_PER_LEVEL;
        ProgressSummary {
            progress: self.clone(),
            level,
            xp_into_level: self.xp.saturating_sub(level_floor),
            xp_to_next_level: level_floor.saturating_add(XP_PER_LEVEL).saturating_sub(self.xp),
        }
    }

    pub fn apply(&self, delta: &ProgressDelta) -> Result<Self, ValidationError> {
        match delta {
            ProgressDelta::AddXp(amount) => self.add_xp(*amount),
            ProgressDelta::CompleteLesson(id) => Ok(self.complete_lesson(id)),
            ProgressDelta::IncrementStreak => Ok(self.increment_streak()),
            ProgressDelta::AddMinutes(amount) => self.add_minutes(*amount),
        }
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<u64, ValidationError> {
    if value < 0 {
        tracing::warn!(field, value, "rejected negative ledger amount");
        return Err(ValidationError::NegativeAmount { field, value });
    }
    Ok(value as u64)
}

/// One ledger mutation as data, so a store can apply it atomically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ProgressDelta {
    AddXp(i64),
    CompleteLesson(String),
    IncrementStreak,
    AddMinutes(i64),
}

/// Snapshot plus derived level figures, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSummary {
    #[serde(flatten)]
    pub progress: UserProgress,
    pub level: u64,
    pub xp_into_level: u64,
    pub xp_to_next_level: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xp_accumulates_and_levels() {
        let p = UserProgress::default();
        assert_eq!(p.level(), 1);
        let p = p.add_xp(300).unwrap().add_xp(250).unwrap();
        assert_eq!(p.xp, 550);
        assert_eq!(p.level(), 2);
    }

    #[test]
    fn level_boundaries() {
        assert_eq!(level_for_xp(499), 1);
        assert_eq!(level_for_xp(500), 2);
        assert_eq!(level_for_xp(1499), 3);
    }

    #[test]
    fn level_tracks_xp_without_ceiling() {
        let xp = u64::MAX - 7;
        assert_eq!(level_for_xp(xp), xp / 500 + 1);
        assert!(level_for_xp(xp) > u32::MAX as u64);
        let summary = UserProgress { xp, ..Default::default() }.summary();
        assert_eq!(summary.level, xp / 500 + 1);
        assert!(summary.xp_into_level < XP_PER_LEVEL);
    }

    #[test]
    fn complete_lesson_is_idempotent() {
        let once = UserProgress::default().complete_lesson("L1");
        let twice = once.complete_lesson("L1");
        assert_eq!(once, twice);
        assert_eq!(twice.completed_lessons.len(), 1);
    }

    #[test]
    fn negative_amounts_rejected() {
        let p = UserProgress::default().add_xp(40).unwrap();
        assert_eq!(
            p.add_xp(-1),
            Err(ValidationError::NegativeAmount { field: "xp", value: -1 })
        );
        assert!(p.add_minutes(-5).is_err());
        assert_eq!(p.xp, 40);
    }

    #[test]
    fn mutations_do_not_alias_input() {
        let before = UserProgress::default();
        let after = before.increment_streak().add_minutes(25).unwrap();
        assert_eq!(before.streak, 0);
        assert_eq!(after.streak, 1);
        assert_eq!(after.today_minutes, 25);
        assert_eq!(after.roll_over_day().today_minutes, 0);
        assert_eq!(after.break_streak().streak, 0);
    }

    #[test]
    fn summary_reports_level_window() {
        let s = UserProgress::default().add_xp(620).unwrap().summary();
        assert_eq!(s.level, 2);
        assert_eq!(s.xp_into_level, 120);
        assert_eq!(s.xp_to_next_level, 380);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["xp"], 620);
        assert_eq!(json["level"], 2);
    }

    #[test]
    fn delta_roundtrips_through_json() {
        let d: ProgressDelta = serde_json::from_str(r#"{"type":"add_xp","value":30}"#).unwrap();
        assert_eq!(d, ProgressDelta::AddXp(30));
        let p = UserProgress::default().apply(&d).unwrap();
        assert_eq!(p.xp, 30);
        let streak: ProgressDelta = serde_json::from_str(r#"{"type":"increment_streak"}"#).unwrap();
        assert_eq!(UserProgress::default().apply(&streak).unwrap().streak, 1);
    }
}
