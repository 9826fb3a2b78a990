//! Splits a course's card sequence into one session per calendar day.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::CourseSessionDraft;
use crate::error::ConfigError;

/// Partition `[0, total_cards)` into daily sessions starting at `start_date`.
///
/// Each session takes `daily_cards_count` cards; the last one takes whatever
/// remains. No card is left unscheduled: when `daily_cards_count *
/// duration_days` falls short, sessions continue past `duration_days`.
///
/// # Errors
/// Returns [`ConfigError::NonPositivePlanInput`] if any count is not
/// strictly positive, and [`ConfigError::InvalidValue`] if the last session
/// would fall past the end of the calendar. Nothing is produced in either case.
pub fn plan(
    total_cards: i64,
    duration_days: i64,
    daily_cards_count: i64,
    start_date: NaiveDate,
) -> Result<Vec<CourseSessionDraft>, ConfigError> {
    let total = positive("total_cards", total_cards)?;
    let duration = positive("duration_days", duration_days)?;
    let daily = positive("daily_cards_count", daily_cards_count)?;

    let session_count = total.div_ceil(daily);
    if session_count > duration {
        tracing::warn!(
            total_cards = total,
            duration_days = duration,
            daily_cards_count = daily,
            session_count,
            "plan runs past configured duration"
        );
    }

    // Every session date must exist before anything is built.
    let last_offset = session_count as u64 - 1;
    if start_date.checked_add_days(Days::new(last_offset)).is_none() {
        return Err(ConfigError::InvalidValue {
            key: "start_date".into(),
            message: format!("calendar overflow {last_offset} days after {start_date}"),
        });
    }

    let mut sessions = Vec::with_capacity((session_count as usize).min(MAX_PREALLOCATED_SESSIONS));
    let mut start = 0u32;
    let mut scheduled_date = start_date;
    while start < total {
        let offset = sessions.len() as u64;
        if offset > 0 {
            scheduled_date = scheduled_date.succ_opt().unwrap_or(NaiveDate::MAX);
        }
        let end = start.saturating_add(daily).min(total);
        sessions.push(CourseSessionDraft {
            session_number: offset as u32 + 1,
            scheduled_date,
            cards_start_index: start,
            cards_end_index: end,
        });
        start = end;
    }

    tracing::debug!(sessions = sessions.len(), total_cards = total, "planned course");
    Ok(sessions)
}

const MAX_PREALLOCATED_SESSIONS: usize = 1024;

fn positive(field: &'static str, value: i64) -> Result<u32, ConfigError> {
    if value <= 0 || value > u32::MAX as i64 {
        return Err(ConfigError::NonPositivePlanInput { field, value });
    }
    Ok(value as u32)
}

/// Planner defaults used when a course doesn't specify its own pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "default_daily_cards")]
    pub default_daily_cards: u32,
    #[serde(default = "default_duration_days")]
    pub default_duration_days: u32,
}

fn default_daily_cards() -> u32 {
    5
}
fn default_duration_days() -> u32 {
    7
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_daily_cards: default_daily_cards(),
            default_duration_days: default_duration_days(),
        }
    }
}

pub struct SessionPlanner {
    config: PlannerConfig,
}

impl SessionPlanner {
    pub fn new() -> Self {
        Self {
            config: PlannerConfig::default(),
        }
    }

    pub fn with_config(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Plan with explicit pacing, falling back to configured defaults.
    pub fn plan(
        &self,
        total_cards: i64,
        duration_days: Option<i64>,
        daily_cards_count: Option<i64>,
        start_date: NaiveDate,
    ) -> Result<Vec<CourseSessionDraft>, ConfigError> {
        plan(
            total_cards,
            duration_days.unwrap_or(self.config.default_duration_days as i64),
            daily_cards_count.unwrap_or(self.config.default_daily_cards as i64),
            start_date,
        )
    }

    /// Spread the cards evenly enough to finish within `duration_days`.
    pub fn plan_to_fit(
        &self,
        total_cards: i64,
        duration_days: i64,
        start_date: NaiveDate,
    ) -> Result<Vec<CourseSessionDraft>, ConfigError> {
        let total = positive("total_cards", total_cards)?;
        let duration = positive("duration_days", duration_days)?;
        let daily = total.div_ceil(duration);
        plan(total_cards, duration_days, daily as i64, start_date)
    }
}

impl Default for SessionPlanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 30).unwrap()
    }

    fn assert_partition(sessions: &[CourseSessionDraft], total: u32) {
        let mut cursor = 0;
        for (i, s) in sessions.iter().enumerate() {
            assert_eq!(s.session_number as usize, i + 1);
            assert_eq!(s.cards_start_index, cursor);
            assert!(s.cards_start_index < s.cards_end_index);
            cursor = s.cards_end_index;
        }
        assert_eq!(cursor, total);
    }

    #[test]
    fn remainder_goes_to_short_final_session() {
        let sessions = plan(25, 10, 3, start()).unwrap();
        assert_eq!(sessions.len(), 9);
        assert!(sessions[..8].iter().all(|s| s.card_count() == 3));
        assert_eq!(sessions[8].card_count(), 1);
        assert_partition(&sessions, 25);
        for (i, s) in sessions.iter().enumerate() {
            assert_eq!(s.scheduled_date, start() + Days::new(i as u64));
        }
        // crosses into February
        assert_eq!(
            sessions[8].scheduled_date,
            NaiveDate::from_ymd_opt(2024, 2, 7).unwrap()
        );
    }

    #[test]
    fn overruns_duration_rather_than_drop_cards() {
        let sessions = plan(10, 2, 3, start()).unwrap();
        assert_eq!(sessions.len(), 4);
        assert_partition(&sessions, 10);
        assert_eq!(sessions[3].card_count(), 1);
    }

    #[test]
    fn exact_division_has_no_trailing_session() {
        let sessions = plan(12, 30, 4, start()).unwrap();
        assert_eq!(sessions.len(), 3);
        assert_partition(&sessions, 12);
    }

    #[test]
    fn daily_larger_than_total_is_one_session() {
        let sessions = plan(2, 5, 10, start()).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].cards_end_index, 2);
    }

    #[test]
    fn rejects_non_positive_inputs() {
        for (t, d, c, field) in [
            (0, 1, 1, "total_cards"),
            (1, 0, 1, "duration_days"),
            (1, 1, -2, "daily_cards_count"),
        ] {
            match plan(t, d, c, start()) {
                Err(ConfigError::NonPositivePlanInput { field: f, .. }) => assert_eq!(f, field),
                other => panic!("expected config error, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_plans_past_the_calendar_end() {
        let near_end = NaiveDate::MAX - Days::new(1);
        match plan(3, 3, 1, near_end) {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "start_date"),
            other => panic!("expected calendar overflow, got {other:?}"),
        }
        assert_eq!(plan(2, 2, 1, near_end).unwrap().len(), 2);
    }

    #[test]
    fn huge_card_count_fails_before_building_sessions() {
        let err = plan(u32::MAX as i64, 1, 1, start()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn plan_to_fit_stays_within_duration() {
        let planner = SessionPlanner::new();
        let sessions = planner.plan_to_fit(10, 3, start()).unwrap();
        assert_eq!(sessions.len(), 3);
        assert_partition(&sessions, 10);
    }

    #[test]
    fn planner_uses_configured_defaults() {
        let planner = SessionPlanner::with_config(PlannerConfig {
            default_daily_cards: 4,
            default_duration_days: 2,
        });
        let sessions = planner.plan(9, None, None, start()).unwrap();
        assert_eq!(sessions.len(), 3);
    }
}
