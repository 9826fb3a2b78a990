//! Glue between the pure engine pieces and the store.
//!
//! Each learner action (a review, a finished card, logged minutes) runs
//! through [`ReviewPipeline`], which persists the state change, awards XP,
//! records the day's activity, and reports badges that unlocked on the way.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::badges::{default_catalog, evaluate, newly_unlocked, Badge, BadgeStatus};
use crate::course::{CardCompletion, CourseSession, SessionPlanner};
use crate::error::Result;
use crate::events::Event;
use crate::ledger::{ProgressDelta, UserProgress};
use crate::review::{MemoryConcept, Quality};
use crate::storage::{Config, Database, RewardsConfig};

/// Everything one review changed.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub concept: MemoryConcept,
    pub xp_awarded: u64,
    pub progress: UserProgress,
    pub unlocked_badges: Vec<String>,
    pub events: Vec<Event>,
}

/// Everything one finished card changed.
#[derive(Debug, Clone, Serialize)]
pub struct CardOutcome {
    pub completion: CardCompletion,
    pub xp_awarded: u64,
    pub progress: UserProgress,
    pub unlocked_badges: Vec<String>,
    pub events: Vec<Event>,
}

pub struct ReviewPipeline {
    badges: Vec<Badge>,
    rewards: RewardsConfig,
}

impl ReviewPipeline {
    /// Pipeline over the built-in badge catalog.
    pub fn new(rewards: RewardsConfig) -> Self {
        Self::with_badges(default_catalog(), rewards)
    }

    pub fn with_badges(badges: Vec<Badge>, rewards: RewardsConfig) -> Self {
        Self { badges, rewards }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.rewards.clone())
    }

    pub fn badges(&self) -> &[Badge] {
        &self.badges
    }

    pub fn badge_statuses(&self, db: &Database, user_id: &str) -> Result<Vec<BadgeStatus>> {
        let stats = db.stats_snapshot(user_id)?;
        Ok(evaluate(&self.badges, &stats)?)
    }

    /// Grade a concept, then award XP for a passing grade.
    ///
    /// Not atomic as a whole: the review, the day's streak and the XP award
    /// each commit in their own transaction, in that order. If a later step
    /// fails (e.g. [`DatabaseError::Locked`](crate::error::DatabaseError::Locked)),
    /// the concept has already advanced; do not retry the whole call, or the
    /// review is applied twice. Re-run only the ledger steps instead.
    pub fn review(
        &self,
        db: &Database,
        concept_id: &str,
        raw_quality: i64,
        today: NaiveDate,
    ) -> Result<ReviewOutcome> {
        let quality = Quality::new(raw_quality)?;
        let user_id = db.get_concept(concept_id)?.user_id;
        let before = self.badge_statuses(db, &user_id)?;

        let concept = db.review_concept(concept_id, raw_quality, today)?;
        let mut events = vec![Event::ConceptReviewed {
            concept_id: concept.id.clone(),
            quality: quality.value(),
            repetition: concept.state.repetition,
            interval: concept.state.interval,
            next_review: concept.state.next_review,
        }];

        let xp = if quality.is_pass() {
            self.rewards.xp_per_successful_review
        } else {
            0
        };
        let progress = self.settle(db, &user_id, xp, today, &mut events)?;
        let unlocked_badges = self.unlocked_since(db, &user_id, &before, &mut events)?;

        Ok(ReviewOutcome {
            concept,
            xp_awarded: xp,
            progress,
            unlocked_badges,
            events,
        })
    }

    /// Finish card `index` of a course, with a bonus when the course completes.
    ///
    /// The card commits before the ledger steps, as in [`Self::review`].
    /// Retrying after a ledger failure is safe here: a repeated card awards
    /// nothing.
    pub fn complete_card(
        &self,
        db: &Database,
        user_id: &str,
        course_id: &str,
        index: u32,
        today: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<CardOutcome> {
        let before = self.badge_statuses(db, user_id)?;
        let completion = db.complete_card(user_id, course_id, index, self.rewards.xp_per_card, at)?;

        let mut events = Vec::new();
        if let Some(session_number) = completion.session_finished {
            events.push(Event::SessionCompleted {
                course_id: course_id.to_string(),
                session_number,
                at,
            });
        }
        let mut xp = completion.xp_awarded;
        if completion.course_finished {
            xp = xp.saturating_add(self.rewards.xp_per_course);
            events.push(Event::CourseCompleted {
                user_id: user_id.to_string(),
                course_id: course_id.to_string(),
            });
        }

        let progress = self.settle(db, user_id, xp, today, &mut events)?;
        let unlocked_badges = self.unlocked_since(db, user_id, &before, &mut events)?;

        Ok(CardOutcome {
            completion,
            xp_awarded: xp,
            progress,
            unlocked_badges,
            events,
        })
    }

    /// Add study minutes to today's total.
    pub fn log_minutes(
        &self,
        db: &Database,
        user_id: &str,
        minutes: i64,
        today: NaiveDate,
    ) -> Result<UserProgress> {
        // Validate before touching the streak.
        UserProgress::default().add_minutes(minutes)?;
        db.record_daily_activity(user_id, today)?;
        db.update_progress(user_id, &ProgressDelta::AddMinutes(minutes))
    }

    fn settle(
        &self,
        db: &Database,
        user_id: &str,
        xp: u64,
        today: NaiveDate,
        events: &mut Vec<Event>,
    ) -> Result<UserProgress> {
        let streak = db.record_daily_activity(user_id, today)?;
        if streak.extended {
            events.push(Event::StreakExtended {
                user_id: user_id.to_string(),
                streak: streak.progress.streak,
            });
        }
        if xp == 0 {
            return Ok(streak.progress);
        }

        let level_before = streak.progress.level();
        let amount = i64::try_from(xp).unwrap_or(i64::MAX);
        let progress = db.update_progress(user_id, &ProgressDelta::AddXp(amount))?;
        events.push(Event::XpAwarded {
            user_id: user_id.to_string(),
            amount: xp,
            total: progress.xp,
            level: progress.level(),
        });
        if progress.level() > level_before {
            tracing::info!(user_id, level = progress.level(), "level up");
            events.push(Event::LevelUp {
                user_id: user_id.to_string(),
                level: progress.level(),
            });
        }
        Ok(progress)
    }

    fn unlocked_since(
        &self,
        db: &Database,
        user_id: &str,
        before: &[BadgeStatus],
        events: &mut Vec<Event>,
    ) -> Result<Vec<String>> {
        let after = self.badge_statuses(db, user_id)?;
        let unlocked: Vec<String> = newly_unlocked(before, &after)
            .into_iter()
            .map(str::to_string)
            .collect();
        for badge_id in &unlocked {
            tracing::info!(user_id, badge_id = %badge_id, "badge unlocked");
            events.push(Event::BadgeUnlocked {
                user_id: user_id.to_string(),
                badge_id: badge_id.clone(),
            });
        }
        Ok(unlocked)
    }
}

/// Plan a stored course and replace its session calendar.
pub fn plan_course(
    db: &Database,
    planner: &SessionPlanner,
    course_id: &str,
    duration_days: Option<i64>,
    daily_cards_count: Option<i64>,
    start_date: NaiveDate,
) -> Result<Vec<CourseSession>> {
    let course = db.get_course(course_id)?;
    let drafts = planner.plan(
        course.card_count as i64,
        duration_days,
        daily_cards_count,
        start_date,
    )?;
    db.replace_sessions(course_id, &drafts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn pipeline() -> ReviewPipeline {
        ReviewPipeline::new(RewardsConfig::default())
    }

    #[test]
    fn passing_review_awards_xp_and_streak() {
        let db = Database::open_memory().unwrap();
        let concept = MemoryConcept::new("u1", "Traits", day(1));
        db.create_concept(&concept).unwrap();

        let outcome = pipeline().review(&db, &concept.id, 4, day(1)).unwrap();
        assert_eq!(outcome.xp_awarded, 5);
        assert_eq!(outcome.progress.xp, 5);
        assert_eq!(outcome.progress.streak, 1);
        assert!(matches!(outcome.events[0], Event::ConceptReviewed { quality: 4, .. }));
        assert!(outcome
            .events
            .iter()
            .any(|e| matches!(e, Event::StreakExtended { streak: 1, .. })));
    }

    #[test]
    fn repeated_review_is_applied_again() {
        let db = Database::open_memory().unwrap();
        let concept = MemoryConcept::new("u1", "Closures", day(1));
        db.create_concept(&concept).unwrap();
        let p = pipeline();

        p.review(&db, &concept.id, 4, day(1)).unwrap();
        let again = p.review(&db, &concept.id, 4, day(1)).unwrap();
        assert_eq!(again.concept.state.repetition, 2);
        assert_eq!(again.concept.state.interval, 6);
        assert_eq!(again.progress.xp, 10);
        // one streak day no matter how often the day is recorded
        assert_eq!(again.progress.streak, 1);
    }

    #[test]
    fn failed_review_awards_nothing() {
        let db = Database::open_memory().unwrap();
        let concept = MemoryConcept::new("u1", "Lifetimes", day(1));
        db.create_concept(&concept).unwrap();

        let outcome = pipeline().review(&db, &concept.id, 1, day(1)).unwrap();
        assert_eq!(outcome.xp_awarded, 0);
        assert!(!outcome.events.iter().any(|e| matches!(e, Event::XpAwarded { .. })));
        assert_eq!(outcome.concept.state.repetition, 0);
    }

    #[test]
    fn invalid_quality_changes_nothing() {
        let db = Database::open_memory().unwrap();
        let concept = MemoryConcept::new("u1", "Macros", day(1));
        db.create_concept(&concept).unwrap();
        assert!(pipeline().review(&db, &concept.id, -1, day(1)).is_err());
        assert_eq!(db.load_progress("u1").unwrap(), UserProgress::default());
    }

    #[test]
    fn finishing_course_unlocks_badges() {
        let db = Database::open_memory().unwrap();
        let planner = SessionPlanner::default();
        let course = db.create_course("u1", "Ownership", 2).unwrap();
        plan_course(&db, &planner, &course.id, Some(1), Some(2), day(1)).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let p = pipeline();

        let first = p.complete_card(&db, "u1", &course.id, 0, day(1), at).unwrap();
        // "creator" unlocked when the course was created, before this call
        assert!(first.unlocked_badges.is_empty());
        assert_eq!(first.xp_awarded, 10);

        let last = p.complete_card(&db, "u1", &course.id, 1, day(1), at).unwrap();
        assert_eq!(last.xp_awarded, 110);
        assert_eq!(last.progress.xp, 120);
        assert_eq!(last.unlocked_badges, vec!["first-course".to_string()]);
        assert!(last
            .events
            .iter()
            .any(|e| matches!(e, Event::SessionCompleted { session_number: 1, .. })));
        assert!(last.events.iter().any(|e| matches!(e, Event::CourseCompleted { .. })));
    }

    #[test]
    fn repeated_card_awards_nothing() {
        let db = Database::open_memory().unwrap();
        let course = db.create_course("u1", "Iterators", 3).unwrap();
        plan_course(&db, &SessionPlanner::default(), &course.id, None, None, day(1)).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        pipeline().complete_card(&db, "u1", &course.id, 0, day(1), at).unwrap();
        let again = pipeline().complete_card(&db, "u1", &course.id, 0, day(1), at).unwrap();
        assert_eq!(again.xp_awarded, 0);
        assert_eq!(again.progress.xp, 10);
    }

    #[test]
    fn level_up_emits_event() {
        let db = Database::open_memory().unwrap();
        db.update_progress("u1", &ProgressDelta::AddXp(498)).unwrap();
        let concept = MemoryConcept::new("u1", "Async", day(1));
        db.create_concept(&concept).unwrap();
        let outcome = pipeline().review(&db, &concept.id, 5, day(1)).unwrap();
        assert!(outcome.events.iter().any(|e| matches!(e, Event::LevelUp { level: 2, .. })));
    }

    #[test]
    fn log_minutes_rejects_negative() {
        let db = Database::open_memory().unwrap();
        assert!(pipeline().log_minutes(&db, "u1", -5, day(1)).is_err());
        assert_eq!(db.load_progress("u1").unwrap().streak, 0);
        assert_eq!(pipeline().log_minutes(&db, "u1", 25, day(1)).unwrap().today_minutes, 25);
    }
}
