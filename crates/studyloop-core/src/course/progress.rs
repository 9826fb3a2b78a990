//! A learner's cursor through one course.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::CourseSessionDraft;
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseProgress {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub current_card_index: u32,
    #[serde(default)]
    pub completed_cards: BTreeSet<u32>,
    pub earned_xp: u64,
    pub is_completed: bool,
}

/// What finishing one card changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardCompletion {
    pub progress: CourseProgress,
    /// XP granted for this card; zero when it was already complete.
    pub xp_awarded: u64,
    /// Number of the session this card finished, if any.
    pub session_finished: Option<u32>,
    /// The course became complete with this card.
    pub course_finished: bool,
}

impl CourseProgress {
    pub fn new(user_id: impl Into<String>, course_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            course_id: course_id.into(),
            current_card_index: 0,
            completed_cards: BTreeSet::new(),
            earned_xp: 0,
            is_completed: false,
        }
    }

    /// Record card `index` as finished.
    ///
    /// Re-completing a card is a no-op. The cursor advances to the first
    /// unfinished card and never exceeds `card_count`.
    ///
    /// # Errors
    /// Returns [`ValidationError::OutOfBounds`] when `index >= card_count`.
    pub fn complete_card(
        &self,
        index: u32,
        card_count: u32,
        xp_per_card: u64,
        sessions: &[CourseSessionDraft],
    ) -> Result<CardCompletion, ValidationError> {
        if index >= card_count {
            return Err(ValidationError::OutOfBounds {
                collection: format!("course {}", self.course_id),
                index: index as usize,
                len: card_count as usize,
            });
        }

        if self.completed_cards.contains(&index) {
            return Ok(CardCompletion {
                progress: self.clone(),
                xp_awarded: 0,
                session_finished: None,
                course_finished: false,
            });
        }

        let mut next = self.clone();
        next.completed_cards.insert(index);
        next.earned_xp = next.earned_xp.saturating_add(xp_per_card);
        next.current_card_index = (0..card_count)
            .find(|i| !next.completed_cards.contains(i))
            .unwrap_or(card_count);

        let course_finished = !self.is_completed && next.completed_cards.len() as u32 == card_count;
        next.is_completed = self.is_completed || course_finished;

        let session_finished = sessions
            .iter()
            .find(|s| s.contains_card(index))
            .filter(|s| {
                (s.cards_start_index..s.cards_end_index).all(|i| next.completed_cards.contains(&i))
            })
            .map(|s| s.session_number);

        Ok(CardCompletion {
            progress: next,
            xp_awarded: xp_per_card,
            session_finished,
            course_finished,
        })
    }

    /// Percentage of cards finished, 0..=100.
    pub fn percent_complete(&self, card_count: u32) -> u8 {
        if card_count == 0 {
            return 0;
        }
        let done = self.completed_cards.len().min(card_count as usize) as u64;
        (done * 100 / card_count as u64) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::plan;
    use chrono::NaiveDate;

    fn sessions(total: i64, daily: i64) -> Vec<CourseSessionDraft> {
        plan(total, 7, daily, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).unwrap()
    }

    #[test]
    fn completing_cards_advances_cursor() {
        let s = sessions(4, 2);
        let p = CourseProgress::new("u1", "c1");
        let r = p.complete_card(0, 4, 10, &s).unwrap();
        assert_eq!(r.progress.current_card_index, 1);
        assert_eq!(r.xp_awarded, 10);
        assert_eq!(r.session_finished, None);

        let r = r.progress.complete_card(1, 4, 10, &s).unwrap();
        assert_eq!(r.progress.current_card_index, 2);
        assert_eq!(r.session_finished, Some(1));
        assert_eq!(r.progress.earned_xp, 20);
    }

    #[test]
    fn repeat_completion_awards_nothing() {
        let s = sessions(3, 3);
        let p = CourseProgress::new("u1", "c1").complete_card(2, 3, 10, &s).unwrap().progress;
        let again = p.complete_card(2, 3, 10, &s).unwrap();
        assert_eq!(again.xp_awarded, 0);
        assert_eq!(again.progress, p);
    }

    #[test]
    fn out_of_order_cursor_points_at_first_gap() {
        let s = sessions(3, 1);
        let p = CourseProgress::new("u1", "c1").complete_card(1, 3, 5, &s).unwrap().progress;
        assert_eq!(p.current_card_index, 0);
    }

    #[test]
    fn finishing_last_card_completes_course() {
        let s = sessions(2, 1);
        let p = CourseProgress::new("u1", "c1");
        let p = p.complete_card(1, 2, 10, &s).unwrap().progress;
        let r = p.complete_card(0, 2, 10, &s).unwrap();
        assert!(r.course_finished);
        assert!(r.progress.is_completed);
        assert_eq!(r.progress.current_card_index, 2);
        assert_eq!(r.progress.percent_complete(2), 100);
    }

    #[test]
    fn rejects_index_past_end() {
        let p = CourseProgress::new("u1", "c1");
        assert!(matches!(
            p.complete_card(5, 5, 10, &[]),
            Err(ValidationError::OutOfBounds { index: 5, len: 5, .. })
        ));
    }
}
