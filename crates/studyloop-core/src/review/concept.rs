use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::scheduler::{schedule, DEFAULT_EASINESS};
use super::Quality;
use crate::error::ValidationError;

/// Scheduling fields of a concept. Only [`schedule`] produces new values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewState {
    /// Consecutive successful recalls since the last failure.
    pub repetition: u32,
    pub easiness_factor: f64,
    /// Days until the next review.
    pub interval: u32,
    pub next_review: NaiveDate,
    #[serde(default)]
    pub last_reviewed: Option<NaiveDate>,
}

impl ReviewState {
    /// State of a concept introduced on `introduced`; due the same day.
    pub fn new(introduced: NaiveDate) -> Self {
        Self::with_easiness(introduced, DEFAULT_EASINESS)
    }

    pub fn with_easiness(introduced: NaiveDate, easiness_factor: f64) -> Self {
        Self {
            repetition: 0,
            easiness_factor,
            interval: 0,
            next_review: introduced,
            last_reviewed: None,
        }
    }

    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.next_review <= today
    }
}

/// One trackable unit of knowledge for a learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConcept {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub course_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(flatten)]
    pub state: ReviewState,
    /// Soft-retired concepts are kept for history but never come due.
    #[serde(default)]
    pub retired: bool,
}

impl MemoryConcept {
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        introduced: NaiveDate,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            course_id: None,
            title: title.into(),
            content: None,
            state: ReviewState::new(introduced),
            retired: false,
        }
    }

    pub fn in_course(mut self, course_id: impl Into<String>) -> Self {
        self.course_id = Some(course_id.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn is_due(&self, today: NaiveDate) -> bool {
        !self.retired && self.state.is_due(today)
    }

    /// Apply one review with a raw grade, returning the updated concept.
    ///
    /// # Errors
    /// Returns [`ValidationError::QualityOutOfRange`] and leaves `self`
    /// untouched when `raw_quality` is not in 0..=5.
    pub fn review(&self, raw_quality: i64, today: NaiveDate) -> Result<Self, ValidationError> {
        let quality = Quality::new(raw_quality)?;
        Ok(Self {
            state: schedule(&self.state, quality, today),
            ..self.clone()
        })
    }
}
