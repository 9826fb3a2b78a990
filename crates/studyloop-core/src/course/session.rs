use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A planned session before the caller assigns it an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSessionDraft {
    /// 1-based, unique within the course.
    pub session_number: u32,
    pub scheduled_date: NaiveDate,
    pub cards_start_index: u32,
    /// Exclusive.
    pub cards_end_index: u32,
}

impl CourseSessionDraft {
    pub fn card_count(&self) -> u32 {
        self.cards_end_index - self.cards_start_index
    }

    pub fn contains_card(&self, index: u32) -> bool {
        (self.cards_start_index..self.cards_end_index).contains(&index)
    }

    pub fn into_session(self, course_id: impl Into<String>) -> CourseSession {
        CourseSession {
            id: uuid::Uuid::new_v4().to_string(),
            course_id: course_id.into(),
            draft: self,
            is_completed: false,
            completed_at: None,
        }
    }
}

/// A persisted daily study block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSession {
    pub id: String,
    pub course_id: String,
    #[serde(flatten)]
    pub draft: CourseSessionDraft,
    pub is_completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl CourseSession {
    /// Mark complete. A session is only ever completed once; a repeat call
    /// keeps the original timestamp.
    pub fn complete(&self, at: DateTime<Utc>) -> Self {
        if self.is_completed {
            return self.clone();
        }
        Self {
            is_completed: true,
            completed_at: Some(at),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft() -> CourseSessionDraft {
        CourseSessionDraft {
            session_number: 2,
            scheduled_date: NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(),
            cards_start_index: 3,
            cards_end_index: 6,
        }
    }

    #[test]
    fn range_helpers() {
        let d = draft();
        assert_eq!(d.card_count(), 3);
        assert!(d.contains_card(3));
        assert!(d.contains_card(5));
        assert!(!d.contains_card(6));
    }

    #[test]
    fn completion_is_sticky() {
        let first = Utc.with_ymd_and_hms(2024, 6, 2, 9, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap();
        let session = draft().into_session("course-1");
        assert!(!session.is_completed);

        let done = session.complete(first);
        assert_eq!(done.completed_at, Some(first));
        assert_eq!(done.complete(later).completed_at, Some(first));
    }
}
