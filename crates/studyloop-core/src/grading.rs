//! Wire types for the external answer-grading service.
//!
//! The engine never calls the grader. These types let the surrounding
//! application build requests and read responses it cannot trust.

use serde::{Deserialize, Serialize};

/// Suggestions beyond this count are dropped.
pub const MAX_ADDITIONS: usize = 3;

const DEFAULT_MESSAGE: &str = "Nice effort! Keep going, you're building the habit.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    pub question: String,
    pub expected_answer: String,
    pub user_answer: String,
    pub card_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeResponse {
    pub is_valid: bool,
    pub message: String,
    #[serde(default)]
    pub additions: Vec<String>,
}

impl GradeResponse {
    /// Response used when the grader failed or answered nonsense: no
    /// penalty, encouraging message.
    pub fn fallback() -> Self {
        Self {
            is_valid: true,
            message: DEFAULT_MESSAGE.into(),
            additions: Vec::new(),
        }
    }

    /// Parse a raw grader payload, degrading to [`GradeResponse::fallback`].
    pub fn from_untrusted(raw: &str) -> Self {
        match serde_json::from_str::<GradeResponse>(raw) {
            Ok(resp) => resp.sanitized(),
            Err(err) => {
                tracing::warn!(error = %err, "malformed grader response, using fallback");
                Self::fallback()
            }
        }
    }

    fn sanitized(mut self) -> Self {
        self.additions.retain(|a| !a.trim().is_empty());
        self.additions.truncate(MAX_ADDITIONS);
        if self.message.trim().is_empty() {
            self.message = DEFAULT_MESSAGE.into();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_camel_case() {
        let req = GradeRequest {
            question: "What moves?".into(),
            expected_answer: "Ownership".into(),
            user_answer: "ownership".into(),
            card_title: "Moves".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["expectedAnswer"], "Ownership");
        assert_eq!(json["cardTitle"], "Moves");
    }

    #[test]
    fn additions_capped_at_three() {
        let raw = r#"{"isValid":false,"message":"Close","additions":["a","b","","c","d"]}"#;
        let resp = GradeResponse::from_untrusted(raw);
        assert!(!resp.is_valid);
        assert_eq!(resp.additions, vec!["a", "b", "c"]);
    }

    #[test]
    fn garbage_falls_back() {
        assert_eq!(GradeResponse::from_untrusted("<html>502</html>"), GradeResponse::fallback());
        assert!(GradeResponse::from_untrusted(r#"{"message":"x"}"#).is_valid);
    }

    #[test]
    fn blank_message_replaced() {
        let resp = GradeResponse::from_untrusted(r#"{"isValid":true,"message":"  "}"#);
        assert_eq!(resp.message, DEFAULT_MESSAGE);
    }
}
