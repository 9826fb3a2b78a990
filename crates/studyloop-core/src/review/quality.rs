use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Recall quality for one review event, 0 (blackout) through 5 (perfect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const MAX: u8 = 5;
    /// Lowest grade that counts as a successful recall.
    pub const PASSING: u8 = 3;

    /// Validate a raw grade.
    ///
    /// # Errors
    /// Returns [`ValidationError::QualityOutOfRange`] for anything outside 0..=5.
    pub fn new(raw: i64) -> Result<Self, ValidationError> {
        if (0..=Self::MAX as i64).contains(&raw) {
            Ok(Self(raw as u8))
        } else {
            Err(ValidationError::QualityOutOfRange(raw))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_pass(self) -> bool {
        self.0 >= Self::PASSING
    }

    /// All six grades in ascending order.
    pub fn all() -> impl Iterator<Item = Quality> {
        (0..=Self::MAX).map(Quality)
    }
}

impl TryFrom<i64> for Quality {
    type Error = ValidationError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_full_scale() {
        for raw in 0..=5 {
            assert_eq!(Quality::new(raw).unwrap().value() as i64, raw);
        }
    }

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(Quality::new(-1), Err(ValidationError::QualityOutOfRange(-1)));
        assert_eq!(Quality::new(6), Err(ValidationError::QualityOutOfRange(6)));
    }

    #[test]
    fn pass_threshold_is_three() {
        assert!(!Quality::new(2).unwrap().is_pass());
        assert!(Quality::new(3).unwrap().is_pass());
    }

    #[test]
    fn deserialize_validates() {
        assert!(serde_json::from_str::<Quality>("4").is_ok());
        assert!(serde_json::from_str::<Quality>("9").is_err());
    }
}
