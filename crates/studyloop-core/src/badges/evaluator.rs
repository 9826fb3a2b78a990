use serde::{Deserialize, Serialize};

use super::{Badge, StatsSnapshot};
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeStatus {
    pub badge_id: String,
    pub unlocked: bool,
    /// 0..=100; always 100 when unlocked.
    pub progress_percent: u8,
}

/// Evaluate every badge against `stats`, preserving input order.
///
/// # Errors
/// Returns [`ConfigError::InconsistentBadge`] for the first badge that
/// unlocks while reporting less than 100% progress. No statuses are returned
/// in that case.
pub fn evaluate(badges: &[Badge], stats: &StatsSnapshot) -> Result<Vec<BadgeStatus>, ConfigError> {
    badges
        .iter()
        .map(|badge| {
            let unlocked = badge.is_unlocked(stats);
            let progress_percent = clamp_percent(badge.raw_progress(stats));
            if unlocked && progress_percent < 100 {
                tracing::warn!(badge = %badge.id, progress_percent, "badge unlocked below 100%");
                return Err(ConfigError::InconsistentBadge {
                    badge_id: badge.id.clone(),
                    progress: progress_percent,
                });
            }
            Ok(BadgeStatus {
                badge_id: badge.id.clone(),
                unlocked,
                progress_percent,
            })
        })
        .collect()
}

/// Floor to a whole percent so a locked badge never displays 100.
fn clamp_percent(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0).floor() as u8
}

/// Ids unlocked in `after` that were locked (or absent) in `before`.
pub fn newly_unlocked<'a>(before: &[BadgeStatus], after: &'a [BadgeStatus]) -> Vec<&'a str> {
    after
        .iter()
        .filter(|status| status.unlocked)
        .filter(|status| {
            !before
                .iter()
                .any(|prev| prev.badge_id == status.badge_id && prev.unlocked)
        })
        .map(|status| status.badge_id.as_str())
        .collect()
}
