use super::{Badge, Metric};

/// Built-in achievements, keyed by id, in display order.
pub fn default_catalog() -> Vec<Badge> {
    vec![
        Badge::threshold(
            "first-course",
            "First Steps",
            "Complete your first course",
            Metric::CoursesCompleted,
            1,
        )
        .with_style("footprints", "#22c55e"),
        Badge::threshold(
            "streak-3",
            "On Fire",
            "Study three days in a row",
            Metric::Streak,
            3,
        )
        .with_style("flame", "#f97316"),
        Badge::threshold(
            "streak-7",
            "Week Warrior",
            "Keep a seven-day streak",
            Metric::Streak,
            7,
        )
        .with_style("calendar-check", "#ef4444"),
        Badge::threshold(
            "xp-1000",
            "Knowledge Seeker",
            "Earn 1000 XP",
            Metric::Xp,
            1000,
        )
        .with_style("zap", "#eab308"),
        Badge::threshold(
            "concepts-50",
            "Memory Master",
            "Learn 50 concepts",
            Metric::ConceptsLearned,
            50,
        )
        .with_style("brain", "#a855f7"),
        Badge::threshold(
            "creator",
            "Course Creator",
            "Create your own course",
            Metric::CoursesCreated,
            1,
        )
        .with_style("pen-tool", "#3b82f6"),
        Badge::threshold(
            "scholar",
            "Scholar",
            "Complete five courses",
            Metric::CoursesCompleted,
            5,
        )
        .with_style("graduation-cap", "#0ea5e9"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique() {
        let catalog = default_catalog();
        let ids: HashSet<_> = catalog.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids.len(), catalog.len());
    }
}
