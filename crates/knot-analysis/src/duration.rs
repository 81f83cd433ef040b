//! Duration estimation policies.
//!
//! The scheduler never looks at item types or priorities directly; it asks a
//! [`DurationEstimator`] for a whole number of days per item. Callers with
//! better data (historical velocity, explicit estimates) plug in their own.

use knot_core::config::DurationConfig;
use knot_core::model::item::WorkItem;

/// Maps a work item to an estimated duration in whole days.
pub trait DurationEstimator: Send + Sync {
    fn estimate(&self, item: &WorkItem) -> u32;
}

impl<F> DurationEstimator for F
where
    F: Fn(&WorkItem) -> u32 + Send + Sync,
{
    fn estimate(&self, item: &WorkItem) -> u32 {
        self(item)
    }
}

/// Type-based table scaled by a priority factor, rounded to the nearest day.
///
/// With the stock table an epic takes 30 days, a feature 14, a user story 5,
/// a task 3 and a bug 2; other types take 5. Critical work is multiplied by
/// 0.8, high by 1.0, medium by 1.2 and low by 1.5.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableEstimator {
    table: DurationConfig,
}

impl TableEstimator {
    #[must_use]
    pub const fn new(table: DurationConfig) -> Self {
        Self { table }
    }
}

impl DurationEstimator for TableEstimator {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn estimate(&self, item: &WorkItem) -> u32 {
        let days =
            self.table.base_days(item.item_type) * self.table.priority_factor(item.priority);
        if days.is_nan() || days <= 0.0 {
            return 0;
        }
        days.round().min(f64::from(u32::MAX)) as u32
    }
}

/// Prefer the item's explicit `estimate_days`; otherwise defer to `fallback`.
#[derive(Debug, Clone, Default)]
pub struct ExplicitEstimate<E> {
    fallback: E,
}

impl<E: DurationEstimator> ExplicitEstimate<E> {
    pub const fn new(fallback: E) -> Self {
        Self { fallback }
    }
}

impl<E: DurationEstimator> DurationEstimator for ExplicitEstimate<E> {
    fn estimate(&self, item: &WorkItem) -> u32 {
        item.estimate_days.unwrap_or_else(|| self.fallback.estimate(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knot_core::model::item::{ItemType, Priority};

    fn item(ty: ItemType, priority: Priority) -> WorkItem {
        WorkItem::new("x", "x", ty).with_priority(priority)
    }

    #[test]
    fn stock_table_values() {
        let est = TableEstimator::default();
        assert_eq!(est.estimate(&item(ItemType::Epic, Priority::High)), 30);
        assert_eq!(est.estimate(&item(ItemType::Epic, Priority::Critical)), 24);
        assert_eq!(est.estimate(&item(ItemType::Feature, Priority::Medium)), 17);
        assert_eq!(est.estimate(&item(ItemType::UserStory, Priority::High)), 5);
        assert_eq!(est.estimate(&item(ItemType::Bug, Priority::Medium)), 2);
        assert_eq!(est.estimate(&item(ItemType::Other, Priority::High)), 5);
    }

    #[test]
    fn halves_round_up() {
        let est = TableEstimator::default();
        // 3 * 1.5 = 4.5, 5 * 1.5 = 7.5
        assert_eq!(est.estimate(&item(ItemType::Task, Priority::Low)), 5);
        assert_eq!(est.estimate(&item(ItemType::UserStory, Priority::Low)), 8);
    }

    #[test]
    fn custom_table_is_honoured() {
        let table = DurationConfig {
            bug: 1.0,
            medium_factor: 3.0,
            ..DurationConfig::default()
        };
        let est = TableEstimator::new(table);
        assert_eq!(est.estimate(&item(ItemType::Bug, Priority::Medium)), 3);
    }

    #[test]
    fn negative_durations_clamp_to_zero() {
        let table = DurationConfig {
            task: -4.0,
            ..DurationConfig::default()
        };
        let est = TableEstimator::new(table);
        assert_eq!(est.estimate(&item(ItemType::Task, Priority::High)), 0);
    }

    #[test]
    fn explicit_estimate_wins_over_table() {
        let est = ExplicitEstimate::new(TableEstimator::default());
        let with = item(ItemType::Epic, Priority::High).with_estimate(2);
        let without = item(ItemType::Epic, Priority::High);
        assert_eq!(est.estimate(&with), 2);
        assert_eq!(est.estimate(&without), 30);
    }

    #[test]
    fn closures_are_estimators() {
        let flat = |_: &WorkItem| 7_u32;
        assert_eq!(flat.estimate(&item(ItemType::Bug, Priority::Low)), 7);
    }
}
