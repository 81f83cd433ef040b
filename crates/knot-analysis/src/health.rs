//! Bounded 0–100 health scores derived from raw graph metrics.
//!
//! Both scores are clamped to `[0, 100]` before rounding, so callers can
//! treat them as percentages without further checks.

/// Health of the connection graph given how many cycles it contains.
///
/// No cycles scores 100. Otherwise the score averages two penalties: a flat
/// `penalty_per_cycle` per cycle, and the number of cycles relative to the
/// number of items.
#[must_use]
pub fn cycle_health_score(cycle_count: usize, total_items: usize, penalty_per_cycle: f64) -> u8 {
    if cycle_count == 0 {
        return 100;
    }

    #[allow(clippy::cast_precision_loss)]
    let cycles = cycle_count as f64;
    #[allow(clippy::cast_precision_loss)]
    let items = total_items.max(1) as f64;

    let absolute = (100.0 - cycles * penalty_per_cycle).max(0.0);
    let relative = (100.0 - (cycles / items) * 100.0).max(0.0);
    to_score((absolute + relative) / 2.0)
}

/// Inputs to [`schedule_health_score`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleMetrics {
    pub node_count: usize,
    pub critical_count: usize,
    pub bottleneck_count: usize,
    pub average_slack: f64,
}

/// Health of a schedule: long critical paths and bottlenecks cost points,
/// average slack earns them back.
#[must_use]
pub fn schedule_health_score(metrics: ScheduleMetrics) -> u8 {
    if metrics.node_count == 0 {
        return 100;
    }

    #[allow(clippy::cast_precision_loss)]
    let nodes = metrics.node_count as f64;
    #[allow(clippy::cast_precision_loss)]
    let critical_ratio = metrics.critical_count as f64 / nodes;
    #[allow(clippy::cast_precision_loss)]
    let bottleneck_ratio = metrics.bottleneck_count as f64 / nodes;

    to_score(100.0 - critical_ratio * 30.0 - bottleneck_ratio * 20.0 + metrics.average_slack * 2.0)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0).round() as u8
}
