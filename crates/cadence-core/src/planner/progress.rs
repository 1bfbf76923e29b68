//! Percent-to-goal and time-to-goal.
//!
//! Each metric's percent is capped at 100 and the two are averaged, so a
//! large primary value never hides a missing secondary value.

use crate::domain::{GoalStatus, GoalTarget, MetricsSnapshot, ProgressSnapshot, YieldEstimate};
use crate::error::CadenceError;

/// Blend at or above which an owner is "nearly there".
pub const NEARLY_THERE: f64 = 75.0;

/// Slowest accepted cadence: one unit a year.
pub const MIN_CADENCE_PER_WEEK: f64 = 7.0 / 365.0;

/// `min(100, current / target * 100)`; a non-positive target counts as met.
pub fn metric_percent(current: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 100.0;
    }
    (current / target * 100.0).clamp(0.0, 100.0)
}

/// Mean of the two capped percentages.
pub fn blended_percent(current: MetricsSnapshot, target: GoalTarget) -> f64 {
    (metric_percent(current.primary, target.primary) + metric_percent(current.secondary, target.secondary)) / 2.0
}

pub fn goal_status(blend: f64) -> GoalStatus {
    if blend <= 0.0 {
        GoalStatus::NotStarted
    } else if blend >= 100.0 {
        GoalStatus::Achieved
    } else if blend >= NEARLY_THERE {
        GoalStatus::NearlyThere
    } else {
        GoalStatus::InProgress
    }
}

/// Units needed to close `remaining` at `per_unit` each, rounded up.
fn units_for(remaining: f64, per_unit: f64) -> u32 {
    if remaining <= 0.0 {
        return 0;
    }
    if per_unit <= 0.0 {
        return u32::MAX;
    }
    // float -> int casts saturate
    (remaining / per_unit).ceil() as u32
}

/// `max(units for primary, units for secondary)`.
pub fn units_remaining(current: MetricsSnapshot, target: GoalTarget, yield_per_unit: &YieldEstimate) -> u32 {
    let primary = units_for(target.primary - current.primary, yield_per_unit.primary_per_unit);
    let secondary = units_for(target.secondary - current.secondary, yield_per_unit.secondary_per_unit);
    primary.max(secondary)
}

/// `ceil(units * 7 / cadence)`.
///
/// Cadences below [`MIN_CADENCE_PER_WEEK`], NaN and infinity are rejected.
pub fn days_for(units: u32, cadence_per_week: f64) -> Result<u32, CadenceError> {
    if !(cadence_per_week >= MIN_CADENCE_PER_WEEK && cadence_per_week.is_finite()) {
        return Err(CadenceError::InvalidCadence(cadence_per_week));
    }
    Ok((f64::from(units) * 7.0 / cadence_per_week).ceil() as u32)
}

pub fn compute_progress(
    current: MetricsSnapshot,
    target: GoalTarget,
    yield_per_unit: &YieldEstimate,
    cadence_per_week: f64,
) -> Result<ProgressSnapshot, CadenceError> {
    let blend = blended_percent(current, target);
    let units = units_remaining(current, target, yield_per_unit);
    let days = days_for(units, cadence_per_week)?;

    Ok(ProgressSnapshot {
        current_primary: current.primary,
        target_primary: target.primary,
        current_secondary: current.secondary,
        target_secondary: target.secondary,
        percentage: blend.floor() as u8,
        estimated_units_remaining: units,
        estimated_days_remaining: days,
        status: goal_status(blend),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::estimators::DEFAULT_YIELD;
    use rstest::rstest;

    fn target() -> GoalTarget {
        GoalTarget::new(1_000.0, 240_000.0)
    }

    #[test]
    fn nothing_yet_is_not_started() {
        let p = compute_progress(MetricsSnapshot::new(0.0, 0.0), target(), &DEFAULT_YIELD, 3.0).unwrap();
        assert_eq!(p.percentage, 0);
        assert_eq!(p.status, GoalStatus::NotStarted);
        // primary: ceil(1000 / 150) = 7, secondary: ceil(240000 / 90000) = 3
        assert_eq!(p.estimated_units_remaining, 7);
        // ceil(7 * 7 / 3)
        assert_eq!(p.estimated_days_remaining, 17);
    }

    #[test]
    fn both_targets_met_is_achieved() {
        let p = compute_progress(MetricsSnapshot::new(1_000.0, 240_000.0), target(), &DEFAULT_YIELD, 3.0).unwrap();
        assert_eq!(p.percentage, 100);
        assert_eq!(p.status, GoalStatus::Achieved);
        assert_eq!(p.estimated_units_remaining, 0);
        assert_eq!(p.estimated_days_remaining, 0);
    }

    #[test]
    fn halfway_on_both_is_fifty_percent() {
        let p = compute_progress(MetricsSnapshot::new(500.0, 120_000.0), target(), &DEFAULT_YIELD, 3.0).unwrap();
        assert_eq!(p.percentage, 50);
        assert_eq!(p.status, GoalStatus::InProgress);
        assert_eq!(p.estimated_units_remaining, 4);
    }

    #[test]
    fn overshooting_one_metric_is_capped() {
        let p = compute_progress(MetricsSnapshot::new(5_000.0, 0.0), target(), &DEFAULT_YIELD, 3.0).unwrap();
        assert_eq!(p.percentage, 50);
        assert_eq!(p.status, GoalStatus::InProgress);
    }

    #[rstest]
    #[case::tiny(0.5, GoalStatus::InProgress)]
    #[case::seventy_four(74.9, GoalStatus::InProgress)]
    #[case::seventy_five(75.0, GoalStatus::NearlyThere)]
    #[case::ninety_nine(99.9, GoalStatus::NearlyThere)]
    #[case::done(100.0, GoalStatus::Achieved)]
    fn status_buckets(#[case] blend: f64, #[case] expected: GoalStatus) {
        assert_eq!(goal_status(blend), expected);
    }

    #[test]
    fn zero_target_counts_as_met() {
        assert_eq!(metric_percent(10.0, 0.0), 100.0);
    }

    #[test]
    fn percentage_floors_half_points() {
        // primary 25%, secondary 0% -> blend 12.5
        let p = compute_progress(MetricsSnapshot::new(250.0, 0.0), target(), &DEFAULT_YIELD, 3.0).unwrap();
        assert_eq!(blended_percent(MetricsSnapshot::new(250.0, 0.0), target()), 12.5);
        assert_eq!(p.percentage, 12);

        let p = compute_progress(MetricsSnapshot::new(999.0, 240_000.0), target(), &DEFAULT_YIELD, 3.0).unwrap();
        assert_eq!(p.percentage, 99);
        assert_eq!(p.status, GoalStatus::NearlyThere);
    }

    #[rstest]
    #[case::zero(0.0)]
    #[case::negative(-1.0)]
    #[case::nan(f64::NAN)]
    #[case::tiny(1e-7)]
    #[case::under_once_a_year(0.019)]
    #[case::infinite(f64::INFINITY)]
    fn unusable_cadence_is_rejected(#[case] cadence: f64) {
        assert!(matches!(days_for(3, cadence), Err(CadenceError::InvalidCadence(_))));
    }

    #[test]
    fn once_a_year_is_accepted() {
        assert_eq!(days_for(1, MIN_CADENCE_PER_WEEK).unwrap(), 365);
    }

    #[test]
    fn zero_yield_saturates_units() {
        let no_yield = YieldEstimate {
            primary_per_unit: 0.0,
            secondary_per_unit: 0.0,
            sample_size: 0,
        };
        assert_eq!(units_remaining(MetricsSnapshot::default(), target(), &no_yield), u32::MAX);
    }
}
