//! Content calendar layout.
//!
//! Pure functions only: callers supply topics, ids, and "today".

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};

use crate::config::PlannerConfig;
use crate::domain::{
    ContentCalendar, GoalTarget, Milestone, OwnerId, PlannedJob, PlannedJobStatus, Priority, Topic,
};
use crate::error::CadenceError;
use crate::ports::{IdGenerator, ImpactEstimator};

/// Milestones as fractions of the primary target.
pub const MILESTONE_FRACTIONS: [f64; 5] = [0.10, 0.25, 0.50, 0.75, 1.0];

/// Upper bound on the gap between two jobs.
pub const MAX_SPACING_DAYS: i64 = 365;

/// Days between consecutive jobs: `round(7 / cadence)` kept within `1..=MAX_SPACING_DAYS`.
pub fn spacing_days(cadence_per_week: f64) -> i64 {
    // NaN -> 0 (cast), 0 -> 1
    ((7.0 / cadence_per_week).round() as i64).clamp(1, MAX_SPACING_DAYS)
}

/// Content tips attached to every calendar.
pub fn strategy(cadence_per_week: f64, niche: &str) -> Vec<String> {
    let mut tips = vec![
        format!("Publish about {cadence_per_week:.1} per week and keep the schedule steady"),
        format!("Favour high-viral {niche} topics to maximize reach"),
    ];
    tips.extend(
        [
            "Optimize thumbnails and titles for click-through rate",
            "Reply to comments early to boost engagement",
            "Cross-promote earlier uploads in end screens",
        ]
        .map(String::from),
    );
    tips
}

fn offset(start: NaiveDate, days: i64) -> Result<NaiveDate, CadenceError> {
    TimeDelta::try_days(days)
        .and_then(|delta| start.checked_add_signed(delta))
        .ok_or(CadenceError::CalendarOutOfRange(start))
}

/// `ceil(units_remaining * buffer_factor)`.
pub fn buffered_units(units_remaining: u32, buffer_factor: f64) -> u32 {
    (f64::from(units_remaining) * buffer_factor).ceil() as u32
}

pub fn priority_at(index: usize, settings: &PlannerConfig) -> Priority {
    if index < settings.critical_count {
        Priority::Critical
    } else if index < settings.critical_count + settings.high_count {
        Priority::High
    } else {
        Priority::Medium
    }
}

pub fn milestones(target: GoalTarget, current_primary: f64, days_to_goal: u32) -> Vec<Milestone> {
    MILESTONE_FRACTIONS
        .iter()
        .map(|&fraction| {
            let threshold = (target.primary * fraction).round();
            Milestone {
                day: ((f64::from(days_to_goal) * fraction).round() as u32).max(1),
                label: format!("{threshold} primary ({:.0}%)", fraction * 100.0),
                primary_threshold: threshold,
                achieved: current_primary >= threshold,
            }
        })
        .collect()
}

/// Everything a calendar layout needs apart from the collaborators.
pub struct CalendarInputs {
    pub owner_id: OwnerId,
    pub target: GoalTarget,
    pub current_primary: f64,
    pub cadence_per_week: f64,
    pub niche: String,
    pub units_needed: u32,
    pub days_to_goal: u32,
    pub today: NaiveDate,
    pub now: DateTime<Utc>,
}

/// Lays `topics` out from `today`, one per spacing interval, up to the cap.
pub fn layout(
    inputs: CalendarInputs,
    topics: Vec<Topic>,
    settings: &PlannerConfig,
    impact: &dyn ImpactEstimator,
    ids: &dyn IdGenerator,
) -> Result<ContentCalendar, CadenceError> {
    let limit = (inputs.units_needed as usize).min(settings.max_planned_jobs);
    let spacing = spacing_days(inputs.cadence_per_week);

    let jobs = topics
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, topic)| {
            let days = spacing
                .checked_mul(i as i64)
                .ok_or(CadenceError::CalendarOutOfRange(inputs.today))?;
            Ok(PlannedJob {
                id: ids.planned_job_id(),
                scheduled_date: offset(inputs.today, days)?,
                priority: priority_at(i, settings),
                estimated_impact: impact.impact(&topic),
                topic,
                status: PlannedJobStatus::Planned,
                task_id: None,
            })
        })
        .collect::<Result<Vec<PlannedJob>, CadenceError>>()?;

    let last = jobs.last().map_or(inputs.today, |j| j.scheduled_date);
    Ok(ContentCalendar {
        owner_id: inputs.owner_id,
        generated_at: inputs.now,
        target: inputs.target,
        cadence_per_week: inputs.cadence_per_week,
        units_needed: inputs.units_needed,
        jobs,
        milestones: milestones(inputs.target, inputs.current_primary, inputs.days_to_goal),
        estimated_completion: offset(last, settings.completion_buffer_days)?,
        units_generated: 0,
        strategy: strategy(inputs.cadence_per_week, &inputs.niche),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::ViewsImpactEstimator;
    use crate::ports::UlidGenerator;
    use crate::testing;
    use chrono::Duration;
    use rstest::rstest;

    fn topics(n: usize) -> Vec<Topic> {
        (0..n)
            .map(|i| Topic {
                title: format!("topic {i}"),
                niche: "mystery".into(),
                viral_score: 90,
                estimated_views: 10_000,
            })
            .collect()
    }

    fn plan(units_needed: u32, cadence: f64, available: usize) -> ContentCalendar {
        plan_from(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(), units_needed, cadence, available).unwrap()
    }

    fn plan_from(
        today: NaiveDate,
        units_needed: u32,
        cadence: f64,
        available: usize,
    ) -> Result<ContentCalendar, CadenceError> {
        let ids = UlidGenerator::new(testing::clock());
        layout(
            CalendarInputs {
                owner_id: OwnerId::new("o"),
                target: GoalTarget::new(1_000.0, 240_000.0),
                current_primary: 100.0,
                cadence_per_week: cadence,
                niche: "mystery".into(),
                units_needed,
                days_to_goal: 40,
                today,
                now: Utc::now(),
            },
            topics(available),
            &PlannerConfig::default(),
            &ViewsImpactEstimator,
            &ids,
        )
    }

    #[rstest]
    #[case::daily(7.0, 1)]
    #[case::three_a_week(3.0, 2)]
    #[case::weekly(1.0, 7)]
    #[case::many_per_day(20.0, 1)]
    #[case::fortnightly(0.5, 14)]
    #[case::glacial(1e-7, MAX_SPACING_DAYS)]
    #[case::nan(f64::NAN, 1)]
    fn spacing_rounds_seven_over_cadence(#[case] cadence: f64, #[case] expected: i64) {
        assert_eq!(spacing_days(cadence), expected);
    }

    #[test]
    fn list_is_capped_at_twenty() {
        let cal = plan(45, 3.0, 45);
        assert_eq!(cal.jobs.len(), 20);
        assert_eq!(cal.units_needed, 45);
    }

    #[test]
    fn short_plans_are_not_padded() {
        assert_eq!(plan(5, 3.0, 20).jobs.len(), 5);
        // topic source came back short
        assert_eq!(plan(10, 3.0, 6).jobs.len(), 6);
    }

    #[test]
    fn priorities_follow_position() {
        let cal = plan(12, 3.0, 12);
        let priorities: Vec<_> = cal.jobs.iter().map(|j| j.priority).collect();
        assert!(priorities[..3].iter().all(|p| *p == Priority::Critical));
        assert!(priorities[3..7].iter().all(|p| *p == Priority::High));
        assert!(priorities[7..].iter().all(|p| *p == Priority::Medium));
    }

    #[test]
    fn dates_start_today_and_strictly_increase() {
        let cal = plan(10, 3.0, 10);
        assert_eq!(cal.jobs[0].scheduled_date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        for pair in cal.jobs.windows(2) {
            assert_eq!(pair[1].scheduled_date - pair[0].scheduled_date, Duration::days(2));
        }
        let last = cal.jobs.last().unwrap().scheduled_date;
        assert_eq!(cal.estimated_completion, last + Duration::days(30));
    }

    #[test]
    fn tiny_cadence_keeps_dates_in_range() {
        let cal = plan(20, 1e-7, 20);
        let last = cal.jobs.last().unwrap().scheduled_date;
        assert_eq!(last - cal.jobs[0].scheduled_date, Duration::days(19 * MAX_SPACING_DAYS));
    }

    #[test]
    fn dates_past_the_calendar_end_are_an_error() {
        let near_end = NaiveDate::MAX - Duration::days(10);
        let err = plan_from(near_end, 5, 1.0, 5).unwrap_err();
        assert!(matches!(err, CadenceError::CalendarOutOfRange(d) if d == near_end));
    }

    #[test]
    fn strategy_tips_mention_cadence_and_niche() {
        let cal = plan(3, 3.0, 3);
        assert_eq!(cal.strategy.len(), 5);
        assert!(cal.strategy[0].contains("3.0 per week"));
        assert!(cal.strategy[1].contains("mystery"));
        assert_eq!(strategy(0.5, "tech")[0], "Publish about 0.5 per week and keep the schedule steady");
    }

    #[test]
    fn impact_and_status_are_filled_in() {
        let cal = plan(3, 3.0, 3);
        assert!(cal.jobs.iter().all(|j| j.status == PlannedJobStatus::Planned));
        assert!(cal.jobs.iter().all(|j| j.estimated_impact == 48_000.0));
    }

    #[test]
    fn milestones_scale_with_days_to_goal() {
        let ms = milestones(GoalTarget::new(1_000.0, 240_000.0), 250.0, 40);
        let days: Vec<u32> = ms.iter().map(|m| m.day).collect();
        assert_eq!(days, vec![4, 10, 20, 30, 40]);
        let achieved: Vec<bool> = ms.iter().map(|m| m.achieved).collect();
        assert_eq!(achieved, vec![true, true, false, false, false]);
        assert_eq!(ms[0].primary_threshold, 100.0);
    }

    #[test]
    fn milestone_days_are_at_least_one() {
        let ms = milestones(GoalTarget::new(1_000.0, 1.0), 0.0, 0);
        assert!(ms.iter().all(|m| m.day >= 1));
    }

    #[test]
    fn buffer_rounds_up() {
        assert_eq!(buffered_units(7, 1.2), 9);
        assert_eq!(buffered_units(0, 1.2), 0);
        assert_eq!(buffered_units(10, 1.2), 12);
    }
}
