//! Yield / impact estimators backed by completed-task history.

use tracing::debug;

use crate::domain::{RunStatus, Task, Topic, YieldEstimate};
use crate::ports::{ImpactEstimator, YieldEstimator};

/// Share of viewers assumed to become primary-metric gains (subscribers).
pub const CONVERSION_RATE: f64 = 0.01;
/// Fraction of a piece's duration an average viewer watches.
pub const RETENTION_RATE: f64 = 0.6;
/// Assumed minutes watched per view when scoring a topic's impact.
pub const MINUTES_PER_VIEW: f64 = 8.0;

/// Default per-unit yield: 15 000 views at 10 minutes, 60% retention.
pub const DEFAULT_YIELD: YieldEstimate = YieldEstimate {
    primary_per_unit: 15_000.0 * CONVERSION_RATE,
    secondary_per_unit: 15_000.0 * 10.0 * RETENTION_RATE,
    sample_size: 0,
};

/// Averages `estimated_views` and `duration_minutes` over completed tasks.
#[derive(Debug, Clone)]
pub struct HistoricalYieldEstimator {
    fallback: YieldEstimate,
}

impl HistoricalYieldEstimator {
    pub fn new() -> Self {
        Self {
            fallback: DEFAULT_YIELD,
        }
    }

    pub fn with_fallback(fallback: YieldEstimate) -> Self {
        Self { fallback }
    }
}

impl Default for HistoricalYieldEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl YieldEstimator for HistoricalYieldEstimator {
    fn estimate(&self, history: &[Task]) -> YieldEstimate {
        let samples: Vec<(f64, f64)> = history
            .iter()
            .filter(|t| t.status == RunStatus::Completed)
            .filter_map(|t| {
                let result = t.result.as_ref()?;
                let views = result.metric("estimated_views")?;
                let minutes = result.metric("duration_minutes")?;
                Some((views, minutes))
            })
            .collect();

        if samples.is_empty() {
            debug!(history = history.len(), "no completed history; using default yield");
            return YieldEstimate {
                sample_size: 0,
                ..self.fallback
            };
        }

        let n = samples.len() as f64;
        let primary = samples.iter().map(|(v, _)| v * CONVERSION_RATE).sum::<f64>() / n;
        let secondary = samples.iter().map(|(v, m)| v * m * RETENTION_RATE).sum::<f64>() / n;
        debug!(samples = samples.len(), primary, secondary, "yield estimated from history");

        YieldEstimate {
            primary_per_unit: primary,
            secondary_per_unit: secondary,
            sample_size: samples.len(),
        }
    }
}

/// Impact = views × minutes per view × retention.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewsImpactEstimator;

impl ImpactEstimator for ViewsImpactEstimator {
    fn impact(&self, topic: &Topic) -> f64 {
        topic.estimated_views as f64 * MINUTES_PER_VIEW * RETENTION_RATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OwnerId, TaskConfig, TaskId, TaskKind, TaskResult};
    use chrono::Utc;
    use ulid::Ulid;

    fn completed(views: f64, minutes: f64) -> Task {
        let mut t = Task::new(
            TaskId::from_ulid(Ulid::new()),
            TaskKind::ScriptToPublish,
            OwnerId::new("o"),
            TaskConfig::default(),
            ["a"],
            Utc::now(),
        );
        t.status = RunStatus::Completed;
        let mut result = TaskResult::default();
        result.metrics.insert("estimated_views".into(), views);
        result.metrics.insert("duration_minutes".into(), minutes);
        t.result = Some(result);
        t
    }

    #[test]
    fn empty_history_uses_default() {
        let est = HistoricalYieldEstimator::new().estimate(&[]);
        assert_eq!(est.sample_size, 0);
        assert_eq!(est.primary_per_unit, 150.0);
        assert_eq!(est.secondary_per_unit, 90_000.0);
    }

    #[test]
    fn averages_completed_tasks_only() {
        let mut failed = completed(1_000_000.0, 10.0);
        failed.status = RunStatus::Failed;
        let history = vec![completed(10_000.0, 10.0), completed(30_000.0, 5.0), failed];

        let est = HistoricalYieldEstimator::new().estimate(&history);

        assert_eq!(est.sample_size, 2);
        assert_eq!(est.primary_per_unit, 200.0);
        // (10000*10*0.6 + 30000*5*0.6) / 2
        assert_eq!(est.secondary_per_unit, 75_000.0);
    }

    #[test]
    fn impact_uses_views() {
        let topic = Topic {
            title: "t".into(),
            niche: "n".into(),
            viral_score: 90,
            estimated_views: 10_000,
        };
        assert_eq!(ViewsImpactEstimator.impact(&topic), 48_000.0);
    }
}
