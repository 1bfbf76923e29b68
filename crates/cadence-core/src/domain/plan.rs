//! Planned jobs and content calendars.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{OwnerId, PlannedJobId, TaskId};
use super::progress::GoalTarget;
use super::task::{TaskConfig, TaskKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlannedJobStatus {
    Planned,
    Generating,
    Ready,
    Published,
}

/// A candidate subject for a future unit of work, as returned by a topic source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub title: String,
    pub niche: String,

    /// 0..=100.
    pub viral_score: u8,

    pub estimated_views: u64,
}

/// A future task on an owner's calendar, not yet submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedJob {
    pub id: PlannedJobId,
    pub scheduled_date: NaiveDate,
    pub topic: Topic,
    pub priority: Priority,

    /// Projected contribution toward the secondary goal metric.
    pub estimated_impact: f64,

    pub status: PlannedJobStatus,

    /// Task submitted for this job, once generation has started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
}

impl PlannedJob {
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.status == PlannedJobStatus::Planned && self.scheduled_date <= today
    }

    /// Submission for this job. Scripts are generated by the pipeline, so the topic is the input.
    pub fn to_submission(&self) -> (TaskKind, TaskConfig) {
        let config = TaskConfig::script(&self.topic.title, &self.topic.niche, &self.topic.title);
        (TaskKind::ScriptToPublish, config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// Days from the calendar start.
    pub day: u32,
    pub label: String,
    pub primary_threshold: f64,
    pub achieved: bool,
}

/// Ordered, capped plan of future jobs for one owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentCalendar {
    pub owner_id: OwnerId,
    pub generated_at: DateTime<Utc>,
    pub target: GoalTarget,
    pub cadence_per_week: f64,

    /// Buffered units needed to cross the target, before the list cap.
    pub units_needed: u32,

    pub jobs: Vec<PlannedJob>,
    pub milestones: Vec<Milestone>,
    pub estimated_completion: NaiveDate,

    /// Jobs that reached `ready` or `published` since the calendar was planned.
    pub units_generated: u32,

    /// Content tips for the owner.
    #[serde(default)]
    pub strategy: Vec<String>,
}

impl ContentCalendar {
    pub fn next_due(&self, today: NaiveDate) -> Option<&PlannedJob> {
        self.jobs.iter().find(|j| j.is_due(today))
    }

    pub fn job_mut(&mut self, id: PlannedJobId) -> Option<&mut PlannedJob> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    pub fn count(&self, status: PlannedJobStatus) -> usize {
        self.jobs.iter().filter(|j| j.status == status).count()
    }
}

/// A planned job together with the owner whose calendar holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingJob {
    pub owner_id: OwnerId,
    pub job: PlannedJob,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn job(date: NaiveDate, status: PlannedJobStatus) -> PlannedJob {
        PlannedJob {
            id: PlannedJobId::from_ulid(Ulid::new()),
            scheduled_date: date,
            topic: Topic {
                title: "The Mystery Finally Solved".into(),
                niche: "mystery".into(),
                viral_score: 90,
                estimated_views: 12_000,
            },
            priority: Priority::Critical,
            estimated_impact: 0.0,
            status,
            task_id: None,
        }
    }

    #[test]
    fn only_planned_jobs_on_or_before_today_are_due() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let yesterday = today.pred_opt().unwrap();
        let tomorrow = today.succ_opt().unwrap();

        assert!(job(today, PlannedJobStatus::Planned).is_due(today));
        assert!(job(yesterday, PlannedJobStatus::Planned).is_due(today));
        assert!(!job(tomorrow, PlannedJobStatus::Planned).is_due(today));
        assert!(!job(yesterday, PlannedJobStatus::Generating).is_due(today));
    }

    #[test]
    fn submission_uses_topic_as_input() {
        let j = job(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), PlannedJobStatus::Planned);
        let (kind, config) = j.to_submission();
        assert_eq!(kind, TaskKind::ScriptToPublish);
        assert_eq!(config.niche, "mystery");
        assert_eq!(config.input, "The Mystery Finally Solved");
        assert!(!config.auto_publish);
    }

    #[test]
    fn priority_orders_critical_first() {
        assert!(Priority::Critical < Priority::High);
        assert!(Priority::Medium < Priority::Low);
    }
}
