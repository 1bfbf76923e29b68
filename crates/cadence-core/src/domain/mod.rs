//! Domain model (ids, tasks, steps, outcomes, plans, progress).

pub mod ids;
pub mod outcome;
pub mod plan;
pub mod progress;
pub mod step;
pub mod task;

pub use ids::{OwnerId, ParseIdError, PlannedJobId, TaskId};
pub use outcome::{OutcomeKind, StepOutcome};
pub use plan::{
    ContentCalendar, Milestone, PlannedJob, PlannedJobStatus, Priority, Topic, UpcomingJob,
};
pub use progress::{GoalStatus, GoalTarget, MetricsSnapshot, ProgressSnapshot, YieldEstimate};
pub use step::{RunStatus, Step};
pub use task::{Task, TaskConfig, TaskKind, TaskResult};
