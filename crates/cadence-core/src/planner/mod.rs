//! Goal Planner / Scheduler
//!
//! - `progress`: 目標までの割合と残りユニット・日数
//! - `calendar`: ContentCalendar のレイアウト（純粋関数）
//! - `goal`: 上の 2 つを外部サービスと TaskStore 履歴につなぐ GoalPlanner
//! - `scheduler`: 期日の来たジョブを定期的に投入する

pub mod calendar;
pub mod goal;
pub mod progress;
pub mod scheduler;

pub use goal::{GoalPlanner, PlannerDeps};
pub use progress::compute_progress;
pub use scheduler::{ContentScheduler, SchedulerLoop, TaskSubmitter, TickReport};
