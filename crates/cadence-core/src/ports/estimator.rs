//! Estimator ports - 歩留まり（yield）とインパクトの推定
//!
//! Planner の制御フローを変えずに、推定ロジックだけを
//! 実測値ベースのものに差し替えられるようにするための seam です。

use crate::domain::{Task, Topic, YieldEstimate};

/// YieldEstimator は 1 ユニット（完了タスク 1 件）あたりの伸びを推定
///
/// # 履歴が無い場合
/// 失敗させずに保守的なデフォルト値を返すこと（sample_size = 0）。
pub trait YieldEstimator: Send + Sync {
    fn estimate(&self, history: &[Task]) -> YieldEstimate;
}

/// ImpactEstimator はトピックのゴール指標への寄与を推定
pub trait ImpactEstimator: Send + Sync {
    fn impact(&self, topic: &Topic) -> f64;
}
