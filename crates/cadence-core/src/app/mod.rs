//! App - アプリケーション層
//!
//! ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング（Fail-fast 検証）
//! - **Cadence**: 外部向けファサード
//! - **PipelineExecutor**: 1 タスクのステップを順番に実行
//! - **WorkerGroup**: 投入キューから ID を取って実行するワーカー群
//! - **TaskCounts**: 状態別の件数集計

pub mod builder;
pub mod executor;
pub mod service;
pub mod status;
pub mod worker;

// 主要な型を再エクスポート
pub use self::builder::{AppBuilder, BuildError};
pub use self::executor::PipelineExecutor;
pub use self::service::{Cadence, TaskIntake};
pub use self::status::TaskCounts;
pub use self::worker::WorkerGroup;
