//! cadence-core
//!
//! ジョブパイプラインの実行基盤と、ゴール駆動のコンテンツスケジューラ。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, step, outcome, plan, progress）
//! - **ports**: 抽象化レイヤー（TaskStore, EventChannel, Clock, IdGenerator, 外部サービス, 推定器）
//! - **steps**: StepHandler とパイプライン定義（script-to-publish, batch-generation）
//! - **planner**: 進捗計算・カレンダー生成・スケジューラ
//! - **app**: アプリケーションロジック（builder, facade, executor, worker, status）
//! - **impls**: 実装（インメモリ / JSON ファイルストア、broadcast チャネル、ヒューリスティック実装）
//! - **config**: TOML 設定

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod planner;
pub mod ports;
pub mod steps;

#[cfg(test)]
mod testing;

pub use app::{AppBuilder, BuildError, Cadence, TaskCounts, WorkerGroup};
pub use config::{CadenceConfig, ConfigError};
pub use error::CadenceError;
