//! Port implementations (in-memory, file-backed, heuristic).

pub mod broadcast_channel;
pub mod estimators;
pub mod heuristics;
pub mod inmem_store;
pub mod json_store;
pub mod submission_queue;

pub use broadcast_channel::BroadcastEventChannel;
pub use estimators::{HistoricalYieldEstimator, ViewsImpactEstimator};
pub use inmem_store::InMemoryTaskStore;
pub use json_store::JsonFileTaskStore;
pub use submission_queue::SubmissionQueue;
