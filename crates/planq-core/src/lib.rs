//! planq-core
//!
//! Commit-ordering core of a cluster scheduler leader: scheduling workers
//! submit plans, a single applier commits them one at a time in priority
//! order, and each submitter waits on a future for the outcome.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, Plan, PlanResult）
//! - **queue**: PlanQueue, PendingPlan, PlanFuture
//! - **ports**: 抽象化レイヤー（PlanCommitter）
//! - **impls**: 実装（InMemoryCommitter など開発用）
//! - **app**: Applier ループと LeaderTerm
//! - **observability**: queue depth の定期レポート
//! - **config**: 環境変数からの設定

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;

pub use app::{Applier, LeaderTerm};
pub use config::PlanQueueConfig;
pub use domain::{EvalId, JobId, Plan, PlanResult};
pub use error::{CommitError, ConfigError, PlanQueueError};
pub use queue::{PendingPlan, PlanFuture, PlanOutcome, PlanQueue, QueueStats};
