//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryCommitter**: 開発用の PlanCommitter
//!
//! 本番用の commit log（Raft など）は別クレートに配置します。

pub mod inmem_committer;

pub use self::inmem_committer::InMemoryCommitter;
