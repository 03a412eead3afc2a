//! Ports - 外部システムへの抽象化レイヤー
//!
//! The queue itself has no external dependencies. The applier reaches the
//! durable log through [`PlanCommitter`], so tests and the demo can swap in
//! an in-memory implementation.

pub mod committer;

pub use self::committer::PlanCommitter;
