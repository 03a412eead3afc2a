//! PlanCommitter port - plan を永続ログに書き込む
//!
//! Consensus and state-store writes live behind this trait.

use async_trait::async_trait;

use crate::domain::{Plan, PlanResult};
use crate::error::CommitError;

/// Commits one plan to durable cluster state.
///
/// The applier calls this for one plan at a time, in dequeue order.
#[async_trait]
pub trait PlanCommitter: Send + Sync {
    async fn commit(&self, plan: &Plan) -> Result<PlanResult, CommitError>;
}
