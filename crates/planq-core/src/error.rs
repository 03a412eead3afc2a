use thiserror::Error;

/// Errors surfaced by the plan queue, either as a call return (`NotEnabled`)
/// or through a [`PlanFuture`](crate::queue::PlanFuture).
///
/// `Clone` because one outcome is broadcast to every waiter of a future.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanQueueError {
    /// The queue is not accepting submissions (not the leader, or not ready yet).
    #[error("plan queue is disabled")]
    NotEnabled,

    /// The queue was disabled while the plan was still pending.
    #[error("plan queue flushed")]
    Flushed,

    /// The applier failed to commit the plan.
    #[error("plan apply failed: {0}")]
    Apply(String),

    /// The pending plan was dropped without a response.
    #[error("pending plan dropped without a response")]
    Abandoned,
}

/// Errors returned by a [`PlanCommitter`](crate::ports::PlanCommitter).
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("plan rejected: {0}")]
    Rejected(String),

    #[error("commit log unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_stable() {
        assert_eq!(PlanQueueError::NotEnabled.to_string(), "plan queue is disabled");
        assert_eq!(PlanQueueError::Flushed.to_string(), "plan queue flushed");
        assert_eq!(
            PlanQueueError::Apply("node full".into()).to_string(),
            "plan apply failed: node full"
        );
    }

    #[test]
    fn config_error_names_the_variable() {
        let err = ConfigError::Invalid {
            var: "PLANQ_DEQUEUE_TIMEOUT_MS",
            value: "soon".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("PLANQ_DEQUEUE_TIMEOUT_MS"));
        assert!(msg.contains("soon"));
    }
}
