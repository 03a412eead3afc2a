//! One-shot result cell shared between a submitter and the applier.
//!
//! The write half ([`Promise`]) stays inside the queue / pending plan and is
//! consumed when it fulfils. The read half ([`PlanFuture`]) is handed to the
//! submitter and can be cloned; every clone observes the same cached value.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use crate::domain::PlanResult;
use crate::error::PlanQueueError;

/// Terminal value of a [`PlanFuture`].
pub type PlanOutcome = Result<Arc<PlanResult>, PlanQueueError>;

type Slot = Option<PlanOutcome>;

/// Create an empty future together with the promise that fulfils it.
pub(crate) fn plan_future() -> (Promise, PlanFuture) {
    let (tx, rx) = watch::channel(None);
    (Promise { tx: Some(tx) }, PlanFuture { rx })
}

/// Read half of a plan's result cell.
///
/// `wait` can be called before or after fulfilment, any number of times, from
/// any number of clones. The lock of the queue is never involved.
#[derive(Debug, Clone)]
pub struct PlanFuture {
    rx: watch::Receiver<Slot>,
}

impl PlanFuture {
    /// Wait until the plan is applied, rejected, flushed or abandoned.
    pub async fn wait(&self) -> PlanOutcome {
        let mut rx = self.rx.clone();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(slot) => (*slot).clone(),
            // sender dropped without writing; Promise::drop normally prevents this
            Err(_) => None,
        };
        outcome.unwrap_or(Err(PlanQueueError::Abandoned))
    }

    /// The outcome, if it is already known.
    pub fn try_result(&self) -> Option<PlanOutcome> {
        self.rx.borrow().clone()
    }

    pub fn is_fulfilled(&self) -> bool {
        self.rx.borrow().is_some()
    }
}

/// Write half of a plan's result cell.
///
/// Fulfilling consumes the promise. Dropping an unfulfilled promise resolves
/// the future with [`PlanQueueError::Abandoned`] so no submitter waits forever.
#[derive(Debug)]
pub(crate) struct Promise {
    tx: Option<watch::Sender<Slot>>,
}

impl Promise {
    pub(crate) fn fulfill(mut self, outcome: PlanOutcome) {
        if let Some(tx) = self.tx.take() {
            settle(&tx, outcome);
        }
    }
}

impl Drop for Promise {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            warn!("plan future dropped before it was fulfilled");
            settle(&tx, Err(PlanQueueError::Abandoned));
        }
    }
}

fn settle(tx: &watch::Sender<Slot>, outcome: PlanOutcome) {
    // send_modify writes even when no receiver is alive
    tx.send_modify(|slot| {
        assert!(slot.is_none(), "plan future fulfilled twice");
        *slot = Some(outcome);
    });
}
