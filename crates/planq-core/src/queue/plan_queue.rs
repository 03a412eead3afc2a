//! Priority-ordered plan queue between scheduling workers and the applier.

use std::collections::BinaryHeap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info};

use super::future::{PlanFuture, plan_future};
use super::pending::{PendingPlan, QueuedPlan};
use crate::domain::Plan;
use crate::error::PlanQueueError;

/// Snapshot of the queue for dashboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Plans enqueued but not yet dequeued.
    pub depth: usize,
}

struct PlanQueueState {
    enabled: bool,

    backlog: BinaryHeap<QueuedPlan>,

    /// Next insertion sequence to assign.
    next_sequence: u64,

    /// Bumped on every enabled -> disabled transition.
    flush_generation: u64,
}

impl PlanQueueState {
    fn new() -> Self {
        Self {
            enabled: false,
            backlog: BinaryHeap::new(),
            next_sequence: 0,
            flush_generation: 0,
        }
    }

    fn allocate_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }
}

/// Plan queue owned by the leader for one term.
///
/// Every mutation goes through one mutex, which is never held across an
/// `.await`. Blocked dequeuers park on a [`Notify`]:
/// - `enqueue` wakes one of them,
/// - disabling wakes all of them.
pub struct PlanQueue {
    state: Mutex<PlanQueueState>,
    notify: Notify,
}

impl PlanQueue {
    /// A disabled, empty queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PlanQueueState::new()),
            notify: Notify::new(),
        }
    }

    // every critical section leaves the state consistent, so a poisoned lock is still usable
    fn lock(&self) -> MutexGuard<'_, PlanQueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the queue currently accepts submissions.
    pub fn enabled(&self) -> bool {
        self.lock().enabled
    }

    /// Open or close the gate.
    ///
    /// Closing an open queue flushes it: the backlog is emptied in the same
    /// critical section that clears the gate, every blocked dequeuer is woken,
    /// and each flushed future resolves with [`PlanQueueError::Flushed`].
    pub fn set_enabled(&self, enabled: bool) {
        let flushed = {
            let mut state = self.lock();
            let was_enabled = std::mem::replace(&mut state.enabled, enabled);
            match (was_enabled, enabled) {
                (true, false) => {}
                (false, true) => {
                    info!("plan queue enabled");
                    return;
                }
                _ => return,
            }
            state.flush_generation += 1;
            std::mem::take(&mut state.backlog)
        };

        self.notify.notify_waiters();

        info!(flushed = flushed.len(), "plan queue disabled");
        for queued in flushed {
            queued.promise.fulfill(Err(PlanQueueError::Flushed));
        }
    }

    /// Submit a plan. Never blocks.
    ///
    /// Returns [`PlanQueueError::NotEnabled`] when the queue is closed; no
    /// future is created in that case.
    pub fn enqueue(&self, plan: Plan) -> Result<PlanFuture, PlanQueueError> {
        let future = {
            let mut state = self.lock();
            if !state.enabled {
                return Err(PlanQueueError::NotEnabled);
            }
            let sequence = state.allocate_sequence();
            debug!(
                sequence,
                priority = plan.priority,
                eval_id = %plan.eval_id,
                "plan enqueued"
            );
            let (promise, future) = plan_future();
            state.backlog.push(QueuedPlan {
                plan,
                sequence,
                enqueued_at: Utc::now(),
                promise,
            });
            future
        };

        self.notify.notify_one();
        Ok(future)
    }

    /// Take the most urgent plan, waiting up to `timeout` for one to arrive.
    ///
    /// Returns `None` when the timeout elapses or when the queue is disabled
    /// while waiting. Cancel-safe: a plan is only removed from the backlog in
    /// the same poll that returns it. A timeout too large to form a deadline
    /// waits without one.
    pub async fn dequeue(&self, timeout: Duration) -> Option<PendingPlan> {
        let deadline = Instant::now().checked_add(timeout);
        let mut generation = None;

        loop {
            // register interest before looking at the backlog so no wakeup slips in between
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(queued) = state.backlog.pop() {
                    debug!(
                        sequence = queued.sequence,
                        priority = queued.plan.priority,
                        "plan dequeued"
                    );
                    return Some(queued.into_pending());
                }
                let started = *generation.get_or_insert(state.flush_generation);
                if state.flush_generation != started {
                    return None;
                }
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return None;
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Lock-consistent snapshot of the backlog size.
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            depth: self.lock().backlog.len(),
        }
    }
}

impl Default for PlanQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use rstest::rstest;

    use super::*;
    use crate::domain::{EvalId, PlanResult};

    fn mock_plan() -> Plan {
        Plan::new(EvalId::generate(), 50, 1000)
    }

    fn enabled_queue() -> PlanQueue {
        let queue = PlanQueue::new();
        queue.set_enabled(true);
        queue
    }

    #[tokio::test]
    async fn enqueue_dequeue_respond_round_trip() {
        let queue = enabled_queue();
        let plan = mock_plan();
        let before = Utc::now();
        let future = queue.enqueue(plan.clone()).unwrap();
        let after = Utc::now();
        assert_eq!(queue.stats().depth, 1);

        let waiter = tokio::spawn({
            let future = future.clone();
            async move { future.wait().await }
        });

        let pending = queue.dequeue(Duration::from_secs(1)).await.unwrap();
        assert_eq!(queue.stats().depth, 0);
        assert_eq!(pending.plan(), &plan);
        assert!(before <= pending.enqueued_at() && pending.enqueued_at() <= after);

        let result = Arc::new(PlanResult::new(1));
        pending.respond(Ok(Arc::clone(&result)));

        let got = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("timeout")
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&got, &result));
    }

    #[tokio::test]
    async fn disable_flushes_pending_plans() {
        let queue = enabled_queue();
        let future = queue.enqueue(mock_plan()).unwrap();

        queue.set_enabled(false);

        assert_eq!(queue.stats().depth, 0);
        assert!(!queue.enabled());
        assert_eq!(future.wait().await.unwrap_err(), PlanQueueError::Flushed);
    }

    #[test]
    fn fresh_queue_rejects_enqueue() {
        let queue = PlanQueue::new();
        let err = queue.enqueue(mock_plan()).unwrap_err();
        assert_eq!(err, PlanQueueError::NotEnabled);
        assert_eq!(queue.stats(), QueueStats { depth: 0 });
    }

    #[test]
    fn disabled_again_rejects_enqueue() {
        let queue = enabled_queue();
        queue.set_enabled(false);
        assert_eq!(
            queue.enqueue(mock_plan()).unwrap_err(),
            PlanQueueError::NotEnabled
        );
    }

    #[tokio::test]
    async fn dequeue_times_out_with_none() {
        let queue = enabled_queue();
        let timeout = Duration::from_millis(5);

        let start = std::time::Instant::now();
        let out = queue.dequeue(timeout).await;
        let elapsed = start.elapsed();

        assert!(out.is_none());
        assert!(elapsed >= timeout, "returned after {elapsed:?}");
    }

    #[tokio::test]
    async fn enqueue_wakes_blocked_dequeue() {
        let queue = Arc::new(enabled_queue());
        let consumer = tokio::spawn({
            let queue = Arc::clone(&queue);
            async move {
                let start = std::time::Instant::now();
                let pending = queue.dequeue(Duration::from_secs(5)).await;
                (pending, start.elapsed())
            }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        let _future = queue.enqueue(mock_plan()).unwrap();

        let (pending, elapsed) = consumer.await.unwrap();
        assert!(pending.is_some());
        assert!(elapsed < Duration::from_secs(2), "woke after {elapsed:?}");
    }

    #[tokio::test]
    async fn unbounded_timeout_returns_ready_plan() {
        let queue = enabled_queue();
        let plan = mock_plan();
        queue.enqueue(plan.clone()).unwrap();

        let pending = tokio::time::timeout(Duration::from_secs(1), queue.dequeue(Duration::MAX))
            .await
            .expect("ready plan should be returned immediately")
            .unwrap();
        assert_eq!(pending.plan(), &plan);
    }

    #[tokio::test]
    async fn unbounded_timeout_is_woken_by_enqueue_and_disable() {
        let queue = Arc::new(enabled_queue());

        let consumer = tokio::spawn({
            let queue = Arc::clone(&queue);
            async move { queue.dequeue(Duration::MAX).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.enqueue(mock_plan()).unwrap();
        let woken = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("enqueue should wake the dequeue")
            .unwrap();
        assert!(woken.is_some());

        let consumer = tokio::spawn({
            let queue = Arc::clone(&queue);
            async move { queue.dequeue(Duration::MAX).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.set_enabled(false);
        let out = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("disable should wake the dequeue")
            .unwrap();
        assert!(out.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn disable_wakes_every_blocked_dequeue() {
        let queue = Arc::new(enabled_queue());
        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move { queue.dequeue(Duration::from_secs(10)).await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(50)).await;
        queue.set_enabled(false);

        for consumer in consumers {
            let out = tokio::time::timeout(Duration::from_secs(2), consumer)
                .await
                .expect("dequeue should wake on disable")
                .unwrap();
            assert!(out.is_none());
        }
    }

    #[rstest]
    #[case(vec![10, 30, 20], vec![30, 20, 10])]
    #[case(vec![1, 2, 3, 4], vec![4, 3, 2, 1])]
    #[case(vec![100, -5, 0, 50], vec![100, 50, 0, -5])]
    #[tokio::test]
    async fn dequeue_prefers_higher_priority(#[case] input: Vec<i32>, #[case] expected: Vec<i32>) {
        let queue = enabled_queue();
        for priority in input {
            let mut plan = mock_plan();
            plan.priority = priority;
            queue.enqueue(plan).unwrap();
        }

        let mut order = Vec::new();
        while let Some(pending) = queue.dequeue(Duration::from_millis(10)).await {
            order.push(pending.plan().priority);
        }
        assert_eq!(order, expected);
    }

    #[tokio::test]
    async fn equal_priority_is_fifo() {
        let queue = enabled_queue();
        for i in 0..100u64 {
            let mut plan = mock_plan();
            plan.eval_create_index = i;
            queue.enqueue(plan).unwrap();
        }

        for i in 0..100u64 {
            let pending = queue.dequeue(Duration::from_secs(1)).await.unwrap();
            assert_eq!(pending.plan().eval_create_index, i);
            assert_eq!(pending.sequence(), i);
        }
    }

    #[tokio::test]
    async fn depth_tracks_enqueue_and_dequeue() {
        let queue = enabled_queue();
        for expected in 1..=5 {
            queue.enqueue(mock_plan()).unwrap();
            assert_eq!(queue.stats().depth, expected);
        }
        for expected in (0..5).rev() {
            queue.dequeue(Duration::from_secs(1)).await.unwrap();
            assert_eq!(queue.stats().depth, expected);
        }
    }

    #[tokio::test]
    async fn reenabled_queue_starts_empty() {
        let queue = enabled_queue();
        queue.enqueue(mock_plan()).unwrap();
        queue.set_enabled(false);
        queue.set_enabled(true);

        assert_eq!(queue.stats().depth, 0);
        assert!(queue.dequeue(Duration::from_millis(5)).await.is_none());
        assert!(queue.enqueue(mock_plan()).is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_producers_are_totally_ordered() {
        let queue = Arc::new(enabled_queue());
        let producers: Vec<_> = (0..8)
            .map(|worker| {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move {
                    for i in 0..25u64 {
                        let mut plan = mock_plan();
                        plan.priority = ((worker + i) % 3) as i32;
                        plan.eval_create_index = worker * 100 + i;
                        queue.enqueue(plan).unwrap();
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.await.unwrap();
        }
        assert_eq!(queue.stats().depth, 200);

        let mut drained = Vec::new();
        while let Some(pending) = queue.dequeue(Duration::from_millis(10)).await {
            drained.push((pending.plan().priority, pending.sequence()));
        }

        assert_eq!(drained.len(), 200);
        for pair in drained.windows(2) {
            let (p0, s0) = pair[0];
            let (p1, s1) = pair[1];
            assert!(p0 > p1 || (p0 == p1 && s0 < s1), "{:?} before {:?}", pair[0], pair[1]);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_consumers_never_share_a_plan() {
        let queue = Arc::new(enabled_queue());
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move {
                    let mut seen = Vec::new();
                    while let Some(pending) = queue.dequeue(Duration::from_millis(200)).await {
                        seen.push(pending.sequence());
                    }
                    seen
                })
            })
            .collect();

        for _ in 0..100 {
            queue.enqueue(mock_plan()).unwrap();
            tokio::task::yield_now().await;
        }

        let mut all = Vec::new();
        for consumer in consumers {
            all.extend(consumer.await.unwrap());
        }
        let unique: HashSet<u64> = all.iter().copied().collect();
        assert_eq!(all.len(), 100);
        assert_eq!(unique.len(), 100);
    }

    #[tokio::test]
    async fn respond_does_not_need_the_queue() {
        let queue = enabled_queue();
        let future = queue.enqueue(mock_plan()).unwrap();
        let pending = queue.dequeue(Duration::from_secs(1)).await.unwrap();

        // hold the queue lock while responding
        let guard = queue.lock();
        pending.respond(Err(PlanQueueError::Apply("rejected".into())));
        drop(guard);

        assert_eq!(
            future.wait().await.unwrap_err(),
            PlanQueueError::Apply("rejected".into())
        );
    }
}
