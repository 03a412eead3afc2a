use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use planq_core::config::count_or;
use planq_core::impls::InMemoryCommitter;
use planq_core::{
    ConfigError, EvalId, JobId, LeaderTerm, Plan, PlanQueue, PlanQueueConfig, PlanQueueError,
};
use rand::Rng;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Per-worker outcome counts.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    applied: u64,
    rejected: u64,
    flushed: u64,
    not_enabled: u64,
}

impl Tally {
    fn record(&mut self, outcome: &Result<(), PlanQueueError>) {
        match outcome {
            Ok(()) => self.applied += 1,
            Err(PlanQueueError::Flushed) => self.flushed += 1,
            Err(PlanQueueError::NotEnabled) => self.not_enabled += 1,
            Err(_) => self.rejected += 1,
        }
    }

    fn merge(&mut self, other: Tally) {
        self.applied += other.applied;
        self.rejected += other.rejected;
        self.flushed += other.flushed;
        self.not_enabled += other.not_enabled;
    }
}

const WORKERS_VAR: &str = "PLANQ_WORKERS";
const PLANS_PER_WORKER_VAR: &str = "PLANQ_PLANS_PER_WORKER";

/// Demo load shape, validated the same way as the queue settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DemoSettings {
    workers: usize,
    plans_per_worker: usize,
}

impl DemoSettings {
    fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            workers: count_or(&lookup, WORKERS_VAR, 4)?,
            plans_per_worker: count_or(&lookup, PLANS_PER_WORKER_VAR, 25)?,
        })
    }
}

fn random_plan(eval_create_index: u64) -> Plan {
    let priority = rand::thread_rng().gen_range(1..=100);
    Plan::new(EvalId::generate(), priority, eval_create_index)
        .with_job(JobId::generate())
        .with_payload(json!({ "allocs": priority % 7 + 1 }))
}

/// scheduling worker: plan を投入して結果を待つ
async fn scheduling_worker(worker_id: usize, queue: Arc<PlanQueue>, plans: usize) -> Tally {
    let mut tally = Tally::default();
    for i in 0..plans {
        let plan = random_plan((worker_id * plans + i) as u64);
        let outcome = match queue.enqueue(plan) {
            Ok(future) => future.wait().await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = &outcome {
            warn!(worker_id, error = %e, "plan not applied");
        }
        tally.record(&outcome);
    }
    tally
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = PlanQueueConfig::from_env()?;
    let DemoSettings {
        workers,
        plans_per_worker,
    } = DemoSettings::from_env()?;

    // RUST_LOG を優先、なければ PLANQ_LOG_LEVEL
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(?config, workers, plans_per_worker, "starting plan queue demo");

    // (A) commit log と leader term を用意（priority 5 未満は reject される）
    let committer = Arc::new(
        InMemoryCommitter::new(1)
            .reject_below(5)
            .with_latency(Duration::from_millis(2)),
    );
    let term = LeaderTerm::establish(1, &config, committer.clone());

    // (B) scheduling worker を起動して plan を投入
    let handles: Vec<_> = (0..workers)
        .map(|worker_id| tokio::spawn(scheduling_worker(worker_id, term.queue(), plans_per_worker)))
        .collect();

    let mut total = Tally::default();
    for handle in handles {
        total.merge(handle.await.context("scheduling worker panicked")?);
    }

    // (C) 最後の一括投入の直後に leader を降りる → 残りは flush される
    let queue = term.queue();
    let trailing: Vec<_> = (0..10)
        .filter_map(|i| queue.enqueue(random_plan(u64::MAX - i)).ok())
        .collect();
    let answered = term.revoke().await;

    for future in trailing {
        total.record(&future.wait().await.map(|_| ()));
    }
    // disable 後の投入は拒否される
    total.record(&queue.enqueue(random_plan(0)).map(|_| ()));

    let head: Vec<i32> = committer
        .committed()
        .iter()
        .take(10)
        .map(|plan| plan.priority)
        .collect();

    info!(
        answered,
        applied = total.applied,
        rejected = total.rejected,
        flushed = total.flushed,
        not_enabled = total.not_enabled,
        ?head,
        "plan queue demo finished"
    );
    println!(
        "applied={} rejected={} flushed={} not_enabled={} commit_order_head={:?}",
        total.applied, total.rejected, total.flushed, total.not_enabled, head
    );

    Ok(())
}
