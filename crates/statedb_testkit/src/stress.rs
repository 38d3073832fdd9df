//! Actor-style stress runs.
//!
//! Each actor is a tokio task that owns one role, mutates it on some ticks
//! and calls `update` on every tick, the way an actor runtime persists its
//! state. The run reports how many updates wrote and how many were skipped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use statedb_core::{StateStore, UpdateOutcome};

use crate::states::RoleState;

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total update calls.
    pub total_ops: usize,
    /// Updates that wrote.
    pub saved_ops: usize,
    /// Updates skipped as clean.
    pub skipped_ops: usize,
    /// Failed calls.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(saved: usize, skipped: usize, failed: usize, duration: Duration) -> Self {
        let total = saved + skipped + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            saved_ops: saved,
            skipped_ops: skipped,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total updates: {}", self.total_ops);
        println!("Saved: {}", self.saved_ops);
        println!("Skipped: {}", self.skipped_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of concurrent actors, one role each.
    pub actors: usize,
    /// Update calls per actor.
    pub ticks: usize,
    /// An actor mutates its role on every `mutate_every`-th tick.
    pub mutate_every: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            actors: 8,
            ticks: 200,
            mutate_every: 4,
        }
    }
}

impl StressConfig {
    /// Updates each actor is expected to write: the initial add is separate,
    /// so only mutating ticks count.
    pub fn expected_saves_per_actor(&self) -> usize {
        let every = self.mutate_every.max(1);
        self.ticks.div_ceil(every)
    }
}

/// Runs `config.actors` concurrent actors against `store`.
///
/// Actor `n` owns role id `n + 1`. Each actor adds its role, then ticks
/// `config.ticks` times, raising the level on mutating ticks.
pub async fn stress_actor_updates(store: Arc<StateStore>, config: &StressConfig) -> StressTestResult {
    let saved = Arc::new(AtomicUsize::new(0));
    let skipped = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let every = config.mutate_every.max(1);

    let start = Instant::now();

    let handles: Vec<_> = (0..config.actors)
        .map(|n| {
            let store = Arc::clone(&store);
            let saved = Arc::clone(&saved);
            let skipped = Arc::clone(&skipped);
            let failed = Arc::clone(&failed);
            let ticks = config.ticks;

            tokio::spawn(async move {
                let id = n as i64 + 1;
                let mut role: RoleState = match store.load_state(id).await {
                    Ok(role) => role,
                    Err(_) => {
                        failed.fetch_add(ticks, Ordering::Relaxed);
                        return;
                    }
                };
                role.name = format!("actor-{id}");
                if store.add(&mut role).await.is_err() {
                    failed.fetch_add(ticks, Ordering::Relaxed);
                    return;
                }

                for tick in 0..ticks {
                    if tick % every == 0 {
                        role.level += 1;
                    }
                    match store.update(&mut role).await {
                        Ok(UpdateOutcome::Saved) => {
                            saved.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(UpdateOutcome::Unchanged) => {
                            skipped.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(UpdateOutcome::Unacknowledged) | Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.expect("Actor task panicked");
    }

    StressTestResult::new(
        saved.load(Ordering::Relaxed),
        skipped.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}
