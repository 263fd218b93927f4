//! Benchmark harness
//!
//! Sequences destination preparation, the three memory samples, the clone
//! and the settle interval. Clone and preparation failures are logged and
//! recorded but never stop the run.

use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;

use crate::clone::CloneStrategy;
use crate::prepare::prepare;
use crate::sampler::MemorySampler;
use crate::{CloneOutcome, MemorySnapshot, RunReport, SamplePoint};

/// Wait between the "after" and "final" samples
pub const SETTLE_DELAY: Duration = Duration::from_secs(10);

/// Timed suspension
#[async_trait]
pub trait Delay: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Configuration for the harness
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Remove the destination before cloning
    pub prepare: bool,
    /// Wait before the final sample
    pub settle_delay: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            prepare: true,
            settle_delay: SETTLE_DELAY,
        }
    }
}

/// Runs one measured clone
pub struct Harness<S, D> {
    config: HarnessConfig,
    sampler: S,
    strategy: Box<dyn CloneStrategy>,
    delay: D,
}

impl<S: MemorySampler, D: Delay> Harness<S, D> {
    pub fn new(
        config: HarnessConfig,
        sampler: S,
        strategy: Box<dyn CloneStrategy>,
        delay: D,
    ) -> Self {
        Self {
            config,
            sampler,
            strategy,
            delay,
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    fn sample(&mut self, point: SamplePoint, repo_url: &str) -> MemorySnapshot {
        let snapshot = self.sampler.sample();
        tracing::info!(point = ?point, repo_url = %repo_url, snapshot = %snapshot, "{}", point);
        snapshot
    }

    /// Run the full measurement sequence
    ///
    /// Always produces three snapshots, whatever happens to the clone.
    pub async fn run(&mut self, repo_url: &str, dest: &Path) -> RunReport {
        let started_at = Utc::now();
        let strategy = self.strategy.name();

        if self.config.prepare {
            if let Err(e) = prepare(dest).await {
                tracing::error!(error = %e, "Failed to prepare clone destination, continuing");
            }
        }

        let before = self.sample(SamplePoint::Before, repo_url);

        let clone_start = Instant::now();
        let result = self.strategy.clone_shallow(repo_url, dest).await;
        let clone_duration = clone_start.elapsed();

        let outcome = match result {
            Ok(()) => {
                tracing::info!(repo_url = %repo_url, strategy, "Repository cloned successfully");
                CloneOutcome::Succeeded
            }
            Err(e) => {
                tracing::error!(
                    repo_url = %repo_url,
                    strategy,
                    error = %e,
                    "Error cloning repository"
                );
                CloneOutcome::Failed {
                    message: e.to_string(),
                }
            }
        };
        tracing::info!(
            strategy,
            duration_ms = clone_duration.as_millis() as u64,
            "Clone took {:?}",
            clone_duration
        );

        let after = self.sample(SamplePoint::After, repo_url);

        tracing::debug!(delay = ?self.config.settle_delay, "Waiting for memory counters to settle");
        self.delay.sleep(self.config.settle_delay).await;

        let settled = self.sample(SamplePoint::Final, repo_url);

        RunReport {
            repo_url: repo_url.to_string(),
            destination: dest.display().to_string(),
            strategy: strategy.to_string(),
            outcome,
            clone_duration,
            started_at,
            before,
            after,
            settled,
        }
    }
}
