//! Matcher Background Task
//!
//! Runs [`AutonomyMatcher::run_once`] on a fixed interval until shutdown is
//! signalled through a watch channel. Missed ticks are skipped rather than
//! replayed, so a slow pass never causes a burst of catch-up passes.

use crate::matcher::AutonomyMatcher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

// ============================================================================
// METRICS
// ============================================================================

/// Counters accumulated over the task's lifetime.
#[derive(Debug, Default)]
pub struct MatcherMetrics {
    /// Passes that ran to completion
    pub passes: AtomicU64,

    /// Quests handed to agents
    pub matches_made: AtomicU64,

    /// Individual pairs that failed to claim
    pub match_errors: AtomicU64,

    /// Claims reopened by lease expiry
    pub claims_recovered: AtomicU64,

    /// Passes that failed outright (store unavailable)
    pub pass_failures: AtomicU64,
}

impl MatcherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MatcherSnapshot {
        MatcherSnapshot {
            passes: self.passes.load(Ordering::Relaxed),
            matches_made: self.matches_made.load(Ordering::Relaxed),
            match_errors: self.match_errors.load(Ordering::Relaxed),
            claims_recovered: self.claims_recovered.load(Ordering::Relaxed),
            pass_failures: self.pass_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`MatcherMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatcherSnapshot {
    pub passes: u64,
    pub matches_made: u64,
    pub match_errors: u64,
    pub claims_recovered: u64,
    pub pass_failures: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Periodically run the matcher until `shutdown_rx` observes `true`.
///
/// # Example
///
/// ```ignore
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// let handle = tokio::spawn(matcher_task(matcher, config.matcher_interval, shutdown_rx));
///
/// // Later
/// let _ = shutdown_tx.send(true);
/// let metrics = handle.await?;
/// ```
pub async fn matcher_task(
    matcher: Arc<AutonomyMatcher>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<MatcherMetrics> {
    let metrics = Arc::new(MatcherMetrics::new());

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(interval_ms = period.as_millis() as u64, "Matcher task started");

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                // A dropped sender can never signal again.
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::info!("Matcher task shutting down");
                    break;
                }
            }

            _ = ticker.tick() => {
                run_pass(&matcher, &metrics);
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        passes = snapshot.passes,
        matches_made = snapshot.matches_made,
        match_errors = snapshot.match_errors,
        pass_failures = snapshot.pass_failures,
        "Matcher task completed"
    );

    metrics
}

fn run_pass(matcher: &AutonomyMatcher, metrics: &MatcherMetrics) {
    match matcher.run_once() {
        Ok(report) => {
            metrics.passes.fetch_add(1, Ordering::Relaxed);
            metrics
                .matches_made
                .fetch_add(report.matches_made as u64, Ordering::Relaxed);
            metrics
                .match_errors
                .fetch_add(report.errors.len() as u64, Ordering::Relaxed);
            metrics
                .claims_recovered
                .fetch_add(report.claims_recovered as u64, Ordering::Relaxed);
        }
        Err(e) => {
            tracing::error!(error = %e, "Matcher pass failed");
            metrics.pass_failures.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest_board::QuestBoard;
    use crate::registry::{AgentRegistry, NewAgent};
    use crate::sinks::NoopWakeNotifier;
    use crate::test_support::MemoryLedger;
    use swarm_core::{QuestSpec, SwarmConfig};
    use swarm_storage::{InMemoryStore, SwarmStore};

    fn matcher_with_work() -> (Arc<AutonomyMatcher>, QuestBoard) {
        let store: Arc<dyn SwarmStore> = Arc::new(InMemoryStore::new());
        let config = Arc::new(SwarmConfig::default());
        let quests = QuestBoard::new(
            Arc::clone(&store),
            Arc::clone(&config),
            Arc::new(MemoryLedger::default()),
        );
        AgentRegistry::new(Arc::clone(&store))
            .register(NewAgent::new("worker", "Worker"))
            .unwrap();
        quests
            .create(QuestSpec::new("Triage issues", "Label every open issue by area.", 10))
            .unwrap();
        let matcher = AutonomyMatcher::new(store, config, quests.clone(), Arc::new(NoopWakeNotifier));
        (Arc::new(matcher), quests)
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_runs_until_shutdown() {
        let (matcher, _quests) = matcher_with_work();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(matcher_task(matcher, Duration::from_secs(60), shutdown_rx));

        tokio::time::sleep(Duration::from_secs(150)).await;
        shutdown_tx.send(true).unwrap();
        let metrics = handle.await.unwrap().snapshot();

        assert!(metrics.passes >= 2);
        assert_eq!(metrics.matches_made, 1);
        assert_eq!(metrics.pass_failures, 0);
    }

    #[test]
    fn test_snapshot_reads_counters() {
        let metrics = MatcherMetrics::new();
        metrics.passes.fetch_add(3, Ordering::Relaxed);
        metrics.matches_made.fetch_add(2, Ordering::Relaxed);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.passes, 3);
        assert_eq!(snapshot.matches_made, 2);
        assert_eq!(snapshot.pass_failures, 0);
    }
}
