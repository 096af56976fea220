//! Runtime counters and latency tracking for the assessment pipeline.

use crate::types::assessment::RiskTier;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Rolling window of per-assessment latency samples.
const LATENCY_WINDOW: usize = 10_000;

/// Shared counters updated by every worker task.
///
/// Writers hold the locks only long enough to push a sample, so
/// contention stays negligible at pipeline throughput.
pub struct PipelineMetrics {
    assessed: AtomicU64,
    unexplained: AtomicU64,
    tier_counts: RwLock<[u64; 3]>,
    latencies_us: RwLock<Vec<u64>>,
    probability_buckets: RwLock<[u64; 10]>,
    started: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            assessed: AtomicU64::new(0),
            unexplained: AtomicU64::new(0),
            tier_counts: RwLock::new([0; 3]),
            latencies_us: RwLock::new(Vec::with_capacity(1024)),
            probability_buckets: RwLock::new([0; 10]),
            started: Instant::now(),
        }
    }

    /// Count one finished assessment.
    pub fn observe(&self, elapsed: Duration, probability: f64, tier: RiskTier, explained: bool) {
        self.assessed.fetch_add(1, Ordering::Relaxed);
        if !explained {
            self.unexplained.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut counts) = self.tier_counts.write() {
            counts[tier as usize] += 1;
        }

        if let Ok(mut latencies) = self.latencies_us.write() {
            latencies.push(elapsed.as_micros() as u64);
            if latencies.len() > LATENCY_WINDOW {
                let excess = latencies.len() - LATENCY_WINDOW / 2;
                latencies.drain(..excess);
            }
        }

        let bucket = ((probability * 10.0) as usize).min(9);
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Total assessments completed.
    pub fn assessed(&self) -> u64 {
        self.assessed.load(Ordering::Relaxed)
    }

    /// Assessments that shipped without an explanation.
    pub fn unexplained(&self) -> u64 {
        self.unexplained.load(Ordering::Relaxed)
    }

    /// Assessments per second since startup.
    pub fn throughput(&self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.assessed() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Latency summary over the rolling window.
    pub fn latency_stats(&self) -> LatencyStats {
        let mut sorted = self.latencies_us.read().unwrap().clone();
        sorted.sort_unstable();

        if sorted.is_empty() {
            return LatencyStats::default();
        }
        LatencyStats {
            samples: sorted.len() as u64,
            mean_us: sorted.iter().sum::<u64>() / sorted.len() as u64,
            p50_us: percentile(&sorted, 0.50),
            p95_us: percentile(&sorted, 0.95),
            p99_us: percentile(&sorted, 0.99),
        }
    }

    /// Assessment counts per risk tier, lowest first.
    pub fn tier_counts(&self) -> [(RiskTier, u64); 3] {
        let counts = self.tier_counts.read().unwrap();
        [
            (RiskTier::Low, counts[0]),
            (RiskTier::Medium, counts[1]),
            (RiskTier::High, counts[2]),
        ]
    }

    /// Probability histogram over ten equal buckets.
    pub fn probability_distribution(&self) -> [u64; 10] {
        *self.probability_buckets.read().unwrap()
    }

    /// Log everything tracked so far as structured fields.
    pub fn log_summary(&self) {
        let assessed = self.assessed();
        let latency = self.latency_stats();

        info!(
            assessed,
            unexplained = self.unexplained(),
            throughput = format!("{:.1}/s", self.throughput()),
            "Pipeline totals"
        );
        info!(
            samples = latency.samples,
            mean_us = latency.mean_us,
            p50_us = latency.p50_us,
            p95_us = latency.p95_us,
            p99_us = latency.p99_us,
            "Assessment latency"
        );
        for (tier, count) in self.tier_counts() {
            let share = if assessed > 0 {
                count as f64 * 100.0 / assessed as f64
            } else {
                0.0
            };
            info!(tier = ?tier, count, share = format!("{share:.1}%"), "Tier totals");
        }
        let distribution = self.probability_distribution();
        let total: u64 = distribution.iter().sum();
        for (bucket, &count) in distribution.iter().enumerate() {
            if count == 0 {
                continue;
            }
            info!(
                range = format!("{:.1}-{:.1}", bucket as f64 / 10.0, (bucket + 1) as f64 / 10.0),
                count,
                share = format!("{:.1}%", count as f64 * 100.0 / total as f64),
                "Probability bucket"
            );
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Nearest-rank percentile over an ascending, non-empty sample slice.
fn percentile(sorted: &[u64], q: f64) -> u64 {
    let rank = ((sorted.len() - 1) as f64 * q).round() as usize;
    sorted[rank]
}

/// Latency summary in microseconds.
#[derive(Debug, Default)]
pub struct LatencyStats {
    pub samples: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
}

/// Logs a metrics summary on a fixed period until the pipeline exits.
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    period: Duration,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, period: Duration) -> Self {
        Self { metrics, period }
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.period);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.metrics.log_summary();
        }
    }
}
