//! Store metrics: query latency and ingest throughput.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;

/// Percentiles are computed over at most this many recent queries.
pub const LATENCY_WINDOW: usize = 1_024;

/// Collects runtime metrics for a [`crate::VectorStore`].
#[derive(Debug, Default)]
pub struct StoreMetrics {
    /// Most recent successful query latencies, oldest first.
    recent_latencies_us: VecDeque<f64>,
    latency_sum_us: f64,
    successful_queries: u64,
    total_queries: u64,
    failed_queries: u64,
    records_indexed: u64,
    records_failed: u64,
    refreshes: u64,
}

/// Point-in-time copy of [`StoreMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_queries: u64,
    pub failed_queries: u64,
    pub records_indexed: u64,
    pub records_failed: u64,
    pub refreshes: u64,
    pub avg_query_latency_us: f64,
    pub p95_query_latency_us: f64,
}

impl StoreMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful query with its duration.
    pub fn record_query(&mut self, duration: Duration) {
        let latency = duration.as_micros() as f64;
        self.total_queries += 1;
        self.successful_queries += 1;
        self.latency_sum_us += latency;
        if self.recent_latencies_us.len() == LATENCY_WINDOW {
            self.recent_latencies_us.pop_front();
        }
        self.recent_latencies_us.push_back(latency);
    }

    pub fn record_failed_query(&mut self) {
        self.total_queries += 1;
        self.failed_queries += 1;
    }

    /// Record the outcome of one ingest batch.
    pub fn record_ingest(&mut self, indexed: usize, failed: usize) {
        self.records_indexed += indexed as u64;
        self.records_failed += failed as u64;
    }

    pub fn record_refresh(&mut self) {
        self.refreshes += 1;
    }

    pub fn total_queries(&self) -> u64 {
        self.total_queries
    }

    pub fn records_indexed(&self) -> u64 {
        self.records_indexed
    }

    pub fn records_failed(&self) -> u64 {
        self.records_failed
    }

    /// Average latency of all successful queries in microseconds.
    pub fn avg_query_latency_us(&self) -> f64 {
        if self.successful_queries == 0 {
            return 0.0;
        }
        self.latency_sum_us / self.successful_queries as f64
    }

    /// Percentile of recent query latency (e.g., 50.0, 95.0, 99.0) over the
    /// last [`LATENCY_WINDOW`] successful queries.
    pub fn percentile_query_latency_us(&self, percentile: f64) -> f64 {
        if self.recent_latencies_us.is_empty() {
            return 0.0;
        }

        let mut sorted: Vec<f64> = self.recent_latencies_us.iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let index = ((percentile / 100.0) * (sorted.len() - 1) as f64).round() as usize;
        sorted[index.min(sorted.len() - 1)]
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_queries: self.total_queries,
            failed_queries: self.failed_queries,
            records_indexed: self.records_indexed,
            records_failed: self.records_failed,
            refreshes: self.refreshes,
            avg_query_latency_us: self.avg_query_latency_us(),
            p95_query_latency_us: self.percentile_query_latency_us(95.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_counters() {
        let mut m = StoreMetrics::new();
        m.record_ingest(6, 1);
        m.record_ingest(1, 0);

        assert_eq!(m.records_indexed(), 7);
        assert_eq!(m.records_failed(), 1);
        assert_eq!(m.total_queries(), 0);
    }

    #[test]
    fn test_query_latency() {
        let mut m = StoreMetrics::new();
        m.record_query(Duration::from_micros(100));
        m.record_query(Duration::from_micros(200));
        m.record_query(Duration::from_micros(300));
        m.record_failed_query();

        let snap = m.snapshot();
        assert_eq!(snap.total_queries, 4);
        assert_eq!(snap.failed_queries, 1);
        assert!((snap.avg_query_latency_us - 200.0).abs() < 1.0);
        assert!((m.percentile_query_latency_us(50.0) - 200.0).abs() < 1.0);
    }

    #[test]
    fn test_latency_history_is_bounded() {
        let mut m = StoreMetrics::new();
        for _ in 0..LATENCY_WINDOW {
            m.record_query(Duration::from_micros(10_000));
        }
        for _ in 0..LATENCY_WINDOW {
            m.record_query(Duration::from_micros(10));
        }

        assert_eq!(m.recent_latencies_us.len(), LATENCY_WINDOW);
        // The slow queries aged out of the window but still count in the average.
        assert!((m.percentile_query_latency_us(99.0) - 10.0).abs() < 1.0);
        assert!((m.avg_query_latency_us() - 5_005.0).abs() < 1.0);
        assert_eq!(m.total_queries(), 2 * LATENCY_WINDOW as u64);
    }

    #[test]
    fn test_empty_metrics() {
        let m = StoreMetrics::new();
        assert_eq!(m.avg_query_latency_us(), 0.0);
        assert_eq!(m.percentile_query_latency_us(99.0), 0.0);
        assert_eq!(m.snapshot().refreshes, 0);
    }
}
