//! Metrics collection for the pipeline and the resource cache.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Metrics collector interface.
pub trait MetricsCollector: Send + Sync {
    /// Records a finished request.
    fn record_request(&self, success: bool, duration: Duration);

    /// Records a request that timed out.
    fn record_timeout(&self);

    /// Records an error settled by an error interceptor.
    fn record_recovery(&self);

    /// Records an error by name.
    fn record_error(&self, name: &str);

    /// Records a resource cache hit.
    fn record_cache_hit(&self);

    /// Records a resource cache miss.
    fn record_cache_miss(&self);

    /// Gets current metrics.
    fn get_metrics(&self) -> PipelineMetrics;

    /// Resets all metrics.
    fn reset(&self);
}

/// Metrics snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineMetrics {
    /// Total requests.
    pub total_requests: u64,
    /// Requests that settled successfully (including recoveries).
    pub successful_requests: u64,
    /// Requests that settled with an error.
    pub failed_requests: u64,
    /// Requests that timed out.
    pub timeouts: u64,
    /// Errors recovered by an error interceptor.
    pub recoveries: u64,
    /// Total latency in milliseconds.
    pub total_latency_ms: u64,
    /// Resource cache hits.
    pub cache_hits: u64,
    /// Resource cache misses.
    pub cache_misses: u64,
    /// Error counts by name.
    pub errors: HashMap<String, u64>,
}

impl PipelineMetrics {
    /// Calculates average latency in milliseconds.
    pub fn average_latency_ms(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.total_latency_ms as f64 / self.total_requests as f64
        }
    }

    /// Calculates the cache hit ratio in `[0, 1]`.
    pub fn cache_hit_ratio(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64
        }
    }
}

/// Default metrics collector implementation.
#[derive(Debug, Default)]
pub struct DefaultMetricsCollector {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    timeouts: AtomicU64,
    recoveries: AtomicU64,
    total_latency_ms: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    errors: RwLock<HashMap<String, u64>>,
}

impl DefaultMetricsCollector {
    /// Creates a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsCollector for DefaultMetricsCollector {
    fn record_request(&self, success: bool, duration: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
        self.total_latency_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_recovery(&self) {
        self.recoveries.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self, name: &str) {
        *self.errors.write().entry(name.to_string()).or_insert(0) += 1;
    }

    fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    fn get_metrics(&self) -> PipelineMetrics {
        PipelineMetrics {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            recoveries: self.recoveries.load(Ordering::Relaxed),
            total_latency_ms: self.total_latency_ms.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            errors: self.errors.read().clone(),
        }
    }

    fn reset(&self) {
        for counter in [
            &self.total_requests,
            &self.successful_requests,
            &self.failed_requests,
            &self.timeouts,
            &self.recoveries,
            &self.total_latency_ms,
            &self.cache_hits,
            &self.cache_misses,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.errors.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_requests() {
        let metrics = DefaultMetricsCollector::new();
        metrics.record_request(true, Duration::from_millis(100));
        metrics.record_request(false, Duration::from_millis(300));
        metrics.record_error("TimeoutError");
        metrics.record_error("TimeoutError");

        let snapshot = metrics.get_metrics();
        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.successful_requests, 1);
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(snapshot.average_latency_ms(), 200.0);
        assert_eq!(snapshot.errors.get("TimeoutError"), Some(&2));
    }

    #[test]
    fn test_cache_ratio_and_reset() {
        let metrics = DefaultMetricsCollector::new();
        metrics.record_cache_miss();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        assert_eq!(metrics.get_metrics().cache_hit_ratio(), 0.75);

        metrics.reset();
        assert_eq!(metrics.get_metrics(), PipelineMetrics::default());
    }
}
