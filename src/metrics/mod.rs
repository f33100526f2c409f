//! Metrics collection module
//!
//! Tracks provider performance, error rates, retries and fallbacks.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Response times kept per provider
const RESPONSE_WINDOW: usize = 100;

/// Process-wide orchestration counters
pub struct Metrics {
    /// Total search_and_summarize invocations
    total_requests: AtomicU64,
    /// Summaries produced by the fallback path
    fallbacks: AtomicU64,
    /// Requests aborted by the overall deadline
    timeouts: AtomicU64,
    /// Requests aborted by caller cancellation
    cancellations: AtomicU64,
    /// Provider response times (rolling window in ms)
    response_times: RwLock<HashMap<String, Vec<u64>>>,
    /// Provider error counts
    errors: RwLock<HashMap<String, u64>>,
    /// Provider success counts
    successes: RwLock<HashMap<String, u64>>,
    /// Provider retry counts
    retries: RwLock<HashMap<String, u64>>,
}

impl Metrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            cancellations: AtomicU64::new(0),
            response_times: RwLock::new(HashMap::new()),
            errors: RwLock::new(HashMap::new()),
            successes: RwLock::new(HashMap::new()),
            retries: RwLock::new(HashMap::new()),
        }
    }

    pub fn inc_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cancellation(&self) {
        self.cancellations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one provider call
    pub fn record_call(&self, provider: &str, elapsed: Duration, success: bool) {
        {
            let mut times = write(&self.response_times);
            let entry = times.entry(provider.to_string()).or_default();
            if entry.len() >= RESPONSE_WINDOW {
                entry.remove(0);
            }
            entry.push(elapsed.as_millis() as u64);
        }

        let counters = if success { &self.successes } else { &self.errors };
        *write(counters).entry(provider.to_string()).or_insert(0) += 1;
    }

    /// Record a retry of a provider call
    pub fn record_retry(&self, provider: &str) {
        *write(&self.retries).entry(provider.to_string()).or_insert(0) += 1;
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn fallbacks(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    /// Get average response time for a provider
    pub fn avg_response_time(&self, provider: &str) -> Option<u64> {
        let times = read(&self.response_times);
        times.get(provider).and_then(|t| {
            if t.is_empty() {
                None
            } else {
                Some(t.iter().sum::<u64>() / t.len() as u64)
            }
        })
    }

    /// Get reliability percentage for a provider
    pub fn reliability(&self, provider: &str) -> f64 {
        let error_count = *read(&self.errors).get(provider).unwrap_or(&0);
        let success_count = *read(&self.successes).get(provider).unwrap_or(&0);

        let total = error_count + success_count;
        if total == 0 {
            100.0
        } else {
            (success_count as f64 / total as f64) * 100.0
        }
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        let providers: Vec<String> = read(&self.response_times).keys().cloned().collect();
        let calls_for = |map: &RwLock<HashMap<String, u64>>, name: &str| {
            *read(map).get(name).unwrap_or(&0)
        };

        let providers = providers
            .into_iter()
            .map(|name| {
                let stats = ProviderStats {
                    successes: calls_for(&self.successes, &name),
                    errors: calls_for(&self.errors, &name),
                    retries: calls_for(&self.retries, &name),
                    avg_response_time_ms: self.avg_response_time(&name),
                    reliability: self.reliability(&name),
                };
                (name, stats)
            })
            .collect();

        MetricsSnapshot {
            total_requests: self.total_requests(),
            fallbacks: self.fallbacks(),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
            providers,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Statistics for a single provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStats {
    pub successes: u64,
    pub errors: u64,
    pub retries: u64,
    pub avg_response_time_ms: Option<u64>,
    pub reliability: f64,
}

/// Serializable view served by /stats
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub fallbacks: u64,
    pub timeouts: u64,
    pub cancellations: u64,
    pub providers: HashMap<String, ProviderStats>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics() {
        let metrics = Metrics::new();

        metrics.inc_request();
        metrics.record_call("tavily", Duration::from_millis(100), true);
        metrics.record_call("tavily", Duration::from_millis(300), false);
        metrics.record_retry("tavily");
        metrics.inc_fallback();

        assert_eq!(metrics.total_requests(), 1);
        assert_eq!(metrics.avg_response_time("tavily"), Some(200));
        assert_eq!(metrics.reliability("tavily"), 50.0);
        assert_eq!(metrics.reliability("openai"), 100.0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.fallbacks, 1);
        assert_eq!(snapshot.providers["tavily"].retries, 1);
        assert_eq!(snapshot.providers["tavily"].errors, 1);
    }

    #[test]
    fn test_response_window_is_bounded() {
        let metrics = Metrics::new();
        for _ in 0..(RESPONSE_WINDOW + 10) {
            metrics.record_call("openai", Duration::from_millis(10), true);
        }
        assert_eq!(read(&metrics.response_times)["openai"].len(), RESPONSE_WINDOW);
    }
}
