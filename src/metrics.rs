// Performance metrics module
//
// Provides lightweight counters for monitoring the proxy

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Proxy-wide counters
///
/// Uses atomic operations for thread-safe tracking without locks. Shared between the
/// RPC server, connection tasks and the native callback loop; logged on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// TCP connections accepted
    pub connections_accepted: AtomicU64,

    /// Connections that ended with an error (framing, I/O)
    pub connection_errors: AtomicU64,

    /// RPC requests answered with a result
    pub requests_served: AtomicU64,

    /// RPC requests answered with an error
    pub requests_failed: AtomicU64,

    /// Native completions routed by the callback loop
    pub completions_dispatched: AtomicU64,

    /// Proxy start time
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            connections_accepted: AtomicU64::new(0),
            connection_errors: AtomicU64::new(0),
            requests_served: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            completions_dispatched: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_connection_accepted(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request_served(&self) {
        self.requests_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completion_dispatched(&self) {
        self.completions_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_served(&self) -> u64 {
        self.requests_served.load(Ordering::Relaxed)
    }

    pub fn requests_failed(&self) -> u64 {
        self.requests_failed.load(Ordering::Relaxed)
    }

    pub fn completions_dispatched(&self) -> u64 {
        self.completions_dispatched.load(Ordering::Relaxed)
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Fraction of requests that failed, 0.0 when none were handled
    pub fn failure_rate(&self) -> f64 {
        let failed = self.requests_failed();
        let total = self.requests_served() + failed;
        if total > 0 {
            failed as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Proxy Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Connections: {} accepted, {} errors",
            self.connections_accepted.load(Ordering::Relaxed),
            self.connection_errors.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Requests: {} served, {} failed ({:.1}% failure rate)",
            self.requests_served(),
            self.requests_failed(),
            self.failure_rate() * 100.0
        );
        tracing::info!(
            "Native completions dispatched: {}",
            self.completions_dispatched()
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
