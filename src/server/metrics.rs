//! Server metrics collection.
//!
//! Aggregate counters only; nothing identifies a client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Server metrics collector.
pub struct ServerMetrics {
    /// Server start time
    start_time: Instant,
    /// Successful key exchanges
    key_exchanges: AtomicU64,
    /// Encrypted configs handed out
    configs_served: AtomicU64,
    /// Download probes answered
    downloads: AtomicU64,
    /// Upload probes answered
    uploads: AtomicU64,
    /// Log entries recorded from client reports
    report_entries: AtomicU64,
    /// Requests answered with 404 for a missing or malformed identity
    unidentified: AtomicU64,
    /// Requests answered with 400
    bad_requests: AtomicU64,
}

impl ServerMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            key_exchanges: AtomicU64::new(0),
            configs_served: AtomicU64::new(0),
            downloads: AtomicU64::new(0),
            uploads: AtomicU64::new(0),
            report_entries: AtomicU64::new(0),
            unidentified: AtomicU64::new(0),
            bad_requests: AtomicU64::new(0),
        }
    }

    /// Increment key exchange count.
    pub fn increment_key_exchanges(&self) {
        self.key_exchanges.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment served config count.
    pub fn increment_configs_served(&self) {
        self.configs_served.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment download probe count.
    pub fn increment_downloads(&self) {
        self.downloads.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment upload probe count.
    pub fn increment_uploads(&self) {
        self.uploads.fetch_add(1, Ordering::Relaxed);
    }

    /// Add recorded report entries.
    pub fn add_report_entries(&self, entries: u64) {
        self.report_entries.fetch_add(entries, Ordering::Relaxed);
    }

    /// Increment unidentified request count.
    pub fn increment_unidentified(&self) {
        self.unidentified.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment bad request count.
    pub fn increment_bad_requests(&self) {
        self.bad_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            key_exchanges: self.key_exchanges.load(Ordering::Relaxed),
            configs_served: self.configs_served.load(Ordering::Relaxed),
            downloads: self.downloads.load(Ordering::Relaxed),
            uploads: self.uploads.load(Ordering::Relaxed),
            report_entries: self.report_entries.load(Ordering::Relaxed),
            unidentified: self.unidentified.load(Ordering::Relaxed),
            bad_requests: self.bad_requests.load(Ordering::Relaxed),
        }
    }

    /// Format metrics as a simple text report.
    pub fn format_report(&self) -> String {
        let s = self.snapshot();

        format!(
            r#"Mauerspecht Server Metrics
==========================
Uptime: {} seconds

Protocol:
  Key exchanges:  {}
  Configs served: {}
  Downloads:      {}
  Uploads:        {}
  Report entries: {}

Rejected:
  Unidentified:   {}
  Bad requests:   {}
"#,
            s.uptime_secs,
            s.key_exchanges,
            s.configs_served,
            s.downloads,
            s.uploads,
            s.report_entries,
            s.unidentified,
            s.bad_requests,
        )
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of all metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Seconds since the server started
    pub uptime_secs: u64,
    /// Successful key exchanges
    pub key_exchanges: u64,
    /// Encrypted configs handed out
    pub configs_served: u64,
    /// Download probes answered
    pub downloads: u64,
    /// Upload probes answered
    pub uploads: u64,
    /// Log entries recorded from client reports
    pub report_entries: u64,
    /// Requests rejected for a missing or malformed identity
    pub unidentified: u64,
    /// Requests answered with 400
    pub bad_requests: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let s = ServerMetrics::new().snapshot();
        assert_eq!(s.key_exchanges, 0);
        assert_eq!(s.downloads, 0);
        assert_eq!(s.bad_requests, 0);
    }

    #[test]
    fn test_counting() {
        let metrics = ServerMetrics::new();

        metrics.increment_key_exchanges();
        metrics.increment_uploads();
        metrics.increment_uploads();
        metrics.add_report_entries(15);
        metrics.increment_unidentified();

        let s = metrics.snapshot();
        assert_eq!(s.key_exchanges, 1);
        assert_eq!(s.uploads, 2);
        assert_eq!(s.report_entries, 15);
        assert_eq!(s.unidentified, 1);
    }

    #[test]
    fn test_format_report() {
        let metrics = ServerMetrics::new();
        metrics.increment_downloads();

        let report = metrics.format_report();
        assert!(report.contains("Mauerspecht Server Metrics"));
        assert!(report.contains("Downloads:      1"));
    }
}
