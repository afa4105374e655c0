//! Destinations for client reports received on `/v1/log`.

use parking_lot::Mutex;

use crate::identity::ClientId;
use crate::protocol::LogEntry;

/// Append-only destination for report entries.
pub trait ReportSink: Send + Sync {
    /// Record one entry reported by `client`.
    fn record(&self, client: &ClientId, entry: &LogEntry);
}

/// Writes every entry through `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn record(&self, client: &ClientId, entry: &LogEntry) {
        tracing::info!(
            "{} {} {}",
            entry.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            client,
            entry.message
        );
    }
}

/// Keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<(ClientId, LogEntry)>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, in arrival order.
    pub fn entries(&self) -> Vec<(ClientId, LogEntry)> {
        self.entries.lock().clone()
    }

    /// Number of entries recorded so far.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl ReportSink for MemorySink {
    fn record(&self, client: &ClientId, entry: &LogEntry) {
        self.entries.lock().push((*client, entry.clone()));
    }
}
