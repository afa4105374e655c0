//! Run log kept by the prober and shipped to the server at the end.

use crate::protocol::LogEntry;

/// Append-only list of timestamped messages for one run.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    entries: Vec<LogEntry>,
}

impl RunLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message stamped with the current time and echo it to tracing.
    pub fn record(&mut self, message: impl Into<String>) {
        let entry = LogEntry::now(message);
        tracing::info!("{}", entry.message);
        self.entries.push(entry);
    }

    /// Entries in the order they were recorded.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the log.
    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_preserves_order() {
        let mut log = RunLog::new();
        assert!(log.is_empty());

        log.record("first");
        log.record(String::from("second"));

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].message, "first");
        assert_eq!(log.entries()[1].message, "second");
        assert!(log.entries()[0].timestamp <= log.entries()[1].timestamp);
    }

    #[test]
    fn test_into_entries() {
        let mut log = RunLog::new();
        log.record("only");

        let entries = log.into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "only");
    }
}
