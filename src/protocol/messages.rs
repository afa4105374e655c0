//! JSON payloads exchanged inside encrypted boxes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Channel;

/// Probing configuration handed to clients by `GET /v1/config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Hostname the server advertises
    #[serde(default)]
    pub hostname: String,

    /// Ports the server listens on
    #[serde(rename = "http-ports", alias = "ports", default)]
    pub ports: Vec<u16>,

    /// Canary strings, identified by their position
    #[serde(rename = "magic-strings", alias = "canaries", default)]
    pub canaries: Vec<String>,
}

impl ProbeConfig {
    /// The canary with index `index`, if there is one.
    pub fn canary(&self, index: usize) -> Option<&str> {
        self.canaries.get(index).map(String::as_str)
    }

    /// Index of the canary exactly equal to `value`.
    ///
    /// Comparison is whole-string equality; a value that merely starts with
    /// or contains a canary does not match.
    pub fn find_canary(&self, value: &str) -> Option<usize> {
        self.canaries.iter().position(|c| c == value)
    }
}

/// What the server saw in each channel of an upload probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Canary found in the `X-Specht` header
    #[serde(with = "index_or_none")]
    pub header: Option<usize>,

    /// Canary found in the `Specht` cookie
    #[serde(with = "index_or_none", alias = "Cookie")]
    pub cookie: Option<usize>,

    /// Canary found in the body
    #[serde(with = "index_or_none")]
    pub body: Option<usize>,
}

impl ProbeResult {
    /// Result with nothing matched.
    pub const NONE: ProbeResult = ProbeResult {
        header: None,
        cookie: None,
        body: None,
    };

    /// Canary index the server reported for `channel`.
    pub fn index(&self, channel: Channel) -> Option<usize> {
        match channel {
            Channel::Header => self.header,
            Channel::Cookie => self.cookie,
            Channel::Body => self.body,
        }
    }
}

/// One client log line, shipped to the server at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the line was recorded (RFC 3339 on the wire)
    pub timestamp: DateTime<Utc>,
    /// Log message
    pub message: String,
}

impl LogEntry {
    /// Create an entry stamped with the current time.
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
        }
    }
}

// Canary indices travel as integers with -1 for "no match"
mod index_or_none {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(index) => serializer.serialize_u64(*index as u64),
            None => serializer.serialize_i64(-1),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match i64::deserialize(deserializer)? {
            -1 => Ok(None),
            n if n >= 0 => usize::try_from(n)
                .map(Some)
                .map_err(serde::de::Error::custom),
            n => Err(serde::de::Error::custom(format!("invalid canary index {}", n))),
        }
    }
}
