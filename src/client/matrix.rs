//! Outcomes of the channel-probe matrix.
//!
//! Each probe covers one canary and one [`ChannelSet`]. Only the channels in
//! the set are judged; a probe that failed outright carries the failure text
//! instead of per-channel verdicts.

use std::fmt;

use crate::error::Error;
use crate::protocol::{cookie_value, Channel, ChannelSet, ProbeResult};

/// Which way the canary travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Server to client, `GET /v1/data`
    Download,
    /// Client to server, `POST /v1/data`
    Upload,
}

impl Direction {
    /// Name used in log lines.
    pub const fn name(self) -> &'static str {
        match self {
            Direction::Download => "download",
            Direction::Upload => "upload",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a canary arrived intact in one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelVerdict {
    /// Channel that was checked
    pub channel: Channel,
    /// True if the canary arrived exactly as sent
    pub survived: bool,
}

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The exchange completed; one verdict per requested channel
    Checked(Vec<ChannelVerdict>),
    /// The exchange failed before anything could be checked
    Failed(String),
}

/// One cell of the probe matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Probe direction
    pub direction: Direction,
    /// Channels the canary was placed in
    pub channels: ChannelSet,
    /// Canary index
    pub canary: usize,
    /// What happened
    pub verdict: Verdict,
}

impl ProbeOutcome {
    pub(crate) fn checked(
        direction: Direction,
        channels: ChannelSet,
        canary: usize,
        verdicts: Vec<ChannelVerdict>,
    ) -> Self {
        Self {
            direction,
            channels,
            canary,
            verdict: Verdict::Checked(verdicts),
        }
    }

    pub(crate) fn failed(direction: Direction, channels: ChannelSet, canary: usize, err: &Error) -> Self {
        Self {
            direction,
            channels,
            canary,
            verdict: Verdict::Failed(failure_text(err)),
        }
    }

    /// Whether the probe failed outright.
    pub fn is_failure(&self) -> bool {
        matches!(self.verdict, Verdict::Failed(_))
    }

    /// Verdict for `channel`, or `None` if it was not checked.
    pub fn survived(&self, channel: Channel) -> Option<bool> {
        match &self.verdict {
            Verdict::Checked(verdicts) => verdicts
                .iter()
                .find(|v| v.channel == channel)
                .map(|v| v.survived),
            Verdict::Failed(_) => None,
        }
    }

    /// Log lines for this probe, one per checked channel.
    ///
    /// ```text
    /// download xfer< header cookie > (0): found string in header
    /// download xfer< header cookie > (0): did not find string in cookie
    /// upload xfer< body > (2): expected status code 200, got 502
    /// ```
    pub fn log_lines(&self) -> Vec<String> {
        let prefix = format!("{} {} ({})", self.direction, self.channels, self.canary);
        match &self.verdict {
            Verdict::Checked(verdicts) => verdicts
                .iter()
                .map(|v| {
                    let found = if v.survived { "found" } else { "did not find" };
                    format!("{}: {} string in {}", prefix, found, v.channel)
                })
                .collect(),
            Verdict::Failed(reason) => vec![format!("{}: {}", prefix, reason)],
        }
    }
}

/// Text logged for a failed probe. Box failures are not detailed.
pub(crate) fn failure_text(err: &Error) -> String {
    if err.is_crypto_failure() {
        "decryption failed".to_string()
    } else {
        err.to_string()
    }
}

/// Judge a download response.
///
/// Each requested channel must carry exactly the canary: the `X-Specht`
/// header equal to it, `Set-Cookie` equal to `Specht=<canary>`, and the full
/// body equal to it.
pub(crate) fn check_download(
    channels: ChannelSet,
    canary: &str,
    header: Option<&[u8]>,
    set_cookie: Option<&[u8]>,
    body: &[u8],
) -> Vec<ChannelVerdict> {
    let cookie = cookie_value(canary);
    channels
        .channels()
        .map(|channel| {
            let survived = match channel {
                Channel::Header => header == Some(canary.as_bytes()),
                Channel::Cookie => set_cookie == Some(cookie.as_bytes()),
                Channel::Body => body == canary.as_bytes(),
            };
            ChannelVerdict { channel, survived }
        })
        .collect()
}

/// Judge the server's report on an upload of canary `index`.
pub(crate) fn check_upload(channels: ChannelSet, index: usize, result: &ProbeResult) -> Vec<ChannelVerdict> {
    channels
        .channels()
        .map(|channel| ChannelVerdict {
            channel,
            survived: result.index(channel) == Some(index),
        })
        .collect()
}

/// Totals over a set of probe outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatrixSummary {
    /// Probes run
    pub probes: usize,
    /// Probes that failed outright
    pub failed: usize,
    /// Channel checks where the canary arrived intact
    pub survived: usize,
    /// Channel checks where it did not
    pub stripped: usize,
}

impl MatrixSummary {
    /// Count up `outcomes`.
    pub fn from_outcomes(outcomes: &[ProbeOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            summary.probes += 1;
            match &outcome.verdict {
                Verdict::Checked(verdicts) => {
                    for v in verdicts {
                        if v.survived {
                            summary.survived += 1;
                        } else {
                            summary.stripped += 1;
                        }
                    }
                }
                Verdict::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }
}

impl fmt::Display for MatrixSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} probes: {} channel checks passed, {} stripped, {} probes failed",
            self.probes, self.survived, self.stripped, self.failed
        )
    }
}
