//! Wire protocol shared by the prober and the server.
//!
//! ## Protocol Flow
//!
//! ```text
//! Client                                       Server
//!   |  POST /v1/kex   X-Specht-Id, client key    |
//!   |------------------------------------------->|  registry[id] = key
//!   |  server key (32 bytes)                     |
//!   |<-------------------------------------------|
//!   |  GET  /v1/config                           |
//!   |------------------------------------------->|
//!   |  box(ProbeConfig)                          |
//!   |<-------------------------------------------|
//!   |  GET  /v1/data?id=i&header=1&...   (x7 per canary)
//!   |<==========================================>|  canary mirrored back
//!   |  POST /v1/data  X-Specht / Cookie / body   (x7 per canary)
//!   |------------------------------------------->|
//!   |  box(ProbeResult)                          |
//!   |<-------------------------------------------|
//!   |  POST /v1/log   box([LogEntry])            |
//!   |------------------------------------------->|  entries recorded
//! ```

mod channel;
mod messages;

pub use channel::{Channel, ChannelSet};
pub use messages::{LogEntry, ProbeConfig, ProbeResult};

/// Key exchange endpoint
pub const KEX_PATH: &str = "/v1/kex";

/// Encrypted configuration endpoint
pub const CONFIG_PATH: &str = "/v1/config";

/// Probe endpoint, GET for downloads and POST for uploads
pub const DATA_PATH: &str = "/v1/data";

/// Encrypted log upload endpoint
pub const LOG_PATH: &str = "/v1/log";

/// Header carrying the client identity
pub const ID_HEADER: &str = "x-specht-id";

/// Header carrying a canary
pub const PROBE_HEADER: &str = "x-specht";

/// Name of the cookie carrying a canary
pub const COOKIE_NAME: &str = "Specht";

/// Format a canary as a `Cookie` / `Set-Cookie` value.
pub fn cookie_value(canary: &str) -> String {
    format!("{}={}", COOKIE_NAME, canary)
}

/// Extract the canary from a raw `Cookie` / `Set-Cookie` value.
///
/// The value must start with `Specht=`; everything after it is returned
/// verbatim so that appended attributes or extra cookies spoil the match.
pub fn strip_cookie(raw: &str) -> Option<&str> {
    raw.strip_prefix(COOKIE_NAME)?.strip_prefix('=')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_round_trip() {
        let value = cookie_value("EICAR-TEST");
        assert_eq!(value, "Specht=EICAR-TEST");
        assert_eq!(strip_cookie(&value), Some("EICAR-TEST"));
    }

    #[test]
    fn test_strip_cookie_requires_prefix() {
        assert_eq!(strip_cookie("session=abc"), None);
        assert_eq!(strip_cookie("Spechtx=abc"), None);
        assert_eq!(strip_cookie("Specht="), Some(""));
        assert_eq!(strip_cookie("Specht=abc; Path=/"), Some("abc; Path=/"));
    }
}
