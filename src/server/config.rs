//! Server configuration.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::ProbeConfig;

/// Hostname advertised when the file does not name one
pub const DEFAULT_HOSTNAME: &str = "localhost";

/// Port listened on when the file does not name any
pub const DEFAULT_PORT: u16 = 80;

/// Canary used when the file does not name any
pub const DEFAULT_CANARY: &str =
    r"X5O!P%@AP[4\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address every port is bound on
    pub listen_addr: IpAddr,
    /// Probing configuration served to clients. Port 0 binds an ephemeral port.
    pub probe: ProbeConfig,
}

impl ServerConfig {
    /// Create a configuration listening on all interfaces, with defaults
    /// filled in for anything `probe` leaves empty.
    pub fn new(probe: ProbeConfig) -> Self {
        Self {
            listen_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            probe,
        }
        .with_defaults()
    }

    /// Fill in hostname, ports and canaries where they are empty.
    pub fn with_defaults(mut self) -> Self {
        if self.probe.hostname.is_empty() {
            self.probe.hostname = DEFAULT_HOSTNAME.to_string();
        }
        if self.probe.ports.is_empty() {
            self.probe.ports = vec![DEFAULT_PORT];
        }
        if self.probe.canaries.is_empty() {
            self.probe.canaries = vec![DEFAULT_CANARY.to_string()];
        }
        self
    }

    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ServerConfigFile = serde_json::from_str(json)?;
        file.to_config()
    }

    /// Read and parse a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("open config file {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.probe.canaries.is_empty() {
            return Err("at least one canary must be configured".into());
        }
        let mut seen = HashSet::new();
        for (i, canary) in self.probe.canaries.iter().enumerate() {
            if canary.is_empty() {
                return Err(format!("canary {} is empty", i));
            }
            if canary.trim() != canary {
                return Err(format!("canary {} has leading or trailing whitespace", i));
            }
            if HeaderValue::from_str(canary).is_err() {
                return Err(format!("canary {} cannot be sent in an HTTP header", i));
            }
            if !seen.insert(canary.as_str()) {
                return Err(format!("canary {} duplicates an earlier canary", i));
            }
        }

        let mut ports = HashSet::new();
        for port in &self.probe.ports {
            if *port != 0 && !ports.insert(*port) {
                return Err(format!("port {} listed twice", port));
            }
        }
        Ok(())
    }
}

/// Configuration file format for serialization.
///
/// ```json
/// {
///     "listen-addr": "0.0.0.0",
///     "hostname": "probe.example.com",
///     "http-ports": [80, 8080],
///     "magic-strings": ["EICAR-TEST"]
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct ServerConfigFile {
    /// Listen address
    #[serde(rename = "listen-addr", default = "default_listen_addr")]
    pub listen_addr: String,
    /// Probing configuration
    #[serde(flatten)]
    pub probe: ProbeConfig,
}

fn default_listen_addr() -> String {
    Ipv4Addr::UNSPECIFIED.to_string()
}

impl ServerConfigFile {
    /// Convert to runtime configuration, applying defaults and validation.
    pub fn to_config(&self) -> Result<ServerConfig> {
        let listen_addr: IpAddr = self
            .listen_addr
            .parse()
            .map_err(|e| Error::config(format!("invalid listen-addr {}: {}", self.listen_addr, e)))?;

        let config = ServerConfig {
            listen_addr,
            probe: self.probe.clone(),
        }
        .with_defaults();

        config.validate().map_err(Error::config)?;
        Ok(config)
    }

    /// Create from runtime configuration.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            listen_addr: config.listen_addr.to_string(),
            probe: config.probe.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config = ServerConfig::new(ProbeConfig::default());
        assert_eq!(config.probe.hostname, DEFAULT_HOSTNAME);
        assert_eq!(config.probe.ports, vec![DEFAULT_PORT]);
        assert_eq!(config.probe.canaries, vec![DEFAULT_CANARY.to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_values_kept() {
        let config = ServerConfig::from_json(
            r#"{"hostname":"probe.example","http-ports":[8080,8443],"magic-strings":["A","B"]}"#,
        )
        .unwrap();
        assert_eq!(config.listen_addr, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.probe.hostname, "probe.example");
        assert_eq!(config.probe.ports, vec![8080, 8443]);
        assert_eq!(config.probe.canaries, vec!["A", "B"]);
    }

    #[test]
    fn test_listen_addr_parsed() {
        let config = ServerConfig::from_json(r#"{"listen-addr":"127.0.0.1"}"#).unwrap();
        assert_eq!(config.listen_addr, IpAddr::V4(Ipv4Addr::LOCALHOST));

        assert!(matches!(
            ServerConfig::from_json(r#"{"listen-addr":"not-an-ip"}"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_validation() {
        let dup = ServerConfig::new(ProbeConfig {
            canaries: vec!["A".into(), "A".into()],
            ..Default::default()
        });
        assert!(dup.validate().is_err());

        let empty = ServerConfig::new(ProbeConfig {
            canaries: vec!["A".into(), "".into()],
            ..Default::default()
        });
        assert!(empty.validate().is_err());

        let newline = ServerConfig::new(ProbeConfig {
            canaries: vec!["line\nbreak".into()],
            ..Default::default()
        });
        assert!(newline.validate().is_err());

        let padded = ServerConfig::new(ProbeConfig {
            canaries: vec![" padded".into()],
            ..Default::default()
        });
        assert!(padded.validate().is_err());

        let ports = ServerConfig::new(ProbeConfig {
            ports: vec![8080, 8080],
            ..Default::default()
        });
        assert!(ports.validate().is_err());

        let ephemeral = ServerConfig::new(ProbeConfig {
            ports: vec![0, 0],
            ..Default::default()
        });
        assert!(ephemeral.validate().is_ok());
    }

    #[test]
    fn test_config_file_round_trip() {
        let config = ServerConfig::new(ProbeConfig {
            hostname: "h".into(),
            ports: vec![1234],
            canaries: vec!["X".into()],
        });

        let file = ServerConfigFile::from_config(&config);
        let json = serde_json::to_string(&file).unwrap();
        let restored = ServerConfig::from_json(&json).unwrap();

        assert_eq!(config.listen_addr, restored.listen_addr);
        assert_eq!(config.probe, restored.probe);
    }
}
