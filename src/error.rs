//! Error types for the Mauerspecht prober.

use thiserror::Error;

/// Result type alias for Mauerspecht operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while probing or serving probes.
#[derive(Error, Debug)]
pub enum Error {
    /// The operating system randomness source failed
    #[error("randomness source unavailable: {0}")]
    Randomness(String),

    /// Client identity could not be decoded
    #[error("malformed client identity: {0}")]
    MalformedIdentity(String),

    /// Ciphertext too short to carry a nonce
    #[error("malformed ciphertext: expected at least {expected} bytes, got {actual}")]
    ShortCiphertext {
        /// Minimum length, the nonce size
        expected: usize,
        /// Length received
        actual: usize,
    },

    /// Authentication tag did not verify
    #[error("authentication failed")]
    Authentication,

    /// Cryptographic operation failed
    #[error("cryptographic error: {0}")]
    Crypto(String),

    /// Peer answered with something the protocol does not allow
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Peer answered with an unexpected HTTP status
    #[error("expected status code 200, got {0}")]
    Status(u16),

    /// HTTP transport failure (connect, timeout, proxy)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// JSON encoding or decoding failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Network I/O error
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),
}

impl Error {
    /// Create a new protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }

    /// Create a new cryptographic error
    pub fn crypto(msg: impl Into<String>) -> Self {
        Error::Crypto(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Check if this error came out of sealing or opening a box.
    ///
    /// These are reported to peers and logs without further detail.
    pub fn is_crypto_failure(&self) -> bool {
        matches!(
            self,
            Error::ShortCiphertext { .. } | Error::Authentication | Error::Crypto(_)
        )
    }

    /// Check if this error happened on the wire rather than in the protocol
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Network(_))
    }
}
