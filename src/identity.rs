//! Per-run client identity.
//!
//! A client picks 24 random bytes at start-up and presents them, URL-safe
//! base64 encoded, in the `X-Specht-Id` header of every request. The server
//! uses the identity only as a lookup key into its peer registry.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::URL_SAFE, Engine};

use crate::crypto::SecureRandom;
use crate::error::{Error, Result};

/// Number of raw bytes in a client identity
pub const CLIENT_ID_SIZE: usize = 24;

/// Length of the base64 form of a client identity
pub const CLIENT_ID_ENCODED_LEN: usize = 32;

/// Random identifier of one client run.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId([u8; CLIENT_ID_SIZE]);

impl ClientId {
    /// Generate a new identity from the OS randomness source.
    pub fn generate() -> Result<Self> {
        Ok(Self(SecureRandom::bytes()?))
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; CLIENT_ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw identity bytes.
    pub fn as_bytes(&self) -> &[u8; CLIENT_ID_SIZE] {
        &self.0
    }

    /// Decode the URL-safe base64 header form.
    pub fn parse(s: &str) -> Result<Self> {
        if s.len() != CLIENT_ID_ENCODED_LEN {
            return Err(Error::MalformedIdentity(format!(
                "wrong id string length ({})",
                s.len()
            )));
        }
        let decoded = URL_SAFE
            .decode(s)
            .map_err(|e| Error::MalformedIdentity(e.to_string()))?;
        let bytes: [u8; CLIENT_ID_SIZE] = decoded.as_slice().try_into().map_err(|_| {
            Error::MalformedIdentity(format!("wrong length of decoded data ({})", decoded.len()))
        })?;
        Ok(Self(bytes))
    }

    /// Encode to the URL-safe base64 header form.
    pub fn format(&self) -> String {
        URL_SAFE.encode(self.0)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientId({})", self.format())
    }
}

impl FromStr for ClientId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
