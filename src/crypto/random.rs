//! Secure random number generation.
//!
//! Every byte of key material, every nonce and every client identity comes
//! from the operating system's entropy source. Failure is surfaced as
//! [`Error::Randomness`] instead of a panic.

use rand::RngCore;
use rand_core::OsRng;

use crate::error::{Error, Result};

/// Cryptographically secure random number generator.
pub struct SecureRandom;

impl SecureRandom {
    /// Fill a buffer with cryptographically secure random bytes.
    pub fn fill(dest: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| Error::Randomness(e.to_string()))
    }

    /// Generate a fixed-size array of random bytes.
    pub fn bytes<const N: usize>() -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        Self::fill(&mut buf)?;
        Ok(buf)
    }
}
