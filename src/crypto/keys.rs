//! X25519 key material.
//!
//! Thin wrappers around `x25519-dalek` so that the rest of the crate never
//! touches raw private key bytes.

use x25519_dalek::{
    PublicKey as DalekPublic, SharedSecret as DalekShared, StaticSecret as DalekStatic,
};

use crate::crypto::random::SecureRandom;
use crate::crypto::{PUBLIC_KEY_SIZE, SECRET_KEY_SIZE};
use crate::error::{Error, Result};

/// A process-lifetime X25519 secret key.
///
/// `x25519-dalek` zeroizes the scalar when this is dropped.
#[derive(Clone)]
pub struct StaticSecret(DalekStatic);

impl StaticSecret {
    /// Generate a new secret from the OS randomness source.
    pub fn random() -> Result<Self> {
        let bytes: [u8; SECRET_KEY_SIZE] = SecureRandom::bytes()?;
        Ok(Self(DalekStatic::from(bytes)))
    }

    /// Create from raw bytes.
    ///
    /// # Security
    ///
    /// The input bytes should come from a cryptographically secure source.
    pub fn from_bytes(bytes: [u8; SECRET_KEY_SIZE]) -> Self {
        Self(DalekStatic::from(bytes))
    }

    /// Perform X25519 Diffie-Hellman key agreement.
    pub fn diffie_hellman(&self, their_public: &PublicKey) -> SharedSecret {
        SharedSecret(self.0.diffie_hellman(&their_public.0))
    }
}

impl From<&StaticSecret> for PublicKey {
    fn from(secret: &StaticSecret) -> Self {
        PublicKey(DalekPublic::from(&secret.0))
    }
}

/// An X25519 public key, exchanged in the clear during `/v1/kex`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey(DalekPublic);

impl PublicKey {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(DalekPublic::from(bytes))
    }

    /// Create from a slice that must be exactly 32 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; PUBLIC_KEY_SIZE] = bytes.try_into().map_err(|_| {
            Error::protocol(format!(
                "expected {} byte public key, got {}",
                PUBLIC_KEY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self::from_bytes(arr))
    }

    /// Get the raw bytes of this public key.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        self.0.as_bytes()
    }

    /// Convert to raw bytes.
    pub fn to_bytes(self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0.to_bytes()
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// The result of an X25519 Diffie-Hellman key exchange.
///
/// Never used as a key directly; see [`crate::crypto::BoxKey`].
pub struct SharedSecret(DalekShared);

impl SharedSecret {
    /// Get the raw shared secret bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// False when the peer supplied a low-order point.
    pub fn was_contributory(&self) -> bool {
        self.0.was_contributory()
    }
}
