//! Key derivation.
//!
//! The raw X25519 output is never used as a cipher key. It goes through
//! HKDF-SHA256 with a fixed context label, which yields the same box key on
//! both ends of a (local secret, peer public) pairing.

use hkdf::Hkdf as HkdfImpl;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{SharedSecret, KEY_SIZE};
use crate::error::{Error, Result};

/// Context label bound into every derived box key.
pub const BOX_KEY_INFO: &[u8] = b"mauerspecht box v1";

/// HKDF key derivation using SHA-256.
pub struct Hkdf {
    prk: HkdfImpl<Sha256>,
}

impl Hkdf {
    /// Create a new HKDF instance from input keying material.
    pub fn new(salt: Option<&[u8]>, ikm: &[u8]) -> Self {
        Self {
            prk: HkdfImpl::new(salt, ikm),
        }
    }

    /// Expand to a fixed-size array.
    pub fn expand_fixed<const N: usize>(&self, info: &[u8]) -> Result<[u8; N]> {
        let mut okm = [0u8; N];
        self.prk
            .expand(info, &mut okm)
            .map_err(|_| Error::crypto("HKDF expansion failed"))?;
        Ok(okm)
    }
}

/// Symmetric key for one (local, peer) pairing.
///
/// Automatically zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct BoxKey([u8; KEY_SIZE]);

impl BoxKey {
    /// Derive the box key from a Diffie-Hellman result.
    ///
    /// Rejects non-contributory exchanges, where a low-order peer key would
    /// force a predictable shared secret.
    pub fn derive(shared: &SharedSecret) -> Result<Self> {
        if !shared.was_contributory() {
            return Err(Error::crypto("non-contributory key exchange"));
        }
        let okm = Hkdf::new(None, shared.as_bytes()).expand_fixed::<KEY_SIZE>(BOX_KEY_INFO)?;
        Ok(Self(okm))
    }

    /// Get the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}
