//! Authenticated encryption.
//!
//! Uses XChaCha20-Poly1305. The 192-bit nonce is large enough to be drawn
//! at random for every message without tracking counters.

use chacha20poly1305::{
    aead::{Aead as AeadTrait, KeyInit},
    XChaCha20Poly1305, XNonce,
};

use crate::crypto::random::SecureRandom;
use crate::crypto::{BoxKey, NONCE_SIZE, TAG_SIZE};
use crate::error::{Error, Result};

/// A 24-byte nonce. Must never repeat under the same key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Draw a fresh nonce from the OS randomness source.
    pub fn random() -> Result<Self> {
        Ok(Self(SecureRandom::bytes()?))
    }

    /// Create a nonce from raw bytes.
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw nonce bytes.
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// XChaCha20-Poly1305 AEAD cipher.
pub struct Aead {
    cipher: XChaCha20Poly1305,
}

impl Aead {
    /// Create a new AEAD instance with the given key.
    pub fn new(key: &BoxKey) -> Self {
        Self {
            cipher: XChaCha20Poly1305::new(key.as_bytes().into()),
        }
    }

    /// Encrypt plaintext. Returns ciphertext || tag (16 bytes appended).
    pub fn seal(&self, nonce: &Nonce, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.cipher
            .encrypt(XNonce::from_slice(nonce.as_bytes()), plaintext)
            .map_err(|_| Error::crypto("encryption failed"))
    }

    /// Decrypt and authenticate ciphertext || tag.
    ///
    /// Every failure, truncated tag included, is reported as
    /// [`Error::Authentication`].
    pub fn open(&self, nonce: &Nonce, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < TAG_SIZE {
            return Err(Error::Authentication);
        }
        self.cipher
            .decrypt(XNonce::from_slice(nonce.as_bytes()), ciphertext)
            .map_err(|_| Error::Authentication)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{PublicKey, StaticSecret};

    fn test_key() -> BoxKey {
        let a = StaticSecret::from_bytes([1u8; 32]);
        let b = StaticSecret::from_bytes([2u8; 32]);
        BoxKey::derive(&a.diffie_hellman(&PublicKey::from(&b))).unwrap()
    }

    #[test]
    fn test_seal_open() {
        let aead = Aead::new(&test_key());
        let nonce = Nonce::random().unwrap();

        let plaintext = b"Hello, World!";
        let sealed = aead.seal(&nonce, plaintext).unwrap();
        assert_eq!(sealed.len(), plaintext.len() + TAG_SIZE);

        let opened = aead.open(&nonce, &sealed).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_wrong_nonce_fails() {
        let aead = Aead::new(&test_key());
        let sealed = aead.seal(&Nonce::from_bytes([1u8; 24]), b"data").unwrap();

        let result = aead.open(&Nonce::from_bytes([2u8; 24]), &sealed);
        assert!(matches!(result, Err(Error::Authentication)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let aead = Aead::new(&test_key());
        let nonce = Nonce::random().unwrap();

        let mut sealed = aead.seal(&nonce, b"secret data").unwrap();
        sealed[0] ^= 0x01;

        assert!(matches!(aead.open(&nonce, &sealed), Err(Error::Authentication)));
    }

    #[test]
    fn test_truncated_tag_fails() {
        let aead = Aead::new(&test_key());
        let nonce = Nonce::random().unwrap();
        assert!(matches!(
            aead.open(&nonce, &[0u8; TAG_SIZE - 1]),
            Err(Error::Authentication)
        ));
    }
}
