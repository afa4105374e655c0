//! Public-key boxes between one local keypair and any number of peers.
//!
//! Wire format of a box:
//!
//! ```text
//! +----------------+------------------------------+
//! | nonce (24 B)   | ciphertext || tag (16 B)     |
//! +----------------+------------------------------+
//! ```
//!
//! The cipher key is `HKDF-SHA256(X25519(local_secret, peer_public))`, so a
//! box sealed by A for B opens with B's secret and A's public key.

use crate::crypto::{Aead, BoxKey, Nonce, PublicKey, StaticSecret, NONCE_SIZE};
use crate::error::{Error, Result};

/// Owns the process keypair and seals/opens boxes for registered peers.
///
/// The secret half is never exposed.
pub struct CryptoSession {
    secret: StaticSecret,
    public: PublicKey,
}

impl CryptoSession {
    /// Generate a fresh keypair.
    ///
    /// Fails only when the OS randomness source is unavailable.
    pub fn generate() -> Result<Self> {
        Ok(Self::from_secret(StaticSecret::random()?))
    }

    /// Build a session around an existing secret.
    pub fn from_secret(secret: StaticSecret) -> Self {
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// The public half of the local keypair.
    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    /// Whether boxes can be exchanged with `peer` at all.
    ///
    /// False for low-order points, which would pin the shared secret.
    pub fn accepts_peer(&self, peer: &PublicKey) -> bool {
        self.secret.diffie_hellman(peer).was_contributory()
    }

    fn cipher_for(&self, peer: &PublicKey) -> Result<Aead> {
        let key = BoxKey::derive(&self.secret.diffie_hellman(peer))?;
        Ok(Aead::new(&key))
    }

    /// Seal `plaintext` for `peer` under a fresh random nonce.
    pub fn encrypt(&self, peer: &PublicKey, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = Nonce::random()?;
        let sealed = self.cipher_for(peer)?.seal(&nonce, plaintext)?;

        let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
        out.extend_from_slice(nonce.as_bytes());
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Open a box produced by `peer`.
    ///
    /// # Errors
    ///
    /// [`Error::ShortCiphertext`] if there is no room for a nonce, otherwise
    /// [`Error::Authentication`] for any tag mismatch. A low-order peer key
    /// also surfaces as an authentication failure.
    pub fn decrypt(&self, peer: &PublicKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < NONCE_SIZE {
            return Err(Error::ShortCiphertext {
                expected: NONCE_SIZE,
                actual: ciphertext.len(),
            });
        }
        let (nonce, body) = ciphertext.split_at(NONCE_SIZE);
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        nonce_bytes.copy_from_slice(nonce);

        let cipher = self.cipher_for(peer).map_err(|_| Error::Authentication)?;
        cipher.open(&Nonce::from_bytes(nonce_bytes), body)
    }
}
