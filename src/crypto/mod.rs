//! Cryptographic primitives for Mauerspecht.
//!
//! This module provides:
//! - X25519 key agreement between the client and server keypairs
//! - HKDF-SHA256 derivation of per-pairing box keys
//! - XChaCha20-Poly1305 authenticated encryption with random nonces
//! - Secure random number generation
//!
//! [`CryptoSession`] ties these together into the `nonce || sealed` boxes
//! used for every payload after the key exchange.

mod aead;
mod kdf;
mod keys;
mod random;
mod session;

pub use aead::{Aead, Nonce};
pub use kdf::{BoxKey, Hkdf, BOX_KEY_INFO};
pub use keys::{PublicKey, SharedSecret, StaticSecret};
pub use random::SecureRandom;
pub use session::CryptoSession;

/// Size of symmetric keys in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Size of AEAD nonce in bytes (192 bits for XChaCha20-Poly1305)
pub const NONCE_SIZE: usize = 24;

/// Size of AEAD authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Size of X25519 public keys in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of X25519 secret keys in bytes
pub const SECRET_KEY_SIZE: usize = 32;
