//! # Mauerspecht
//!
//! Finds out which HTTP channels a monitored network path lets a canary
//! string through, in each direction.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  client::Prober            server::Server               │
//! │  (drives the run)          (passive responder)          │
//! ├─────────────────────────────────────────────────────────┤
//! │  Probe matrix: 7 channel sets x N canaries, both ways   │
//! ├─────────────────────────────────────────────────────────┤
//! │  protocol: endpoints, ProbeConfig, ProbeResult, log     │
//! ├─────────────────────────────────────────────────────────┤
//! │  identity: 24-byte ClientId, URL-safe base64            │
//! ├─────────────────────────────────────────────────────────┤
//! │  crypto: X25519 -> HKDF-SHA256 -> XChaCha20-Poly1305    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The middlebox under test sits between the two. Configuration, upload
//! results and the final report travel inside boxes so that it cannot tamper
//! with them unnoticed; the probes themselves are sent in the clear.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod client;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod protocol;
pub mod server;

pub use error::{Error, Result};
