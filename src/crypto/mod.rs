//! Cryptographic primitives for credvault.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - Master key loading and HKDF sub-key derivation (`keys`)
//! - Owner-scoped keyed secret fingerprints (`fingerprint`)
//! - Secure replacement-secret generation (`generator`)

pub mod encryption;
pub mod fingerprint;
pub mod generator;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{EncryptionContext, Fingerprinter, MasterKey, ...};
pub use encryption::EncryptionContext;
pub use fingerprint::Fingerprinter;
pub use generator::{generate_secret, GeneratorPolicy};
pub use keys::MasterKey;
