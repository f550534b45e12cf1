//! Master key handling and HKDF-SHA256 sub-key derivation.
//!
//! One 32-byte server-held master key is loaded at process start.  From it
//! we derive:
//! - The **cipher key** used for AES-256-GCM encryption of secret fields.
//! - The **fingerprint key** used for the keyed secret fingerprints.
//!
//! HKDF (RFC 5869) uses the master key as input keying material and a
//! context string (`info`) to produce independent sub-keys, so a leak of
//! one sub-key never reveals the other.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use tracing::warn;
use zeroize::Zeroize;

use crate::config::RunMode;
use crate::errors::{CredVaultError, Result};

/// Length of the master key and all derived sub-keys (256 bits).
pub const KEY_LEN: usize = 32;

/// A wrapper around the 32-byte master key that zeroes its memory when
/// dropped.  The raw bytes never appear in errors or logs.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Create a `MasterKey` from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Decode a base64-encoded 32-byte master key.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let mut decoded = BASE64.decode(encoded.trim().as_bytes()).map_err(|_| {
            CredVaultError::KeyDerivationFailed("master key is not valid base64".into())
        })?;

        if decoded.len() != KEY_LEN {
            decoded.zeroize();
            return Err(CredVaultError::KeyDerivationFailed(format!(
                "master key must be {KEY_LEN} bytes"
            )));
        }

        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self::new(bytes))
    }

    /// Generate a fresh random master key from the OS entropy pool.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::rng().fill_bytes(&mut bytes);
        Self::new(bytes)
    }

    /// Load the master key from the environment variable `env_var`.
    ///
    /// In production mode a missing or empty variable is fatal
    /// (`EncryptionKeyMissing`).  In development mode a throwaway key is
    /// generated instead, with a loud warning: anything encrypted under it
    /// is unrecoverable once the process exits.
    pub fn load(env_var: &str, mode: RunMode) -> Result<Self> {
        match std::env::var(env_var) {
            Ok(value) if !value.trim().is_empty() => Self::from_base64(&value),
            _ => match mode {
                RunMode::Production => Err(CredVaultError::EncryptionKeyMissing),
                RunMode::Development => {
                    warn!(
                        env_var,
                        "no master key configured — generated a TEMPORARY key; \
                         data encrypted this run is UNRECOVERABLE after restart"
                    );
                    Ok(Self::generate())
                }
            },
        }
    }

    /// Derive the AES-256-GCM cipher key.
    pub fn derive_cipher_key(&self) -> Result<[u8; KEY_LEN]> {
        hkdf_derive(&self.bytes, b"credvault-cipher-key")
    }

    /// Derive the fingerprint MAC key.
    pub fn derive_fingerprint_key(&self) -> Result<[u8; KEY_LEN]> {
        hkdf_derive(&self.bytes, b"credvault-fingerprint-key")
    }
}

/// Internal helper: run HKDF-SHA256 expand with the given `info`.
///
/// The extract step is skipped and the master key is used directly as the
/// pseudo-random key, because it is already uniform (32 random bytes, not
/// a password).
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<[u8; KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(info, &mut okm)
        .map_err(|e| CredVaultError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_keys_are_distinct_and_deterministic() {
        let master = MasterKey::new([0x42u8; KEY_LEN]);

        let cipher1 = master.derive_cipher_key().unwrap();
        let cipher2 = master.derive_cipher_key().unwrap();
        let fp = master.derive_fingerprint_key().unwrap();

        assert_eq!(cipher1, cipher2, "derivation must be deterministic");
        assert_ne!(cipher1, fp, "cipher and fingerprint keys must differ");
    }

    #[test]
    fn from_base64_roundtrip() {
        let master = MasterKey::generate();
        let encoded = BASE64.encode(master.bytes);

        let decoded = MasterKey::from_base64(&encoded).unwrap();
        assert_eq!(decoded.bytes, master.bytes);
    }

    #[test]
    fn from_base64_rejects_wrong_length() {
        let encoded = BASE64.encode([0u8; 16]);
        assert!(MasterKey::from_base64(&encoded).is_err());
    }

    #[test]
    fn from_base64_rejects_garbage() {
        assert!(MasterKey::from_base64("not-base64!!!").is_err());
    }

    #[test]
    fn load_is_fatal_in_production_without_key() {
        let result = MasterKey::load("CREDVAULT_TEST_KEY_THAT_IS_NOT_SET", RunMode::Production);
        assert!(matches!(result, Err(CredVaultError::EncryptionKeyMissing)));
    }

    #[test]
    fn load_generates_temporary_key_in_development() {
        let key = MasterKey::load("CREDVAULT_TEST_KEY_THAT_IS_NOT_SET", RunMode::Development)
            .expect("development mode must fall back to a generated key");
        assert_ne!(key.bytes, [0u8; KEY_LEN]);
    }
}
