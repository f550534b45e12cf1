//! AES-256-GCM authenticated encryption of secret fields.
//!
//! Each call to `encrypt` generates a fresh random 12-byte nonce and
//! prepends it to the ciphertext.  `decrypt` splits the nonce back out
//! before decrypting, and fails with a payload-free `DecryptionFailed`
//! whenever the authentication tag does not verify — data is never
//! partially returned.
//!
//! Layout of the returned byte buffer:
//!   [ 12-byte nonce | ciphertext + 16-byte auth tag ]

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use crate::crypto::keys::{MasterKey, KEY_LEN};
use crate::errors::{CredVaultError, Result};

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_LEN: usize = 12;

/// Identifier of the active algorithm, recorded for operational visibility.
pub const ALGORITHM: &str = "aes-256-gcm";

/// Process-wide encryption context: the active cipher built from the
/// derived cipher key.  Constructed once at startup, never persisted.
pub struct EncryptionContext {
    cipher: Aes256Gcm,
}

impl EncryptionContext {
    /// Build a context from a raw 32-byte cipher key.
    pub fn new(key: &[u8; KEY_LEN]) -> Result<Self> {
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|_| CredVaultError::EncryptionFailed("invalid key length".into()))?;
        Ok(Self { cipher })
    }

    /// Build a context by deriving the cipher key from a master key.
    pub fn from_master(master: &MasterKey) -> Result<Self> {
        let key = master.derive_cipher_key()?;
        Self::new(&key)
    }

    /// Identifier of the algorithm this context encrypts with.
    pub fn algorithm(&self) -> &'static str {
        ALGORITHM
    }

    /// Encrypt `plaintext`, returning the nonce prepended to the
    /// ciphertext (nonce || ciphertext).
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        // Generate a random 12-byte nonce.
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        // Encrypt and authenticate the plaintext.  The error message stays
        // generic: it must not echo any input bytes.
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CredVaultError::EncryptionFailed("cipher error".into()))?;

        // Prepend the nonce so the caller only needs to store one blob.
        let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        output.extend_from_slice(&nonce);
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    /// Decrypt data that was produced by `encrypt`.
    ///
    /// Expects the first 12 bytes to be the nonce, followed by the
    /// ciphertext.  Any integrity failure maps to `DecryptionFailed`.
    pub fn decrypt(&self, ciphertext_with_nonce: &[u8]) -> Result<Vec<u8>> {
        // Make sure we have at least a nonce worth of bytes.
        if ciphertext_with_nonce.len() < NONCE_LEN {
            return Err(CredVaultError::DecryptionFailed);
        }

        // Split nonce from ciphertext.
        let (nonce_bytes, ciphertext) = ciphertext_with_nonce.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        // Decrypt and verify the auth tag.
        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CredVaultError::DecryptionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> EncryptionContext {
        EncryptionContext::new(&[0xA5u8; KEY_LEN]).unwrap()
    }

    #[test]
    fn roundtrip() {
        let ctx = context();
        let plaintext = b"hunter2-but-longer";

        let ciphertext = ctx.encrypt(plaintext).unwrap();
        assert!(ciphertext.len() > plaintext.len());

        let recovered = ctx.decrypt(&ciphertext).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn fresh_nonce_every_call() {
        let ctx = context();
        let ct1 = ctx.encrypt(b"same input").unwrap();
        let ct2 = ctx.encrypt(b"same input").unwrap();
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn tampering_is_detected() {
        let ctx = context();
        let mut ciphertext = ctx.encrypt(b"integrity matters").unwrap();

        // Flip one bit past the nonce.
        ciphertext[NONCE_LEN] ^= 0x01;

        assert!(matches!(
            ctx.decrypt(&ciphertext),
            Err(CredVaultError::DecryptionFailed)
        ));
    }

    #[test]
    fn truncated_input_fails_cleanly() {
        let ctx = context();
        assert!(matches!(
            ctx.decrypt(&[0u8; 5]),
            Err(CredVaultError::DecryptionFailed)
        ));
    }

    #[test]
    fn wrong_key_fails() {
        let ctx = context();
        let other = EncryptionContext::new(&[0x5Au8; KEY_LEN]).unwrap();

        let ciphertext = ctx.encrypt(b"secret").unwrap();
        assert!(other.decrypt(&ciphertext).is_err());
    }
}
