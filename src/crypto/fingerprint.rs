//! Owner-scoped keyed secret fingerprints.
//!
//! A fingerprint is a one-way, deterministic digest of a secret's
//! plaintext used only to test equality within one owner's records —
//! never to recover the secret.  It is an HMAC-SHA256 keyed with a
//! server-held fingerprint key, so a leaked group listing cannot be
//! dictionary-attacked offline without that key.  The owner id is mixed
//! into the MAC input, so two owners holding the identical secret produce
//! different fingerprints and cannot be correlated.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::crypto::keys::{MasterKey, KEY_LEN};
use crate::errors::{CredVaultError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Separator between the owner id and the plaintext in the MAC input.
/// Prevents ambiguity between ("ab", "c") and ("a", "bc").
const DOMAIN_SEP: u8 = 0x1f;

/// Computes owner-scoped secret fingerprints with a fixed key.
pub struct Fingerprinter {
    key: [u8; KEY_LEN],
}

impl Fingerprinter {
    /// Build a fingerprinter from a raw 32-byte MAC key.
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Build a fingerprinter by deriving the MAC key from a master key.
    pub fn from_master(master: &MasterKey) -> Result<Self> {
        Ok(Self::new(master.derive_fingerprint_key()?))
    }

    /// Fingerprint `plaintext` within the scope of `owner_id`.
    ///
    /// Returns lowercase hex of the 32-byte MAC output.
    pub fn fingerprint(&self, owner_id: &str, plaintext: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| CredVaultError::KeyDerivationFailed(format!("HMAC init: {e}")))?;

        mac.update(owner_id.as_bytes());
        mac.update(&[DOMAIN_SEP]);
        mac.update(plaintext.as_bytes());

        Ok(hex_lower(&mac.finalize().into_bytes()))
    }
}

/// Lowercase hex encoding of raw bytes.
fn hex_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp() -> Fingerprinter {
        Fingerprinter::new([0x17u8; KEY_LEN])
    }

    #[test]
    fn deterministic_for_same_inputs() {
        let f = fp();
        let a = f.fingerprint("owner-1", "Sunflower42!").unwrap();
        let b = f.fingerprint("owner-1", "Sunflower42!").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn differs_across_secrets() {
        let f = fp();
        let a = f.fingerprint("owner-1", "Sunflower42!").unwrap();
        let b = f.fingerprint("owner-1", "Sunflower43!").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn differs_across_owners() {
        let f = fp();
        let a = f.fingerprint("owner-1", "Sunflower42!").unwrap();
        let b = f.fingerprint("owner-2", "Sunflower42!").unwrap();
        assert_ne!(a, b, "identical secrets must not correlate across owners");
    }

    #[test]
    fn differs_across_keys() {
        let a = Fingerprinter::new([0x01u8; KEY_LEN])
            .fingerprint("o", "pw")
            .unwrap();
        let b = Fingerprinter::new([0x02u8; KEY_LEN])
            .fingerprint("o", "pw")
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn owner_plaintext_boundary_is_unambiguous() {
        let f = fp();
        let a = f.fingerprint("ab", "c").unwrap();
        let b = f.fingerprint("a", "bc").unwrap();
        assert_ne!(a, b);
    }
}
