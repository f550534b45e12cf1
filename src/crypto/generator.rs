//! Replacement-secret generation for the remediation engine.
//!
//! Secrets are sampled from the combined pool of enabled character
//! classes, then one distinct random position per required class is
//! re-sampled from that class alone.  This guarantees class coverage
//! without the "patch the last character" shortcut, which both fails to
//! guarantee coverage and concentrates the fix-up in a predictable
//! position.

use rand::seq::{IndexedRandom, SliceRandom};

use crate::errors::{CredVaultError, Result};

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Which character classes a generated secret must draw from.
///
/// Every enabled class is guaranteed at least one character in the
/// output.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorPolicy {
    /// Length of the generated secret.
    pub length: usize,
    /// Include (and guarantee) lowercase letters.
    pub lowercase: bool,
    /// Include (and guarantee) uppercase letters.
    pub uppercase: bool,
    /// Include (and guarantee) digits.
    pub digits: bool,
    /// Include (and guarantee) symbols.
    pub symbols: bool,
}

impl Default for GeneratorPolicy {
    fn default() -> Self {
        Self {
            length: 20,
            lowercase: true,
            uppercase: true,
            digits: true,
            symbols: true,
        }
    }
}

impl GeneratorPolicy {
    /// Policy with all classes enabled and the given length.
    pub fn with_length(length: usize) -> Self {
        Self {
            length,
            ..Self::default()
        }
    }

    /// The character sets of the enabled classes.
    fn enabled_classes(&self) -> Vec<&'static [u8]> {
        let mut classes = Vec::with_capacity(4);
        if self.lowercase {
            classes.push(LOWERCASE);
        }
        if self.uppercase {
            classes.push(UPPERCASE);
        }
        if self.digits {
            classes.push(DIGITS);
        }
        if self.symbols {
            classes.push(SYMBOLS);
        }
        classes
    }

    /// Validate the policy before generation.
    pub fn validate(&self) -> Result<()> {
        let classes = self.enabled_classes();
        if classes.is_empty() {
            return Err(CredVaultError::Validation(
                "at least one character class must be enabled".into(),
            ));
        }
        if self.length < 8 || self.length < classes.len() {
            return Err(CredVaultError::Validation(
                "generated length must be at least 8 and cover every enabled class".into(),
            ));
        }
        Ok(())
    }
}

/// Generate a secret satisfying `policy` from the thread-local CSPRNG.
pub fn generate_secret(policy: &GeneratorPolicy) -> Result<String> {
    policy.validate()?;

    let classes = policy.enabled_classes();
    let pool: Vec<u8> = classes.iter().flat_map(|c| c.iter().copied()).collect();

    let mut rng = rand::rng();

    // 1. Fill every position from the combined pool.
    let mut out: Vec<u8> = (0..policy.length)
        .map(|_| sample(&pool, &mut rng))
        .collect::<Result<_>>()?;

    // 2. Pick one distinct position per enabled class and re-sample it
    //    from that class alone.  Positions are drawn from a shuffled
    //    index list so the guaranteed characters land anywhere.
    let mut positions: Vec<usize> = (0..policy.length).collect();
    positions.shuffle(&mut rng);

    for (class, pos) in classes.iter().zip(positions) {
        out[pos] = sample(class, &mut rng)?;
    }

    // All class tables are ASCII, so this cannot lose bytes.
    String::from_utf8(out)
        .map_err(|_| CredVaultError::EncryptionFailed("generator produced non-UTF-8".into()))
}

fn sample(set: &[u8], rng: &mut impl rand::Rng) -> Result<u8> {
    set.choose(rng)
        .copied()
        .ok_or_else(|| CredVaultError::Validation("empty character set".into()))
}
