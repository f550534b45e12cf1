use thiserror::Error;

/// All errors that can occur in credvault.
///
/// Cryptographic and concurrency failures never carry plaintext, key
/// material, or ciphertext bytes in their messages.
#[derive(Debug, Error)]
pub enum CredVaultError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — ciphertext corrupt, tampered, or wrong key")]
    DecryptionFailed,

    #[error("Encryption key missing — a master key is required in production mode")]
    EncryptionKeyMissing,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Record operation errors ---
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Record {0} not found")]
    RecordNotFound(i64),

    #[error("Concurrent modification of record {0} — reload and retry")]
    ConcurrencyConflict(i64),

    // --- Breach checker errors ---
    #[error("Breach corpus unavailable: {0}")]
    ExternalService(String),

    // --- Remediation errors ---
    #[error("Rotation failed: {0}")]
    RotationFailed(String),

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Storage(String),

    // --- Config errors ---
    #[error("Config error: {0}")]
    Config(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for CredVaultError {
    fn from(e: rusqlite::Error) -> Self {
        CredVaultError::Storage(e.to_string())
    }
}

/// Convenience type alias for credvault results.
pub type Result<T> = std::result::Result<T, CredVaultError>;
