//! High-level vault operations used by the API boundary.
//!
//! `SecretVault` wraps the store and the crypto layer so that the rest
//! of the application can work with simple owner-scoped method calls
//! like `vault.create_record(owner, record)`.  Plaintext exists only
//! transiently inside these methods: it is scored, fingerprinted, and
//! encrypted, and only ciphertext reaches the store.

use std::sync::Arc;

use zeroize::Zeroize;

use crate::crypto::encryption::EncryptionContext;
use crate::crypto::fingerprint::Fingerprinter;
use crate::crypto::keys::MasterKey;
use crate::errors::{CredVaultError, Result};
use crate::store::models::{DuplicateGroup, EncryptedRecord, SecretRecord};
use crate::store::Store;
use crate::strength;

/// Input for creating a record.  Secret and notes arrive in plaintext
/// from the (authenticated) caller and never leave this module
/// unencrypted.
#[derive(Debug, Clone)]
pub struct NewSecretRecord {
    pub site_name: String,
    pub site_url: Option<String>,
    pub account_name: String,
    pub secret: String,
    pub notes: Option<String>,
    /// Whether the remediation engine may rotate this record (default:
    /// true).
    pub auto_remediate: bool,
}

impl NewSecretRecord {
    /// Minimal constructor; optional fields via struct update syntax.
    pub fn new(site_name: &str, account_name: &str, secret: &str) -> Self {
        Self {
            site_name: site_name.to_string(),
            site_url: None,
            account_name: account_name.to_string(),
            secret: secret.to_string(),
            notes: None,
            auto_remediate: true,
        }
    }
}

/// Partial update of an existing record.  `None` fields are left
/// unchanged.  `expected_version` is the version the caller last read;
/// a stale value yields `ConcurrencyConflict`.
#[derive(Debug, Clone, Default)]
pub struct SecretUpdate {
    pub expected_version: i64,
    pub site_name: Option<String>,
    pub site_url: Option<String>,
    pub account_name: Option<String>,
    pub secret: Option<String>,
    pub notes: Option<String>,
}

/// The main vault handle.  Construct one at startup from the opened
/// store and the loaded master key, then share it across request
/// handlers and background sweeps.
pub struct SecretVault {
    store: Arc<Store>,
    encryption: EncryptionContext,
    fingerprinter: Fingerprinter,
}

impl SecretVault {
    /// Build the vault: derives the cipher key and the fingerprint key
    /// from the master key.
    pub fn new(store: Arc<Store>, master: &MasterKey) -> Result<Self> {
        Ok(Self {
            store,
            encryption: EncryptionContext::from_master(master)?,
            fingerprinter: Fingerprinter::from_master(master)?,
        })
    }

    /// The underlying store (grouping queries, outcome history).
    pub fn store(&self) -> &Store {
        &self.store
    }

    // ------------------------------------------------------------------
    // Record operations
    // ------------------------------------------------------------------

    /// Validate, score, encrypt, group, and persist a new record.
    pub fn create_record(&self, owner: &str, new: NewSecretRecord) -> Result<SecretRecord> {
        validate_owner(owner)?;
        validate_field("site name", &new.site_name, 255)?;
        validate_field("account name", &new.account_name, 255)?;
        validate_secret(&new.secret)?;
        if let Some(url) = &new.site_url {
            validate_field("site URL", url, 2048)?;
        }

        let report = strength::analyze(&new.secret);
        let fingerprint = self.fingerprinter.fingerprint(owner, &new.secret)?;
        let secret_ciphertext = self.encryption.encrypt(new.secret.as_bytes())?;
        let notes_ciphertext = match &new.notes {
            Some(notes) => Some(self.encryption.encrypt(notes.as_bytes())?),
            None => None,
        };

        self.store.insert_record(
            owner,
            EncryptedRecord {
                site_name: new.site_name,
                site_url: new.site_url,
                account_name: new.account_name,
                secret_ciphertext,
                notes_ciphertext,
                fingerprint,
                strength_score: report.score,
                auto_remediate: new.auto_remediate,
            },
        )
    }

    /// Fetch a record's metadata and ciphertext (no decryption).
    pub fn record(&self, owner: &str, id: i64) -> Result<SecretRecord> {
        validate_owner(owner)?;
        self.store.record(owner, id)
    }

    /// All records for one owner.
    pub fn list_records(&self, owner: &str) -> Result<Vec<SecretRecord>> {
        validate_owner(owner)?;
        self.store.list_records(owner)
    }

    /// Decrypt and return the secret, recording the access time.
    pub fn reveal_secret(&self, owner: &str, id: i64) -> Result<String> {
        validate_owner(owner)?;
        let record = self.store.record(owner, id)?;
        let plaintext = self.decrypt_utf8(&record.secret_ciphertext)?;
        self.store.touch_accessed(owner, id)?;
        Ok(plaintext)
    }

    /// Decrypt and return the notes, if the record has any.
    pub fn reveal_notes(&self, owner: &str, id: i64) -> Result<Option<String>> {
        validate_owner(owner)?;
        let record = self.store.record(owner, id)?;
        record
            .notes_ciphertext
            .as_deref()
            .map(|ct| self.decrypt_utf8(ct))
            .transpose()
    }

    /// Apply a partial update.  A secret change re-scores and re-groups
    /// the record atomically; the emptied previous group is pruned.
    pub fn update_record(&self, owner: &str, id: i64, update: SecretUpdate) -> Result<SecretRecord> {
        validate_owner(owner)?;
        let mut current = self.store.record(owner, id)?;
        let mut version = update.expected_version;

        if let Some(secret) = &update.secret {
            validate_secret(secret)?;
            let report = strength::analyze(secret);
            let fingerprint = self.fingerprinter.fingerprint(owner, secret)?;
            let ciphertext = self.encryption.encrypt(secret.as_bytes())?;

            current =
                self.store
                    .update_secret(owner, id, version, &ciphertext, &fingerprint, report.score)?;
            version = current.version;
        }

        let metadata_changed = update.site_name.is_some()
            || update.site_url.is_some()
            || update.account_name.is_some()
            || update.notes.is_some();

        if metadata_changed {
            let site_name = update.site_name.unwrap_or_else(|| current.site_name.clone());
            let account_name = update
                .account_name
                .unwrap_or_else(|| current.account_name.clone());
            let site_url = update.site_url.or_else(|| current.site_url.clone());

            validate_field("site name", &site_name, 255)?;
            validate_field("account name", &account_name, 255)?;
            if let Some(url) = &site_url {
                validate_field("site URL", url, 2048)?;
            }

            let notes_ciphertext = match &update.notes {
                Some(notes) => Some(self.encryption.encrypt(notes.as_bytes())?),
                None => current.notes_ciphertext.clone(),
            };

            current = self.store.update_metadata(
                owner,
                id,
                version,
                &site_name,
                site_url.as_deref(),
                &account_name,
                notes_ciphertext.as_deref(),
            )?;
        }

        Ok(current)
    }

    /// Delete one record (and its group, if now empty).
    pub fn delete_record(&self, owner: &str, id: i64) -> Result<()> {
        validate_owner(owner)?;
        self.store.delete_record(owner, id)
    }

    /// Cascading deletion of every record and group an owner holds.
    pub fn delete_owner(&self, owner: &str) -> Result<usize> {
        validate_owner(owner)?;
        self.store.delete_owner(owner)
    }

    // ------------------------------------------------------------------
    // Reuse detection and flags
    // ------------------------------------------------------------------

    /// Groups of records sharing one plaintext secret, sizes > 1 only.
    pub fn duplicate_groups(&self, owner: &str) -> Result<Vec<DuplicateGroup>> {
        validate_owner(owner)?;
        self.store.duplicate_groups(owner)
    }

    /// Flag or clear a record as known-compromised.
    pub fn mark_compromised(&self, owner: &str, id: i64, compromised: bool) -> Result<()> {
        validate_owner(owner)?;
        self.store.set_compromised(owner, id, compromised)
    }

    /// Opt a record in or out of automatic remediation.
    pub fn set_auto_remediate(&self, owner: &str, id: i64, enabled: bool) -> Result<()> {
        validate_owner(owner)?;
        self.store.set_auto_remediate(owner, id, enabled)
    }

    // ------------------------------------------------------------------
    // Crate-internal helpers
    // ------------------------------------------------------------------

    /// Decrypt a record's secret without touching the access timestamp.
    /// Used by sweeps, which read secrets mechanically, not on behalf of
    /// the user.
    pub(crate) fn decrypt_secret(&self, record: &SecretRecord) -> Result<String> {
        self.decrypt_utf8(&record.secret_ciphertext)
    }

    fn decrypt_utf8(&self, ciphertext: &[u8]) -> Result<String> {
        let plaintext_bytes = self.encryption.decrypt(ciphertext)?;

        // On error, zeroize the bytes inside the error before discarding.
        String::from_utf8(plaintext_bytes).map_err(|e| {
            let mut bad_bytes = e.into_bytes();
            bad_bytes.zeroize();
            CredVaultError::Serialization("secret value is not valid UTF-8".to_string())
        })
    }
}

// ----------------------------------------------------------------------
// Validation
// ----------------------------------------------------------------------

fn validate_owner(owner: &str) -> Result<()> {
    if owner.is_empty() {
        return Err(CredVaultError::Validation("owner id cannot be empty".into()));
    }
    if owner.len() > 128 {
        return Err(CredVaultError::Validation(
            "owner id cannot exceed 128 characters".into(),
        ));
    }
    Ok(())
}

fn validate_field(label: &str, value: &str, max_len: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CredVaultError::Validation(format!(
            "{label} cannot be empty"
        )));
    }
    if value.len() > max_len {
        return Err(CredVaultError::Validation(format!(
            "{label} cannot exceed {max_len} characters"
        )));
    }
    Ok(())
}

fn validate_secret(secret: &str) -> Result<()> {
    if secret.is_empty() {
        return Err(CredVaultError::Validation("secret cannot be empty".into()));
    }
    if secret.len() > 1024 {
        return Err(CredVaultError::Validation(
            "secret cannot exceed 1024 bytes".into(),
        ));
    }
    Ok(())
}
