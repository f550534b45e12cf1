//! Row types for the record, group, and outcome tables.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One stored credential.  Secret and notes are held only as ciphertext;
/// plaintext exists transiently in the vault facade.
#[derive(Debug, Clone)]
pub struct SecretRecord {
    pub id: i64,
    /// Opaque owner id supplied by the (external) auth layer.
    pub owner_id: String,
    /// Site identity: display name plus optional URL.
    pub site_name: String,
    pub site_url: Option<String>,
    pub account_name: String,
    /// AES-256-GCM output, nonce-prefixed.
    pub secret_ciphertext: Vec<u8>,
    pub notes_ciphertext: Option<Vec<u8>>,
    /// The group of records (for this owner) sharing this plaintext.
    pub group_id: i64,
    /// Denormalized strength score, 0–100.
    pub strength_score: u8,
    /// Set when a breach sweep found the secret in the corpus.
    pub compromised: bool,
    /// Whether the remediation engine may rotate this record.
    pub auto_remediate: bool,
    /// Optimistic-concurrency version, bumped on every mutation.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub accessed_at: Option<DateTime<Utc>>,
}

/// A set of one owner's records holding the identical plaintext secret.
#[derive(Debug, Clone)]
pub struct SecretGroup {
    pub id: i64,
    pub owner_id: String,
    /// Keyed, owner-scoped digest of the shared plaintext.
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
}

/// Reuse-detection result: one group with more than one member, exposing
/// only which sites share a secret — never the secret or fingerprint
/// preimage.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    pub group_id: i64,
    /// Site names of the member records, most recently updated first.
    pub site_identities: Vec<String>,
}

/// Fields the store needs to insert a record.  Everything sensitive
/// arrives already encrypted; the vault facade owns plaintext handling.
/// The group is resolved from `fingerprint` inside the insert
/// transaction, so a group can never outlive the statement that would
/// have populated it.
#[derive(Debug, Clone)]
pub struct EncryptedRecord {
    pub site_name: String,
    pub site_url: Option<String>,
    pub account_name: String,
    pub secret_ciphertext: Vec<u8>,
    pub notes_ciphertext: Option<Vec<u8>>,
    pub fingerprint: String,
    pub strength_score: u8,
    pub auto_remediate: bool,
}

/// What happened to one record during a remediation sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeAction {
    Rotated,
    Skipped,
    Failed,
}

impl OutcomeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeAction::Rotated => "rotated",
            OutcomeAction::Skipped => "skipped",
            OutcomeAction::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "rotated" => Some(OutcomeAction::Rotated),
            "skipped" => Some(OutcomeAction::Skipped),
            "failed" => Some(OutcomeAction::Failed),
            _ => None,
        }
    }
}

/// Append-only audit row for one remediation attempt.  Rows are never
/// edited after insert and survive record deletion.
#[derive(Debug, Clone, Serialize)]
pub struct RemediationOutcome {
    pub id: i64,
    pub record_id: i64,
    pub owner_id: String,
    pub action: OutcomeAction,
    /// Why the record was selected, why it was skipped, or why the
    /// rotation failed.
    pub reason: Option<String>,
    pub old_score: Option<u8>,
    pub new_score: Option<u8>,
    pub created_at: DateTime<Utc>,
}
