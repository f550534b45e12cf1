//! Integration tests for the vault facade: record CRUD, grouping
//! invariants, concurrency checks, and tenant isolation.

use std::sync::Arc;

use credvault::crypto::keys::KEY_LEN;
use credvault::{
    CredVaultError, MasterKey, NewSecretRecord, SecretUpdate, SecretVault, Store,
};

const OWNER: &str = "owner-1";

/// Helper: fresh in-memory vault.
fn vault() -> SecretVault {
    let store = Arc::new(Store::open_in_memory().expect("open store"));
    SecretVault::new(store, &MasterKey::new([0x42u8; KEY_LEN])).expect("build vault")
}

// ---------------------------------------------------------------------------
// Create and reveal round-trip
// ---------------------------------------------------------------------------

#[test]
fn create_and_reveal_roundtrip() {
    let vault = vault();

    let record = vault
        .create_record(OWNER, NewSecretRecord::new("Example", "alice", "kV9#mQ2xT$bL"))
        .expect("create record");

    assert_eq!(record.owner_id, OWNER);
    assert_eq!(record.site_name, "Example");
    assert_eq!(record.version, 1);
    assert!(!record.compromised);
    assert!(record.accessed_at.is_none());

    // The stored ciphertext must not contain the plaintext.
    assert!(!record
        .secret_ciphertext
        .windows(12)
        .any(|w| w == b"kV9#mQ2xT$bL"));

    let revealed = vault.reveal_secret(OWNER, record.id).expect("reveal");
    assert_eq!(revealed, "kV9#mQ2xT$bL");

    // Revealing records the access time.
    let after = vault.record(OWNER, record.id).unwrap();
    assert!(after.accessed_at.is_some());
}

#[test]
fn notes_are_encrypted_and_revealable() {
    let vault = vault();

    let record = vault
        .create_record(
            OWNER,
            NewSecretRecord {
                notes: Some("recovery codes in the safe".to_string()),
                ..NewSecretRecord::new("Example", "alice", "kV9#mQ2xT$bL")
            },
        )
        .unwrap();

    assert!(record.notes_ciphertext.is_some());
    let notes = vault.reveal_notes(OWNER, record.id).unwrap();
    assert_eq!(notes.as_deref(), Some("recovery codes in the safe"));

    let bare = vault
        .create_record(OWNER, NewSecretRecord::new("Other", "alice", "xW3@pLq9ZrT+"))
        .unwrap();
    assert!(vault.reveal_notes(OWNER, bare.id).unwrap().is_none());
}

#[test]
fn strength_score_is_denormalized_on_create() {
    let vault = vault();

    let weak = vault
        .create_record(OWNER, NewSecretRecord::new("Weak Site", "alice", "abc123"))
        .unwrap();
    let strong = vault
        .create_record(
            OWNER,
            NewSecretRecord::new("Strong Site", "alice", "kV9#mQ2xT$bL7wRz@5dH"),
        )
        .unwrap();

    assert!(weak.strength_score < 20);
    assert!(strong.strength_score >= 80);
}

// ---------------------------------------------------------------------------
// Grouping partition invariant
// ---------------------------------------------------------------------------

#[test]
fn equal_plaintext_means_equal_group() {
    let vault = vault();

    let r1 = vault
        .create_record(OWNER, NewSecretRecord::new("Site 1", "a", "shared-pw-One1!"))
        .unwrap();
    let r2 = vault
        .create_record(OWNER, NewSecretRecord::new("Site 2", "b", "shared-pw-One1!"))
        .unwrap();
    let r3 = vault
        .create_record(OWNER, NewSecretRecord::new("Site 3", "c", "different-pw-Two2!"))
        .unwrap();

    assert_eq!(r1.group_id, r2.group_id);
    assert_ne!(r1.group_id, r3.group_id);
}

#[test]
fn secret_change_regroups_and_prunes_empty_groups() {
    let vault = vault();
    let store = vault.store();

    let r1 = vault
        .create_record(OWNER, NewSecretRecord::new("Site 1", "a", "shared-pw-One1!"))
        .unwrap();
    let r2 = vault
        .create_record(OWNER, NewSecretRecord::new("Site 2", "b", "shared-pw-One1!"))
        .unwrap();
    let r3 = vault
        .create_record(OWNER, NewSecretRecord::new("Site 3", "c", "different-pw-Two2!"))
        .unwrap();

    // Move r2 onto r3's secret: it must join r3's group, and the shared
    // group must survive because r1 still uses it.
    let r2 = vault
        .update_record(
            OWNER,
            r2.id,
            SecretUpdate {
                expected_version: r2.version,
                secret: Some("different-pw-Two2!".to_string()),
                ..SecretUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(r2.group_id, r3.group_id);
    assert_eq!(store.group_count(OWNER).unwrap(), 2);
    assert_eq!(store.empty_group_count(OWNER).unwrap(), 0);

    // Move r1 to a fresh secret: its old group is now empty and must go.
    let r1 = vault
        .update_record(
            OWNER,
            r1.id,
            SecretUpdate {
                expected_version: r1.version,
                secret: Some("brand-new-pw-Three3!".to_string()),
                ..SecretUpdate::default()
            },
        )
        .unwrap();
    assert_ne!(r1.group_id, r3.group_id);
    assert_eq!(store.group_count(OWNER).unwrap(), 2);
    assert_eq!(store.empty_group_count(OWNER).unwrap(), 0);
}

#[test]
fn deleting_last_member_prunes_group() {
    let vault = vault();
    let store = vault.store();

    let record = vault
        .create_record(OWNER, NewSecretRecord::new("Solo", "a", "solo-pw-Xy7$"))
        .unwrap();
    assert_eq!(store.group_count(OWNER).unwrap(), 1);

    vault.delete_record(OWNER, record.id).unwrap();
    assert_eq!(store.group_count(OWNER).unwrap(), 0);
    assert!(matches!(
        vault.record(OWNER, record.id),
        Err(CredVaultError::RecordNotFound(_))
    ));
}

#[test]
fn duplicate_groups_reports_only_shared_secrets() {
    let vault = vault();

    vault
        .create_record(OWNER, NewSecretRecord::new("Site A", "a", "shared-pw-One1!"))
        .unwrap();
    vault
        .create_record(OWNER, NewSecretRecord::new("Site B", "b", "shared-pw-One1!"))
        .unwrap();
    vault
        .create_record(OWNER, NewSecretRecord::new("Site C", "c", "unique-pw-Two2!"))
        .unwrap();

    let duplicates = vault.duplicate_groups(OWNER).unwrap();
    assert_eq!(duplicates.len(), 1);

    let mut sites = duplicates[0].site_identities.clone();
    sites.sort();
    assert_eq!(sites, vec!["Site A", "Site B"]);
}

// ---------------------------------------------------------------------------
// Optimistic concurrency
// ---------------------------------------------------------------------------

#[test]
fn stale_version_is_rejected() {
    let vault = vault();

    let record = vault
        .create_record(OWNER, NewSecretRecord::new("Example", "alice", "first-pw-Aa1!"))
        .unwrap();

    // First writer wins.
    vault
        .update_record(
            OWNER,
            record.id,
            SecretUpdate {
                expected_version: record.version,
                secret: Some("second-pw-Bb2@".to_string()),
                ..SecretUpdate::default()
            },
        )
        .expect("first writer");

    // Second writer raced on the same starting version and must lose.
    let result = vault.update_record(
        OWNER,
        record.id,
        SecretUpdate {
            expected_version: record.version,
            secret: Some("third-pw-Cc3#".to_string()),
            ..SecretUpdate::default()
        },
    );
    assert!(matches!(
        result,
        Err(CredVaultError::ConcurrencyConflict(id)) if id == record.id
    ));

    // The losing writer changed nothing.
    assert_eq!(
        vault.reveal_secret(OWNER, record.id).unwrap(),
        "second-pw-Bb2@"
    );
}

#[test]
fn metadata_update_bumps_version() {
    let vault = vault();

    let record = vault
        .create_record(OWNER, NewSecretRecord::new("Example", "alice", "some-pw-Dd4$"))
        .unwrap();

    let updated = vault
        .update_record(
            OWNER,
            record.id,
            SecretUpdate {
                expected_version: record.version,
                account_name: Some("alice@example.com".to_string()),
                site_url: Some("https://example.com".to_string()),
                ..SecretUpdate::default()
            },
        )
        .unwrap();

    assert_eq!(updated.version, record.version + 1);
    assert_eq!(updated.account_name, "alice@example.com");
    assert_eq!(updated.site_url.as_deref(), Some("https://example.com"));
    // Secret untouched.
    assert_eq!(vault.reveal_secret(OWNER, record.id).unwrap(), "some-pw-Dd4$");
}

// ---------------------------------------------------------------------------
// Tenant isolation
// ---------------------------------------------------------------------------

#[test]
fn owners_cannot_see_each_other() {
    let vault = vault();

    let mine = vault
        .create_record(OWNER, NewSecretRecord::new("Example", "alice", "shared-pw-One1!"))
        .unwrap();
    let theirs = vault
        .create_record("owner-2", NewSecretRecord::new("Example", "bob", "shared-pw-One1!"))
        .unwrap();

    // Same plaintext, different owners: never the same group.
    assert_ne!(mine.group_id, theirs.group_id);

    // Cross-owner reads and writes fail as not-found.
    assert!(matches!(
        vault.record("owner-2", mine.id),
        Err(CredVaultError::RecordNotFound(_))
    ));
    assert!(matches!(
        vault.delete_record("owner-2", mine.id),
        Err(CredVaultError::RecordNotFound(_))
    ));

    // Reuse detection never crosses the tenant boundary.
    assert!(vault.duplicate_groups(OWNER).unwrap().is_empty());
    assert!(vault.duplicate_groups("owner-2").unwrap().is_empty());
}

#[test]
fn delete_owner_cascades_records_and_groups() {
    let vault = vault();
    let store = vault.store();

    vault
        .create_record(OWNER, NewSecretRecord::new("Site 1", "a", "pw-one-Aa1!"))
        .unwrap();
    vault
        .create_record(OWNER, NewSecretRecord::new("Site 2", "b", "pw-two-Bb2@"))
        .unwrap();
    let keep = vault
        .create_record("owner-2", NewSecretRecord::new("Site 3", "c", "pw-three-Cc3#"))
        .unwrap();

    let deleted = vault.delete_owner(OWNER).unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(store.record_count(OWNER).unwrap(), 0);
    assert_eq!(store.group_count(OWNER).unwrap(), 0);

    // The other owner is untouched.
    assert!(vault.record("owner-2", keep.id).is_ok());
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn malformed_input_is_rejected_up_front() {
    let vault = vault();

    let empty_site = vault.create_record(OWNER, NewSecretRecord::new("", "alice", "pw-Aa1!x"));
    assert!(matches!(empty_site, Err(CredVaultError::Validation(_))));

    let empty_secret = vault.create_record(OWNER, NewSecretRecord::new("Example", "alice", ""));
    assert!(matches!(empty_secret, Err(CredVaultError::Validation(_))));

    let empty_owner = vault.create_record("", NewSecretRecord::new("Example", "alice", "pw-Aa1!x"));
    assert!(matches!(empty_owner, Err(CredVaultError::Validation(_))));

    let oversized = vault.create_record(
        OWNER,
        NewSecretRecord::new("Example", "alice", &"x".repeat(2000)),
    );
    assert!(matches!(oversized, Err(CredVaultError::Validation(_))));
}
