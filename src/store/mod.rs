//! SQLite-backed persistence for records, groups, and outcomes.
//!
//! This module provides:
//! - `Store`, the connection handle with owner-scoped record CRUD
//! - group lifecycle and reuse queries (`groups`)
//! - the append-only remediation audit trail (`outcomes`)
//! - versioned schema migrations (`migrations`)
//!
//! Every query is owner-scoped: no record or group is ever visible to,
//! or mutable by, another owner.  Mutations of existing records carry an
//! optimistic version check — a writer that raced and lost gets
//! `ConcurrencyConflict` and is expected to reload and retry.

pub mod groups;
pub mod migrations;
pub mod models;
pub mod outcomes;

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::errors::{CredVaultError, Result};
use self::models::{EncryptedRecord, SecretRecord};

/// Column list shared by every record SELECT, in `record_from_row` order.
const RECORD_COLUMNS: &str = "id, owner_id, site_name, site_url, account_name, \
     secret_ciphertext, notes_ciphertext, group_id, strength_score, \
     compromised, auto_remediate, version, created_at, updated_at, accessed_at";

/// Persistent store.  All access is serialized behind one connection;
/// request-path operations are short and CPU-bound, so contention stays
/// low.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at `path` and run pending
    /// migrations.
    pub fn open(path: &Path) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migrations::run(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests and ephemeral tooling.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migrations::run(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        f(&conn)
    }

    pub(crate) fn with_tx<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    // ------------------------------------------------------------------
    // Record CRUD
    // ------------------------------------------------------------------

    /// Insert a new record for `owner` and return the stored row.  The
    /// record joins (or creates) the group matching its fingerprint in
    /// the same transaction.
    pub fn insert_record(&self, owner: &str, record: EncryptedRecord) -> Result<SecretRecord> {
        self.with_tx(|tx| {
            let group_id = groups::resolve_group(tx, owner, &record.fingerprint)?;
            let now = Utc::now().to_rfc3339();
            tx.execute(
                "INSERT INTO secret_records
                     (owner_id, site_name, site_url, account_name,
                      secret_ciphertext, notes_ciphertext, group_id,
                      strength_score, auto_remediate, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                params![
                    owner,
                    record.site_name,
                    record.site_url,
                    record.account_name,
                    record.secret_ciphertext,
                    record.notes_ciphertext,
                    group_id,
                    i64::from(record.strength_score),
                    record.auto_remediate,
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();
            get_record(tx, owner, id)
        })
    }

    /// Fetch one record by id, scoped to `owner`.
    pub fn record(&self, owner: &str, id: i64) -> Result<SecretRecord> {
        self.with_conn(|conn| get_record(conn, owner, id))
    }

    /// All of `owner`'s records, ordered by site name.
    pub fn list_records(&self, owner: &str) -> Result<Vec<SecretRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM secret_records
                 WHERE owner_id = ?1 ORDER BY site_name, id"
            ))?;
            let rows = stmt.query_map(params![owner], record_from_row)?;
            collect_records(rows)
        })
    }

    /// Members of one group, most recently updated first.
    pub fn records_in_group(&self, owner: &str, group_id: i64) -> Result<Vec<SecretRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM secret_records
                 WHERE owner_id = ?1 AND group_id = ?2
                 ORDER BY updated_at DESC, id DESC"
            ))?;
            let rows = stmt.query_map(params![owner, group_id], record_from_row)?;
            collect_records(rows)
        })
    }

    /// Replace a record's descriptive fields.  `expected_version` is the
    /// version the caller last read; a mismatch means another writer got
    /// there first.
    pub fn update_metadata(
        &self,
        owner: &str,
        id: i64,
        expected_version: i64,
        site_name: &str,
        site_url: Option<&str>,
        account_name: &str,
        notes_ciphertext: Option<&[u8]>,
    ) -> Result<SecretRecord> {
        self.with_tx(|tx| {
            let changed = tx.execute(
                "UPDATE secret_records
                 SET site_name = ?1, site_url = ?2, account_name = ?3,
                     notes_ciphertext = ?4, version = version + 1, updated_at = ?5
                 WHERE id = ?6 AND owner_id = ?7 AND version = ?8",
                params![
                    site_name,
                    site_url,
                    account_name,
                    notes_ciphertext,
                    Utc::now().to_rfc3339(),
                    id,
                    owner,
                    expected_version,
                ],
            )?;
            ensure_updated(tx, owner, id, changed)?;
            get_record(tx, owner, id)
        })
    }

    /// Install a new secret ciphertext, re-group the record by its new
    /// fingerprint, refresh its score, and clear the compromised flag —
    /// one atomic step.  The previous group is deleted if the move
    /// emptied it.
    pub fn update_secret(
        &self,
        owner: &str,
        id: i64,
        expected_version: i64,
        ciphertext: &[u8],
        fingerprint: &str,
        strength_score: u8,
    ) -> Result<SecretRecord> {
        self.with_tx(|tx| {
            let old_group: i64 = tx
                .query_row(
                    "SELECT group_id FROM secret_records WHERE id = ?1 AND owner_id = ?2",
                    params![id, owner],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or(CredVaultError::RecordNotFound(id))?;

            let new_group = groups::resolve_group(tx, owner, fingerprint)?;

            let changed = tx.execute(
                "UPDATE secret_records
                 SET secret_ciphertext = ?1, group_id = ?2, strength_score = ?3,
                     compromised = 0, version = version + 1, updated_at = ?4
                 WHERE id = ?5 AND owner_id = ?6 AND version = ?7",
                params![
                    ciphertext,
                    new_group,
                    i64::from(strength_score),
                    Utc::now().to_rfc3339(),
                    id,
                    owner,
                    expected_version,
                ],
            )?;
            ensure_updated(tx, owner, id, changed)?;

            if old_group != new_group {
                groups::prune_group(tx, old_group)?;
            }
            get_record(tx, owner, id)
        })
    }

    /// Record that the secret was just revealed.  Monotonic read-path
    /// metadata: no version bump, never conflicts with writers.
    pub fn touch_accessed(&self, owner: &str, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE secret_records SET accessed_at = ?1
                 WHERE id = ?2 AND owner_id = ?3",
                params![Utc::now().to_rfc3339(), id, owner],
            )?;
            Ok(())
        })
    }

    /// Set or clear the compromised flag.
    pub fn set_compromised(&self, owner: &str, id: i64, compromised: bool) -> Result<()> {
        self.flag_update(owner, id, "compromised", compromised)
    }

    /// Enable or disable automatic remediation for one record.
    pub fn set_auto_remediate(&self, owner: &str, id: i64, enabled: bool) -> Result<()> {
        self.flag_update(owner, id, "auto_remediate", enabled)
    }

    fn flag_update(&self, owner: &str, id: i64, column: &str, value: bool) -> Result<()> {
        self.with_conn(|conn| {
            // `column` is one of two compile-time literals, never input.
            let changed = conn.execute(
                &format!(
                    "UPDATE secret_records
                     SET {column} = ?1, version = version + 1, updated_at = ?2
                     WHERE id = ?3 AND owner_id = ?4"
                ),
                params![value, Utc::now().to_rfc3339(), id, owner],
            )?;
            if changed == 0 {
                return Err(CredVaultError::RecordNotFound(id));
            }
            Ok(())
        })
    }

    /// Delete one record, pruning its group if it was the last member.
    pub fn delete_record(&self, owner: &str, id: i64) -> Result<()> {
        self.with_tx(|tx| {
            let group_id: i64 = tx
                .query_row(
                    "SELECT group_id FROM secret_records WHERE id = ?1 AND owner_id = ?2",
                    params![id, owner],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or(CredVaultError::RecordNotFound(id))?;

            tx.execute(
                "DELETE FROM secret_records WHERE id = ?1 AND owner_id = ?2",
                params![id, owner],
            )?;
            groups::prune_group(tx, group_id)?;
            Ok(())
        })
    }

    /// Cascading owner deletion: every record and group goes; the
    /// outcome audit trail is retained.
    pub fn delete_owner(&self, owner: &str) -> Result<usize> {
        self.with_tx(|tx| {
            let records = tx.execute(
                "DELETE FROM secret_records WHERE owner_id = ?1",
                params![owner],
            )?;
            tx.execute(
                "DELETE FROM secret_groups WHERE owner_id = ?1",
                params![owner],
            )?;
            Ok(records)
        })
    }

    /// Owners with at least one record opted into automatic remediation.
    pub fn owners_for_sweep(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT owner_id FROM secret_records
                 WHERE auto_remediate = 1 ORDER BY owner_id",
            )?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut owners = Vec::new();
            for row in rows {
                owners.push(row?);
            }
            Ok(owners)
        })
    }

    /// Number of records held by `owner` (test and dashboard helper).
    pub fn record_count(&self, owner: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM secret_records WHERE owner_id = ?1",
                params![owner],
                |row| row.get(0),
            )?)
        })
    }
}

// ----------------------------------------------------------------------
// Row mapping helpers
// ----------------------------------------------------------------------

fn get_record(conn: &Connection, owner: &str, id: i64) -> Result<SecretRecord> {
    conn.query_row(
        &format!("SELECT {RECORD_COLUMNS} FROM secret_records WHERE id = ?1 AND owner_id = ?2"),
        params![id, owner],
        record_from_row,
    )
    .optional()?
    .ok_or(CredVaultError::RecordNotFound(id))
}

/// Distinguish "gone" from "raced": an UPDATE with a version guard that
/// touched no rows means one or the other.
fn ensure_updated(conn: &Connection, owner: &str, id: i64, changed: usize) -> Result<()> {
    if changed > 0 {
        return Ok(());
    }
    let exists: Option<i64> = conn
        .query_row(
            "SELECT id FROM secret_records WHERE id = ?1 AND owner_id = ?2",
            params![id, owner],
            |row| row.get(0),
        )
        .optional()?;
    match exists {
        Some(_) => Err(CredVaultError::ConcurrencyConflict(id)),
        None => Err(CredVaultError::RecordNotFound(id)),
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<SecretRecord> {
    Ok(SecretRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        site_name: row.get(2)?,
        site_url: row.get(3)?,
        account_name: row.get(4)?,
        secret_ciphertext: row.get(5)?,
        notes_ciphertext: row.get(6)?,
        group_id: row.get(7)?,
        strength_score: row.get::<_, i64>(8)?.clamp(0, 100) as u8,
        compromised: row.get(9)?,
        auto_remediate: row.get(10)?,
        version: row.get(11)?,
        created_at: parse_timestamp(&row.get::<_, String>(12)?),
        updated_at: parse_timestamp(&row.get::<_, String>(13)?),
        accessed_at: row
            .get::<_, Option<String>>(14)?
            .map(|ts| parse_timestamp(&ts)),
    })
}

fn collect_records(
    rows: impl Iterator<Item = rusqlite::Result<SecretRecord>>,
) -> Result<Vec<SecretRecord>> {
    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

/// RFC 3339 parse with a "now" fallback for rows written by hand.
pub(crate) fn parse_timestamp(ts: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(ts).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
