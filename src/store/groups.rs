//! Group lifecycle and reuse queries.
//!
//! A group exists exactly as long as it has at least one member record:
//! `group_for` find-or-creates on the `(owner_id, fingerprint)` unique
//! key, and every mutation that can empty a group calls `prune_group`
//! inside the same transaction.  Together these keep the invariant that
//! group membership partitions an owner's records by plaintext equality,
//! with no empty groups left behind.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::Result;

use super::models::{DuplicateGroup, SecretGroup};
use super::{parse_timestamp, Store};

impl Store {
    /// Find the group for `(owner, fingerprint)`, creating it if this is
    /// the first record to hold that plaintext.  Returns the group id.
    pub fn group_for(&self, owner: &str, fingerprint: &str) -> Result<i64> {
        self.with_conn(|conn| resolve_group(conn, owner, fingerprint))
    }

    /// Fetch one group row (scoped to its owner).
    pub fn group(&self, owner: &str, group_id: i64) -> Result<Option<SecretGroup>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, owner_id, fingerprint, created_at FROM secret_groups
                     WHERE id = ?1 AND owner_id = ?2",
                    params![group_id, owner],
                    |row| {
                        Ok(SecretGroup {
                            id: row.get(0)?,
                            owner_id: row.get(1)?,
                            fingerprint: row.get(2)?,
                            created_at: parse_timestamp(&row.get::<_, String>(3)?),
                        })
                    },
                )
                .optional()?)
        })
    }

    /// Ids of `owner`'s groups holding more than one record.
    pub fn duplicate_group_ids(&self, owner: &str) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT g.id
                 FROM secret_groups g
                 JOIN secret_records r ON r.group_id = g.id
                 WHERE g.owner_id = ?1
                 GROUP BY g.id
                 HAVING COUNT(r.id) > 1
                 ORDER BY g.id",
            )?;
            let rows = stmt.query_map(params![owner], |row| row.get::<_, i64>(0))?;
            let mut ids = Vec::new();
            for row in rows {
                ids.push(row?);
            }
            Ok(ids)
        })
    }

    /// Reuse report: every group of size > 1 with the site identities
    /// sharing the secret, most recently updated first.  Exposes group
    /// membership only — never the secret.
    pub fn duplicate_groups(&self, owner: &str) -> Result<Vec<DuplicateGroup>> {
        let ids = self.duplicate_group_ids(owner)?;

        let mut duplicates = Vec::with_capacity(ids.len());
        for group_id in ids {
            let site_identities = self
                .records_in_group(owner, group_id)?
                .into_iter()
                .map(|r| r.site_name)
                .collect();
            duplicates.push(DuplicateGroup {
                group_id,
                site_identities,
            });
        }
        Ok(duplicates)
    }

    /// Number of groups held by `owner` (invariant checks in tests).
    pub fn group_count(&self, owner: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM secret_groups WHERE owner_id = ?1",
                params![owner],
                |row| row.get(0),
            )?)
        })
    }

    /// Number of groups with zero members — always 0 when the pruning
    /// discipline holds.
    pub fn empty_group_count(&self, owner: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM secret_groups g
                 WHERE g.owner_id = ?1
                   AND NOT EXISTS (SELECT 1 FROM secret_records r WHERE r.group_id = g.id)",
                params![owner],
                |row| row.get(0),
            )?)
        })
    }
}

/// Find-or-create the group row for `(owner, fingerprint)`.  Runs inside
/// the caller's transaction so a record mutation and its group resolution
/// commit (or roll back) together.
pub(crate) fn resolve_group(conn: &Connection, owner: &str, fingerprint: &str) -> Result<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM secret_groups
             WHERE owner_id = ?1 AND fingerprint = ?2",
            params![owner, fingerprint],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO secret_groups (owner_id, fingerprint, created_at)
         VALUES (?1, ?2, ?3)",
        params![owner, fingerprint, Utc::now().to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Delete `group_id` if no record references it any more.  Called inside
/// the transaction of whatever mutation may have emptied the group.
pub(crate) fn prune_group(conn: &Connection, group_id: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM secret_groups
         WHERE id = ?1
           AND NOT EXISTS (SELECT 1 FROM secret_records WHERE group_id = ?1)",
        params![group_id],
    )?;
    Ok(())
}
