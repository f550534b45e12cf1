//! Versioned schema migrations, tracked with `PRAGMA user_version`.
//!
//! Each entry runs in its own transaction; the pragma is bumped with the
//! batch so a crash mid-migration leaves the database on the previous
//! version.  Columns added after v1 are nullable-with-default so older
//! rows read back cleanly — schema changes happen here, never as
//! compatibility shims in query code.

use rusqlite::Connection;

use crate::errors::Result;

/// Ordered migration batches.  `user_version` after applying batch `i`
/// is `i + 1`.  Never reorder or edit a shipped entry — append.
const MIGRATIONS: &[&str] = &[
    // v1: records, groups, and the append-only remediation audit trail.
    //
    // `remediation_outcomes.record_id` references records by id without
    // an enforced FK: audit rows outlive the records they describe.
    "CREATE TABLE secret_groups (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id    TEXT NOT NULL,
        fingerprint TEXT NOT NULL,
        created_at  TEXT NOT NULL,
        UNIQUE (owner_id, fingerprint)
    );
    CREATE TABLE secret_records (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id          TEXT NOT NULL,
        site_name         TEXT NOT NULL,
        site_url          TEXT,
        account_name      TEXT NOT NULL,
        secret_ciphertext BLOB NOT NULL,
        notes_ciphertext  BLOB,
        group_id          INTEGER NOT NULL REFERENCES secret_groups (id),
        strength_score    INTEGER NOT NULL,
        compromised       INTEGER NOT NULL DEFAULT 0,
        auto_remediate    INTEGER NOT NULL DEFAULT 1,
        version           INTEGER NOT NULL DEFAULT 1,
        created_at        TEXT NOT NULL,
        updated_at        TEXT NOT NULL
    );
    CREATE INDEX idx_records_owner ON secret_records (owner_id);
    CREATE INDEX idx_records_group ON secret_records (group_id);
    CREATE TABLE remediation_outcomes (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        record_id  INTEGER NOT NULL,
        owner_id   TEXT NOT NULL,
        action     TEXT NOT NULL,
        reason     TEXT,
        old_score  INTEGER,
        new_score  INTEGER,
        created_at TEXT NOT NULL
    );
    CREATE INDEX idx_outcomes_owner ON remediation_outcomes (owner_id);",
    // v2: last-access tracking, nullable with no backfill.
    "ALTER TABLE secret_records ADD COLUMN accessed_at TEXT;",
];

/// Bring `conn` up to the latest schema version.
pub fn run(conn: &mut Connection) -> Result<()> {
    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    for (index, batch) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        let tx = conn.transaction()?;
        tx.execute_batch(batch)?;
        tx.pragma_update(None, "user_version", (index + 1) as i64)?;
        tx.commit()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reaches_latest_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        run(&mut conn).unwrap();

        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, MIGRATIONS.len() as i64);
    }

    #[test]
    fn run_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        run(&mut conn).unwrap();
        run(&mut conn).unwrap();

        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, MIGRATIONS.len() as i64);
    }

    #[test]
    fn v2_column_is_nullable() {
        let mut conn = Connection::open_in_memory().unwrap();
        run(&mut conn).unwrap();

        // A row inserted without accessed_at must read back as NULL.
        conn.execute(
            "INSERT INTO secret_groups (owner_id, fingerprint, created_at)
             VALUES ('o', 'fp', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO secret_records
                 (owner_id, site_name, account_name, secret_ciphertext,
                  group_id, strength_score, created_at, updated_at)
             VALUES ('o', 's', 'a', x'00', 1, 50,
                     '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        let accessed: Option<String> = conn
            .query_row("SELECT accessed_at FROM secret_records", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert!(accessed.is_none());
    }
}
