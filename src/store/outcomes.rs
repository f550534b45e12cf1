//! Append-only remediation audit trail.
//!
//! Rows are inserted once and never updated; they reference records by
//! id but deliberately survive record and owner deletion, so the history
//! of what the remediation engine did stays reconstructible.

use chrono::Utc;
use rusqlite::{params, Row};

use crate::errors::Result;

use super::models::{OutcomeAction, RemediationOutcome};
use super::{parse_timestamp, Store};

impl Store {
    /// Append one outcome row and return it as stored.
    pub fn append_outcome(
        &self,
        owner: &str,
        record_id: i64,
        action: OutcomeAction,
        reason: Option<&str>,
        old_score: Option<u8>,
        new_score: Option<u8>,
    ) -> Result<RemediationOutcome> {
        self.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO remediation_outcomes
                     (record_id, owner_id, action, reason, old_score, new_score, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record_id,
                    owner,
                    action.as_str(),
                    reason,
                    old_score.map(i64::from),
                    new_score.map(i64::from),
                    now,
                ],
            )?;

            let id = conn.last_insert_rowid();
            Ok(conn.query_row(
                "SELECT id, record_id, owner_id, action, reason, old_score, new_score, created_at
                 FROM remediation_outcomes WHERE id = ?1",
                params![id],
                outcome_from_row,
            )?)
        })
    }

    /// Query recent outcomes for `owner`, most recent first.
    pub fn outcomes_for(&self, owner: &str, limit: usize) -> Result<Vec<RemediationOutcome>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, record_id, owner_id, action, reason, old_score, new_score, created_at
                 FROM remediation_outcomes
                 WHERE owner_id = ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )?;
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            let rows = stmt.query_map(params![owner, limit], outcome_from_row)?;

            let mut outcomes = Vec::new();
            for row in rows {
                outcomes.push(row?);
            }
            Ok(outcomes)
        })
    }
}

fn outcome_from_row(row: &Row<'_>) -> rusqlite::Result<RemediationOutcome> {
    let action_str: String = row.get(3)?;
    Ok(RemediationOutcome {
        id: row.get(0)?,
        record_id: row.get(1)?,
        owner_id: row.get(2)?,
        // Unknown labels cannot appear: the column is only ever written
        // through OutcomeAction::as_str.  Treat corruption as Failed.
        action: OutcomeAction::from_str(&action_str).unwrap_or(OutcomeAction::Failed),
        reason: row.get(4)?,
        old_score: row.get::<_, Option<i64>>(5)?.map(|s| s.clamp(0, 100) as u8),
        new_score: row.get::<_, Option<i64>>(6)?.map(|s| s.clamp(0, 100) as u8),
        created_at: parse_timestamp(&row.get::<_, String>(7)?),
    })
}
