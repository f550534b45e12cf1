//! Remediation sweeps — find and fix weak, reused, and breached records.
//!
//! A sweep is a collection of independent per-record units of work: one
//! record failing to rotate never aborts or rolls back the rest, and the
//! steady state of a partially failed batch is per-record outcomes, not
//! an error.  Sweeps are long-running and corpus-bound; hosts run them
//! on background workers, never on request-serving paths.
//!
//! Selection rules for one owner:
//! - every member of a duplicate group except its most recently updated
//!   record,
//! - records whose strength tier is weak or very weak,
//! - records flagged compromised by a breach sweep.
//!
//! Records that opted out of auto-remediation are surfaced as `skipped`
//! outcomes rather than silently ignored, so the audit trail shows why
//! a flagged record kept its secret.

pub mod rotator;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::breach::{BreachChecker, CorpusStatus};
use crate::crypto::generator::{generate_secret, GeneratorPolicy};
use crate::errors::{CredVaultError, Result};
use crate::store::models::{OutcomeAction, RemediationOutcome};
use crate::strength::StrengthTier;
use crate::vault::{SecretUpdate, SecretVault};

pub use rotator::{RotationResult, RotatorRegistry, SiteRotator};

/// Why a record was selected for remediation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CandidateReason {
    Duplicate,
    Weak,
    Compromised,
}

impl CandidateReason {
    fn describe(self) -> &'static str {
        match self {
            CandidateReason::Duplicate => "secret reused across sites",
            CandidateReason::Weak => "weak secret",
            CandidateReason::Compromised => "secret found in breach corpus",
        }
    }
}

/// Aggregate result of a breach sweep.  `unknown` counts checks the
/// corpus could not answer — degraded, not failed.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BreachSweepSummary {
    pub checked: usize,
    pub breached: usize,
    pub unknown: usize,
    pub failed: usize,
}

/// Orchestrates candidate selection, secret generation, live-site
/// rotation, and the outcome audit trail.
pub struct RemediationEngine<'a> {
    vault: &'a SecretVault,
    rotators: RotatorRegistry,
    policy: GeneratorPolicy,
}

impl<'a> RemediationEngine<'a> {
    /// Engine in manual-only mode (no site rotators) with the default
    /// generator policy.
    pub fn new(vault: &'a SecretVault) -> Self {
        Self {
            vault,
            rotators: RotatorRegistry::new(),
            policy: GeneratorPolicy::default(),
        }
    }

    /// Attach a per-site rotator registry.
    pub fn with_rotators(mut self, rotators: RotatorRegistry) -> Self {
        self.rotators = rotators;
        self
    }

    /// Override the replacement-secret policy.
    pub fn with_policy(mut self, policy: GeneratorPolicy) -> Self {
        self.policy = policy;
        self
    }

    // ------------------------------------------------------------------
    // Weak/reused/compromised sweep
    // ------------------------------------------------------------------

    /// Run a sweep for one owner, or for every owner with at least one
    /// auto-remediation record when `owner` is `None`.
    ///
    /// Idempotent: a second sweep with no intervening state change
    /// performs zero rotations, because the first one left every
    /// duplicate group with a single member and no record weak or
    /// compromised.
    pub fn sweep(&self, owner: Option<&str>) -> Result<Vec<RemediationOutcome>> {
        let owners = match owner {
            Some(o) => vec![o.to_string()],
            None => self.vault.store().owners_for_sweep()?,
        };

        let mut outcomes = Vec::new();
        for owner in &owners {
            outcomes.extend(self.sweep_owner(owner)?);
        }

        info!(
            owners = owners.len(),
            outcomes = outcomes.len(),
            "remediation sweep finished"
        );
        Ok(outcomes)
    }

    fn sweep_owner(&self, owner: &str) -> Result<Vec<RemediationOutcome>> {
        let store = self.vault.store();

        // Candidate selection.  BTreeMap for deterministic processing
        // order; the compromised reason wins over the others.
        let mut candidates: BTreeMap<i64, CandidateReason> = BTreeMap::new();

        for group_id in store.duplicate_group_ids(owner)? {
            let members = store.records_in_group(owner, group_id)?;
            // members are ordered most recently updated first — that one
            // keeps its secret, the rest rotate.
            for record in members.iter().skip(1) {
                candidates
                    .entry(record.id)
                    .or_insert(CandidateReason::Duplicate);
            }
        }

        for record in store.list_records(owner)? {
            if record.compromised {
                candidates.insert(record.id, CandidateReason::Compromised);
            } else if record.auto_remediate
                && StrengthTier::from_score(record.strength_score).needs_remediation()
            {
                candidates.entry(record.id).or_insert(CandidateReason::Weak);
            }
        }

        let mut outcomes = Vec::with_capacity(candidates.len());
        for (record_id, reason) in candidates {
            outcomes.push(self.remediate_record(owner, record_id, reason)?);
        }
        Ok(outcomes)
    }

    /// One unit of work.  Record-level failures become `failed` outcomes;
    /// only outcome-persistence errors propagate.
    fn remediate_record(
        &self,
        owner: &str,
        record_id: i64,
        reason: CandidateReason,
    ) -> Result<RemediationOutcome> {
        let store = self.vault.store();

        let record = match store.record(owner, record_id) {
            Ok(record) => record,
            Err(CredVaultError::RecordNotFound(_)) => {
                return store.append_outcome(
                    owner,
                    record_id,
                    OutcomeAction::Skipped,
                    Some("record removed during sweep"),
                    None,
                    None,
                );
            }
            Err(e) => return Err(e),
        };

        if !record.auto_remediate {
            return store.append_outcome(
                owner,
                record_id,
                OutcomeAction::Skipped,
                Some(&format!("{}; auto-remediation disabled", reason.describe())),
                Some(record.strength_score),
                None,
            );
        }

        let old_score = record.strength_score;

        let new_secret = match generate_secret(&self.policy) {
            Ok(secret) => secret,
            Err(e) => {
                warn!(record_id, error = %e, "replacement secret generation failed");
                return store.append_outcome(
                    owner,
                    record_id,
                    OutcomeAction::Failed,
                    Some("replacement secret generation failed"),
                    Some(old_score),
                    None,
                );
            }
        };

        // Live-site rotation comes first: if the real site rejects the
        // change, the local record must stay exactly as it was.
        let mut confirmed_on_site = false;
        if let Some(site_rotator) = self.rotators.rotator_for(&record.site_name) {
            match site_rotator.rotate(&record, &new_secret) {
                RotationResult::Success => confirmed_on_site = true,
                RotationResult::Failure(why) => {
                    warn!(record_id, site = %record.site_name, "site rotation failed");
                    return store.append_outcome(
                        owner,
                        record_id,
                        OutcomeAction::Failed,
                        Some(&format!("site rotation failed: {why}")),
                        Some(old_score),
                        None,
                    );
                }
            }
        }

        let update = SecretUpdate {
            expected_version: record.version,
            secret: Some(new_secret),
            ..SecretUpdate::default()
        };

        match self.vault.update_record(owner, record_id, update) {
            Ok(updated) => {
                info!(record_id, "rotated record secret");
                let mut note = reason.describe().to_string();
                if confirmed_on_site {
                    note.push_str("; confirmed on site");
                }
                store.append_outcome(
                    owner,
                    record_id,
                    OutcomeAction::Rotated,
                    Some(&note),
                    Some(old_score),
                    Some(updated.strength_score),
                )
            }
            Err(CredVaultError::ConcurrencyConflict(_)) => store.append_outcome(
                owner,
                record_id,
                OutcomeAction::Failed,
                Some("concurrent modification during rotation"),
                Some(old_score),
                None,
            ),
            Err(e) => {
                warn!(record_id, error = %e, "local rotation failed");
                store.append_outcome(
                    owner,
                    record_id,
                    OutcomeAction::Failed,
                    Some(&format!("rotation error: {e}")),
                    Some(old_score),
                    None,
                )
            }
        }
    }

    // ------------------------------------------------------------------
    // Breach sweep
    // ------------------------------------------------------------------

    /// Check every record's current secret against the breach corpus and
    /// flag hits as compromised.  `Unknown` answers flag nothing; they
    /// are only counted, so a corpus outage degrades instead of failing
    /// the sweep.
    pub fn breach_sweep(
        &self,
        checker: &BreachChecker,
        owner: Option<&str>,
    ) -> Result<BreachSweepSummary> {
        let store = self.vault.store();
        let owners = match owner {
            Some(o) => vec![o.to_string()],
            None => store.owners_for_sweep()?,
        };

        let mut summary = BreachSweepSummary::default();
        for owner in &owners {
            for record in store.list_records(owner)? {
                let plaintext = match self.vault.decrypt_secret(&record) {
                    Ok(plaintext) => plaintext,
                    Err(e) => {
                        warn!(record_id = record.id, error = %e, "breach sweep skipping record");
                        summary.failed += 1;
                        continue;
                    }
                };

                let report = checker.check(&plaintext)?;
                summary.checked += 1;

                match report.status {
                    CorpusStatus::Unknown => summary.unknown += 1,
                    CorpusStatus::Ok if report.breached => {
                        store.set_compromised(owner, record.id, true)?;
                        summary.breached += 1;
                    }
                    CorpusStatus::Ok => {}
                }
            }
        }

        info!(
            checked = summary.checked,
            breached = summary.breached,
            unknown = summary.unknown,
            "breach sweep finished"
        );
        Ok(summary)
    }
}
