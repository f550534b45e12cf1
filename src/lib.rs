//! Credential vault core.
//!
//! Stores credentials (site identity, account name, secret value) encrypted
//! at rest, detects secret reuse across sites, scores secret strength,
//! checks secrets against a breach corpus via a k-anonymity range protocol,
//! and rotates weak/reused/breached secrets.
//!
//! The crate is the core behind an API layer that is not part of it: every
//! entry point takes an already-authenticated owner id and returns a
//! [`Result`](errors::Result). Hosts schedule [`remediation`] sweeps on
//! their own background workers and install their own `tracing` subscriber.

pub mod breach;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod remediation;
pub mod store;
pub mod strength;
pub mod vault;

// Re-export the types a host wires together at startup.
pub use breach::{BreachChecker, BreachReport, CorpusStatus, HttpCorpus};
pub use config::{RunMode, Settings};
pub use crypto::encryption::EncryptionContext;
pub use crypto::keys::MasterKey;
pub use errors::{CredVaultError, Result};
pub use remediation::{RemediationEngine, RotatorRegistry, SiteRotator};
pub use store::models::{DuplicateGroup, RemediationOutcome, SecretRecord};
pub use store::Store;
pub use strength::{analyze, StrengthReport, StrengthTier};
pub use vault::{NewSecretRecord, SecretUpdate, SecretVault};
