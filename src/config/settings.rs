use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::breach::BreachChecker;
use crate::crypto::generator::GeneratorPolicy;
use crate::crypto::keys::MasterKey;
use crate::errors::{CredVaultError, Result};
use crate::store::Store;

/// How the process treats a missing master key at startup.
///
/// In `Production` a missing key is fatal. In `Development` a throwaway
/// key is generated with a loud warning — data encrypted under it is
/// unrecoverable after a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Production,
    Development,
}

/// Process-level configuration, loaded from `credvault.toml`.
///
/// Every field has a sensible default so the crate works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Run mode (default: development).
    #[serde(default = "default_mode")]
    pub mode: RunMode,

    /// Environment variable holding the base64-encoded 32-byte master key.
    #[serde(default = "default_master_key_env")]
    pub master_key_env: String,

    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Base URL of the breach corpus range endpoint.
    #[serde(default = "default_breach_corpus_url")]
    pub breach_corpus_url: String,

    /// Timeout for breach corpus requests, in seconds (default: 5).
    #[serde(default = "default_breach_timeout_secs")]
    pub breach_timeout_secs: u64,

    /// How long cached breach responses stay valid, in hours (default: 24).
    #[serde(default = "default_breach_cache_ttl_hours")]
    pub breach_cache_ttl_hours: u64,

    /// Length of secrets produced by the remediation generator (default: 20).
    #[serde(default = "default_generated_length")]
    pub generated_length: usize,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_mode() -> RunMode {
    RunMode::Development
}

fn default_master_key_env() -> String {
    "CREDVAULT_MASTER_KEY".to_string()
}

fn default_database_path() -> String {
    "credvault.db".to_string()
}

fn default_breach_corpus_url() -> String {
    "https://breach.credvault.dev".to_string()
}

fn default_breach_timeout_secs() -> u64 {
    5
}

fn default_breach_cache_ttl_hours() -> u64 {
    24
}

fn default_generated_length() -> usize {
    20
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            master_key_env: default_master_key_env(),
            database_path: default_database_path(),
            breach_corpus_url: default_breach_corpus_url(),
            breach_timeout_secs: default_breach_timeout_secs(),
            breach_cache_ttl_hours: default_breach_cache_ttl_hours(),
            generated_length: default_generated_length(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the working directory.
    const FILE_NAME: &'static str = "credvault.toml";

    /// Load settings from `<dir>/credvault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            CredVaultError::Config(format!("failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Breach corpus request timeout as a `Duration`.
    pub fn breach_timeout(&self) -> Duration {
        Duration::from_secs(self.breach_timeout_secs)
    }

    /// Breach cache TTL as a `Duration`.
    pub fn breach_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.breach_cache_ttl_hours * 3600)
    }

    // ── Component wiring ─────────────────────────────────────────────

    /// Load the master key according to `mode` (fatal when missing in
    /// production, generated with a warning in development).
    pub fn load_master_key(&self) -> Result<MasterKey> {
        MasterKey::load(&self.master_key_env, self.mode)
    }

    /// Open the configured database, running pending migrations.
    pub fn open_store(&self) -> Result<Store> {
        Store::open(Path::new(&self.database_path))
    }

    /// Breach checker over the configured corpus endpoint.
    pub fn breach_checker(&self) -> BreachChecker {
        BreachChecker::over_http(
            &self.breach_corpus_url,
            self.breach_timeout(),
            self.breach_cache_ttl(),
        )
    }

    /// Replacement-secret policy for the remediation engine.
    pub fn generator_policy(&self) -> GeneratorPolicy {
        GeneratorPolicy::with_length(self.generated_length)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
