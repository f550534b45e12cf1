//! HTTP transport for the breach corpus range protocol.
//!
//! A range request sends only a 5-character hex digest prefix; the
//! response body is a newline-delimited list of `SUFFIX:COUNT` pairs for
//! every breached digest sharing that prefix.  The full digest never
//! leaves the process.

use std::time::Duration;

use ureq::Agent;

use crate::errors::{CredVaultError, Result};

/// Transport seam for the corpus.  Production uses [`HttpCorpus`];
/// tests substitute fixtures.
pub trait CorpusSource: Send + Sync {
    /// Fetch the raw `SUFFIX:COUNT` body for a digest prefix.
    fn fetch_range(&self, prefix: &str) -> Result<String>;
}

/// ureq-backed corpus client with an agent-wide timeout.
pub struct HttpCorpus {
    agent: Agent,
    base_url: String,
}

impl HttpCorpus {
    /// Build a client for `base_url` (the `/range/<prefix>` path is
    /// appended per request).  `timeout` bounds the whole request; a
    /// slow corpus degrades to `unknown`, it never stalls a sweep.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();

        Self {
            agent: config.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl CorpusSource for HttpCorpus {
    fn fetch_range(&self, prefix: &str) -> Result<String> {
        let url = format!("{}/range/{prefix}", self.base_url);

        let mut response = self
            .agent
            .get(&url)
            .header(
                "User-Agent",
                concat!("credvault/", env!("CARGO_PKG_VERSION")),
            )
            .call()
            .map_err(|e| CredVaultError::ExternalService(e.to_string()))?;

        response
            .body_mut()
            .read_to_string()
            .map_err(|e| CredVaultError::ExternalService(e.to_string()))
    }
}
