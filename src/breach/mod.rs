//! Breach corpus checking via the k-anonymity range protocol.
//!
//! `check` hashes the plaintext with SHA-256, sends the first five hex
//! characters of the digest to the corpus, and matches the remaining
//! suffix locally against the returned `SUFFIX:COUNT` list.  The corpus
//! only ever learns a bucket of ~16^5th of the digest space, never the
//! secret or its full digest.
//!
//! Corpus unavailability is not an error: the result degrades to
//! `CorpusStatus::Unknown` ("not confirmed breached") so a flaky or
//! offline corpus never blocks record operations or sweeps.

pub mod cache;
pub mod client;

use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::errors::Result;

pub use cache::PrefixCache;
pub use client::{CorpusSource, HttpCorpus};

/// Length of the hex digest prefix sent to the corpus.
const PREFIX_LEN: usize = 5;

/// Whether the corpus actually answered for this check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorpusStatus {
    /// The corpus answered; `breached` is authoritative.
    Ok,
    /// The corpus was unreachable or timed out; treated as "not
    /// confirmed breached", never as an error.
    Unknown,
}

/// Result of one breach check.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BreachReport {
    /// True if the exact digest suffix appeared in the corpus response.
    pub breached: bool,
    /// How many times the corpus has seen this secret.
    pub exposure_count: u64,
    /// Whether the corpus answered at all.
    pub status: CorpusStatus,
}

impl BreachReport {
    fn unknown() -> Self {
        Self {
            breached: false,
            exposure_count: 0,
            status: CorpusStatus::Unknown,
        }
    }
}

/// k-anonymity breach checker with a shared per-prefix cache.
pub struct BreachChecker {
    source: Box<dyn CorpusSource>,
    cache: PrefixCache,
}

impl BreachChecker {
    /// Build a checker over any corpus transport with the given cache TTL.
    pub fn new(source: Box<dyn CorpusSource>, cache_ttl: Duration) -> Self {
        Self {
            source,
            cache: PrefixCache::new(cache_ttl),
        }
    }

    /// Convenience constructor for the HTTP corpus.
    pub fn over_http(base_url: &str, timeout: Duration, cache_ttl: Duration) -> Self {
        Self::new(Box::new(HttpCorpus::new(base_url, timeout)), cache_ttl)
    }

    /// Check `plaintext` against the corpus.
    ///
    /// Stateless with respect to storage: nothing about the plaintext is
    /// persisted, and the cache is keyed by prefix only.
    pub fn check(&self, plaintext: &str) -> Result<BreachReport> {
        let digest = hex_upper(&Sha256::digest(plaintext.as_bytes()));
        let (prefix, suffix) = digest.split_at(PREFIX_LEN);

        let body = match self.range_body(prefix) {
            Some(body) => body,
            None => return Ok(BreachReport::unknown()),
        };

        Ok(match_suffix(&body, suffix))
    }

    /// Cached-or-fetched range body; `None` when the corpus is down.
    fn range_body(&self, prefix: &str) -> Option<String> {
        if let Some(body) = self.cache.get(prefix) {
            return Some(body);
        }

        match self.source.fetch_range(prefix) {
            Ok(body) => {
                self.cache.insert(prefix, body.clone());
                Some(body)
            }
            Err(e) => {
                // Degrade, don't propagate: the caller sees Unknown.
                debug!(error = %e, "breach corpus lookup failed");
                None
            }
        }
    }

    /// Number of cached prefixes (for operational visibility and tests).
    pub fn cached_prefixes(&self) -> usize {
        self.cache.len()
    }
}

/// Scan a `SUFFIX:COUNT` body for an exact suffix match.
///
/// The comparison is constant-time per candidate line so response
/// scanning does not leak which line matched through timing.
fn match_suffix(body: &str, suffix: &str) -> BreachReport {
    for line in body.lines() {
        let Some((candidate, count)) = line.trim().split_once(':') else {
            continue;
        };

        let candidate = candidate.trim().to_ascii_uppercase();
        if candidate.len() != suffix.len() {
            continue;
        }

        if candidate.as_bytes().ct_eq(suffix.as_bytes()).into() {
            return BreachReport {
                breached: true,
                exposure_count: count.trim().parse().unwrap_or(0),
                status: CorpusStatus::Ok,
            };
        }
    }

    BreachReport {
        breached: false,
        exposure_count: 0,
        status: CorpusStatus::Ok,
    }
}

/// Uppercase hex encoding of raw bytes.
fn hex_upper(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02X}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CredVaultError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Fixture corpus: serves a fixed body and counts fetches.
    struct FixtureCorpus {
        body: String,
        fetches: Arc<AtomicUsize>,
    }

    impl FixtureCorpus {
        fn for_secret(secret: &str, count: u64) -> Self {
            let digest = hex_upper(&Sha256::digest(secret.as_bytes()));
            let decoy = hex_upper(&Sha256::digest(b"some other secret"));
            Self {
                body: format!(
                    "{}:{count}\n{}:7",
                    &digest[PREFIX_LEN..],
                    &decoy[PREFIX_LEN..]
                ),
                fetches: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl CorpusSource for FixtureCorpus {
        fn fetch_range(&self, _prefix: &str) -> Result<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    /// Fixture corpus that is always down.
    struct DownCorpus;

    impl CorpusSource for DownCorpus {
        fn fetch_range(&self, _prefix: &str) -> Result<String> {
            Err(CredVaultError::ExternalService("connection refused".into()))
        }
    }

    #[test]
    fn seeded_secret_is_reported_breached() {
        let checker = BreachChecker::new(
            Box::new(FixtureCorpus::for_secret("Sunflower42!", 1337)),
            Duration::from_secs(60),
        );

        let report = checker.check("Sunflower42!").unwrap();
        assert!(report.breached);
        assert_eq!(report.exposure_count, 1337);
        assert_eq!(report.status, CorpusStatus::Ok);
    }

    #[test]
    fn unseeded_secret_is_clean() {
        let checker = BreachChecker::new(
            Box::new(FixtureCorpus::for_secret("Sunflower42!", 1)),
            Duration::from_secs(60),
        );

        let report = checker.check("kQ9#vLw2RtM5xZbP1dYj4fGn8cHs").unwrap();
        assert!(!report.breached);
        assert_eq!(report.exposure_count, 0);
        assert_eq!(report.status, CorpusStatus::Ok);
    }

    #[test]
    fn corpus_outage_degrades_to_unknown() {
        let checker = BreachChecker::new(Box::new(DownCorpus), Duration::from_secs(60));

        let report = checker.check("anything").unwrap();
        assert!(!report.breached);
        assert_eq!(report.status, CorpusStatus::Unknown);
    }

    #[test]
    fn repeated_checks_share_the_prefix_cache() {
        let fixture = FixtureCorpus::for_secret("Sunflower42!", 2);
        let fetches = Arc::clone(&fixture.fetches);
        let checker = BreachChecker::new(Box::new(fixture), Duration::from_secs(60));

        checker.check("Sunflower42!").unwrap();
        checker.check("Sunflower42!").unwrap();

        assert_eq!(fetches.load(Ordering::SeqCst), 1, "second check must hit the cache");
        assert_eq!(checker.cached_prefixes(), 1);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let report = match_suffix("garbage\n:::\nABC\n", "ABCDEF");
        assert!(!report.breached);
        assert_eq!(report.status, CorpusStatus::Ok);
    }

    #[test]
    fn suffix_match_is_case_insensitive() {
        let digest = hex_upper(&Sha256::digest(b"pw"));
        let body = format!("{}:9", digest[PREFIX_LEN..].to_ascii_lowercase());
        let report = match_suffix(&body, &digest[PREFIX_LEN..]);
        assert!(report.breached);
        assert_eq!(report.exposure_count, 9);
    }
}
