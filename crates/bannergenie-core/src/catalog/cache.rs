//! Per-credential template catalog cache.
//!
//! Entries are keyed by a SHA-256 fingerprint of the credential so listings
//! fetched with one key are never served to another. A refresh swaps the
//! whole `Arc<CachedCatalog>`, so concurrent readers see either the old
//! listing or the new one.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use tokio::time::Instant;

use bannergenie_types::template::TemplateSummary;

/// Hex SHA-256 of the credential. Safe to log and to use as a map key.
pub fn credential_fingerprint(credential: &SecretString) -> String {
    format!("{:x}", Sha256::digest(credential.expose_secret().as_bytes()))
}

/// One cached listing.
#[derive(Debug)]
pub struct CachedCatalog {
    pub templates: Vec<TemplateSummary>,
    pub fetched_at: Instant,
}

/// TTL cache of template listings shared by every session in the process.
#[derive(Debug)]
pub struct TemplateCatalogCache {
    entries: DashMap<String, Arc<CachedCatalog>>,
    ttl: Duration,
}

impl TemplateCatalogCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh listing for `fingerprint`, if any. Expired entries are evicted.
    pub fn get(&self, fingerprint: &str) -> Option<Arc<CachedCatalog>> {
        let entry = self.entries.get(fingerprint).map(|e| Arc::clone(e.value()))?;
        if entry.fetched_at.elapsed() < self.ttl {
            return Some(entry);
        }
        tracing::debug!(
            fingerprint = &fingerprint[..12.min(fingerprint.len())],
            "catalog cache entry expired"
        );
        self.entries.remove(fingerprint);
        None
    }

    /// Store a listing, replacing whatever was there.
    pub fn put(&self, fingerprint: &str, templates: Vec<TemplateSummary>) -> Arc<CachedCatalog> {
        let entry = Arc::new(CachedCatalog {
            templates,
            fetched_at: Instant::now(),
        });
        self.entries.insert(fingerprint.to_string(), Arc::clone(&entry));
        entry
    }

    pub fn invalidate(&self, fingerprint: &str) {
        self.entries.remove(fingerprint);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TemplateCatalogCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}
