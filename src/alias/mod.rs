//! Domain alias resolution
//!
//! Hosting sites rotate domains frequently. Instead of hardcoding them, host
//! profiles name a logical host and the [`DomainAliasTable`] maps it to the
//! current live base URL, using a remote table fetched once per process.
//! Resolution never fails: without the table, the base URL is derived from the
//! reference itself.

mod snapshot;

pub use snapshot::AliasSnapshot;

use crate::config::AliasConfig;
use crate::fetch::{FetchRequest, Fetcher};
use crate::url::base_url;
use chrono::{DateTime, Utc};
use snapshot::normalize_base;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

#[derive(Debug, Clone)]
enum AliasState {
    /// Not fetched yet, or invalidated
    Unloaded,
    Loaded(Arc<AliasSnapshot>),
    /// The fetch failed or no remote is configured; not retried until invalidated
    Unavailable,
}

/// Process-wide logical host to live base URL mapping
///
/// Written at most once per load; reads after that only take a read lock.
pub struct DomainAliasTable {
    fetcher: Arc<dyn Fetcher>,
    remote_url: Option<String>,
    timeout: Duration,
    static_entries: HashMap<String, String>,
    state: RwLock<AliasState>,
    load_lock: tokio::sync::Mutex<()>,
}

impl DomainAliasTable {
    /// Creates an unloaded table; nothing is fetched until the first lookup
    pub fn new(config: &AliasConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let static_entries = config
            .static_entries
            .iter()
            .filter_map(|(key, value)| Some((key.clone(), normalize_base(value)?)))
            .collect();

        Self {
            fetcher,
            remote_url: config.remote_url.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            static_entries,
            state: RwLock::new(AliasState::Unloaded),
            load_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Resolves a logical host to a base URL
    ///
    /// Lookup order: remote table, static entries, then `scheme://host` of
    /// `fallback_from_url`. If even that cannot be parsed, the fallback string
    /// is returned trimmed of trailing slashes.
    pub async fn resolve(&self, logical_host: &str, fallback_from_url: &str) -> String {
        if let Some(snapshot) = self.snapshot().await {
            if let Some(base) = snapshot.get(logical_host) {
                tracing::debug!(host = logical_host, base, "alias from remote table");
                return base.to_string();
            }
        }

        if let Some(base) = self.static_entries.get(logical_host) {
            tracing::debug!(host = logical_host, base = %base, "alias from static entries");
            return base.clone();
        }

        match base_url(fallback_from_url) {
            Ok(base) => base,
            Err(e) => {
                tracing::debug!(host = logical_host, error = %e, "alias fallback unparseable");
                fallback_from_url.trim_end_matches('/').to_string()
            }
        }
    }

    /// Drops the cached table so the next lookup fetches it again
    pub fn invalidate(&self) {
        *self.write_state() = AliasState::Unloaded;
        tracing::info!("alias table invalidated");
    }

    /// Returns when the remote table was fetched, if it has been
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        match &*self.read_state() {
            AliasState::Loaded(snapshot) => Some(snapshot.fetched_at),
            _ => None,
        }
    }

    /// Returns the loaded snapshot, fetching it on first use
    pub async fn snapshot(&self) -> Option<Arc<AliasSnapshot>> {
        if let Some(loaded) = self.current() {
            return loaded;
        }

        let _guard = self.load_lock.lock().await;

        // Another caller may have loaded it while we waited
        if let Some(loaded) = self.current() {
            return loaded;
        }

        let state = match self.fetch_remote().await {
            Some(snapshot) => AliasState::Loaded(Arc::new(snapshot)),
            None => AliasState::Unavailable,
        };
        *self.write_state() = state.clone();

        match state {
            AliasState::Loaded(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    /// `None` while unloaded, `Some(None)` when known to be unavailable
    fn current(&self) -> Option<Option<Arc<AliasSnapshot>>> {
        match &*self.read_state() {
            AliasState::Unloaded => None,
            AliasState::Loaded(snapshot) => Some(Some(Arc::clone(snapshot))),
            AliasState::Unavailable => Some(None),
        }
    }

    async fn fetch_remote(&self) -> Option<AliasSnapshot> {
        let remote = self.remote_url.as_deref()?;
        let request = FetchRequest::new(remote, self.timeout);

        let response = match tokio::time::timeout(self.timeout, self.fetcher.get(&request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!(url = remote, error = %e, "alias table fetch failed");
                return None;
            }
            Err(_) => {
                tracing::warn!(url = remote, timeout_ms = self.timeout.as_millis() as u64, "alias table fetch timed out");
                return None;
            }
        };

        if !response.is_success() {
            tracing::warn!(url = remote, status = response.status, "alias table unavailable");
            return None;
        }

        match AliasSnapshot::from_json(&response.body) {
            Ok(snapshot) => {
                tracing::info!(url = remote, entries = snapshot.len(), "alias table loaded");
                Some(snapshot)
            }
            Err(e) => {
                tracing::warn!(url = remote, error = %e, "alias table is not a JSON object");
                None
            }
        }
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, AliasState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, AliasState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for DomainAliasTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainAliasTable")
            .field("remote_url", &self.remote_url)
            .field("timeout", &self.timeout)
            .field("static_entries", &self.static_entries.len())
            .finish()
    }
}
