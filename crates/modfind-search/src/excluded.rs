//! Process-wide excluded-prefix snapshot.
//!
//! Readers take a cheap `Arc` snapshot; a background poller swaps in a
//! fresh sorted set at a fixed interval, so readers never observe a
//! partially updated list.

use modfind_store::{Result, Store};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default refresh cadence for the background poller.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(600);

/// Copy-on-write set of excluded package-path prefixes.
#[derive(Default)]
pub struct ExcludedPrefixes {
    inner: RwLock<Arc<Vec<String>>>,
}

impl ExcludedPrefixes {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current consistent snapshot.
    pub fn snapshot(&self) -> Arc<Vec<String>> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replaces the snapshot wholesale.
    pub fn replace(&self, mut prefixes: Vec<String>) {
        prefixes.sort();
        prefixes.dedup();
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(prefixes);
    }

    /// Whether a package path starts with any excluded prefix.
    pub fn is_excluded(&self, package_path: &str) -> bool {
        self.snapshot()
            .iter()
            .any(|prefix| package_path.starts_with(prefix.as_str()))
    }

    /// Reloads the set from the store.
    pub async fn refresh(&self, store: &Store) -> Result<()> {
        let prefixes = store.get_excluded_prefixes().await?;
        debug!(count = prefixes.len(), "refreshed excluded prefixes");
        self.replace(prefixes);
        Ok(())
    }

    /// Spawns the refresh loop. The first tick fires immediately; the
    /// handle belongs to the application's root lifecycle.
    pub fn spawn_poller(
        self: Arc<Self>,
        store: Arc<Store>,
        interval: Duration,
    ) -> JoinHandle<()> {
        let this = self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(err) = this.refresh(&store).await {
                    warn!(error = %err, "excluded-prefix refresh failed");
                }
            }
        })
    }
}
