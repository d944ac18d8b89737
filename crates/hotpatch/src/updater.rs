use crate::{
    cache::{CacheStore, ResourceKey},
    error::{Result, UpdateError},
    fetcher::{self, Fetcher, DEFAULT_BASE_URL},
    manifest::{PatchDescriptor, UpdateManifest},
    state::VersionState,
    verify,
};
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::task;
use tracing::{debug, info, warn};

/// File inside the cache directory holding the last-applied version record.
pub(crate) const STATE_FILE: &str = "version.json";

/// Configuration for a [`HotUpdater`].
pub struct UpdaterConfig {
    base_url: Url,
    cache_dir: PathBuf,
    fallback_script: PathBuf,
}

impl UpdaterConfig {
    /// Configure an updater caching into `cache_dir` and falling back to the
    /// bundled script at `fallback_script` until a patch has been applied.
    pub fn new(cache_dir: impl Into<PathBuf>, fallback_script: impl Into<PathBuf>) -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default update base URL"),
            cache_dir: cache_dir.into(),
            fallback_script: fallback_script.into(),
        }
    }

    /// Override the default update base URL.
    pub fn with_base_url(mut self, url: Url) -> Self {
        self.base_url = url;
        self
    }
}

/// Outcome of a completed update check.
#[derive(Debug)]
pub enum UpdateOutcome {
    /// The server had nothing newer than the currently applied version.
    UpToDate,
    /// A newer patch was fetched, verified, and cached.
    Applied(AppliedUpdate),
}

impl UpdateOutcome {
    /// Whether this check applied an update.
    pub fn applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied(_))
    }
}

/// Details of a patch that was just applied.
#[derive(Debug)]
pub struct AppliedUpdate {
    /// The manifest entry that was applied.
    pub patch: PatchDescriptor,
    /// Local path of the verified script.
    pub script_path: PathBuf,
}

/// Drives the check → compare → fetch → verify → cache pipeline.
///
/// One instance owns its cache directory and version state. At most one
/// check runs at a time; a second call while one is in flight fails fast
/// with [`UpdateError::Busy`] rather than queueing behind a version it never
/// observed. Each call resolves exactly once, with either an outcome or an
/// error.
pub struct HotUpdater<F> {
    fetcher: F,
    base_url: Url,
    cache: CacheStore,
    fallback_script: PathBuf,
    state: Arc<Mutex<VersionState>>,
    flight: tokio::sync::Mutex<()>,
}

impl<F> HotUpdater<F>
where
    F: Fetcher,
{
    /// Create a new updater, loading any persisted version state from the
    /// cache directory.
    pub fn new(fetcher: F, config: UpdaterConfig) -> Result<Self> {
        let state = VersionState::load(config.cache_dir.join(STATE_FILE))?;
        Ok(Self {
            fetcher,
            base_url: config.base_url,
            cache: CacheStore::new(config.cache_dir),
            fallback_script: config.fallback_script,
            state: Arc::new(Mutex::new(state)),
            flight: tokio::sync::Mutex::new(()),
        })
    }

    /// Check the server for a patch newer than the currently applied version
    /// and apply it if one exists, preferring a cached copy of the script
    /// over a network fetch.
    pub async fn check_for_update(&self, manifest_file_name: &str) -> Result<UpdateOutcome> {
        self.check(manifest_file_name, false).await
    }

    /// Like [`check_for_update`](Self::check_for_update), but always fetches
    /// the script from the network, ignoring any cached copy.
    pub async fn check_for_update_forced(&self, manifest_file_name: &str) -> Result<UpdateOutcome> {
        self.check(manifest_file_name, true).await
    }

    async fn check(&self, manifest_file_name: &str, force_fetch: bool) -> Result<UpdateOutcome> {
        // Single flow in flight per instance; overlapping callers are
        // rejected, not queued.
        let _flight = self.flight.try_lock().map_err(|_| UpdateError::Busy)?;

        let manifest_url = fetcher::resolve_against(&self.base_url, manifest_file_name)?;
        let bytes = self.fetcher.fetch_bytes(&manifest_url).await?;
        let manifest = UpdateManifest::from_slice(&bytes)?;

        let patch = match manifest.patch() {
            Some(patch) => patch.clone(),
            None => {
                debug!("manifest announces no update");
                return Ok(UpdateOutcome::UpToDate);
            }
        };

        let current = self.current_version();
        if patch.version <= current {
            debug!(
                manifest_version = patch.version,
                current, "already at or beyond manifest version"
            );
            return Ok(UpdateOutcome::UpToDate);
        }

        let script_url = fetcher::resolve_against(&self.base_url, &patch.script_path)?;
        let key = ResourceKey::from_url(&script_url);

        let cached = if force_fetch {
            None
        } else {
            self.cache.read(&key)?
        };
        let (payload, from_cache) = match cached {
            Some(bytes) => (bytes, true),
            None => (self.fetcher.fetch_bytes(&script_url).await?, false),
        };

        let verified = verify::verify(payload, &patch.script_sha256).map_err(|err| {
            warn!(version = patch.version, from_cache, %err, "rejecting script payload");
            err
        })?;

        // Commit off the async executor: cache file first, then the version
        // record. The record is what callers observe, so a failure in
        // between leaves the applied version and script path unchanged.
        let cache = self.cache.clone();
        let state = Arc::clone(&self.state);
        let commit_key = key.clone();
        let version = patch.version;
        let script_path = task::spawn_blocking(move || -> Result<PathBuf> {
            let path = cache.write(&commit_key, &verified)?;
            let mut state = state.lock().expect("version state lock poisoned");
            state.commit(version, path.clone())?;
            Ok(path)
        })
        .await
        .map_err(|err| UpdateError::Other(format!("task join error: {err}")))??;

        info!(
            version = patch.version,
            from_cache,
            path = %script_path.display(),
            "hot update applied"
        );
        Ok(UpdateOutcome::Applied(AppliedUpdate {
            patch,
            script_path,
        }))
    }

    /// Path of the most recently applied verified script, or the bundled
    /// fallback if no patch has ever been applied.
    pub fn current_script_path(&self) -> PathBuf {
        let state = self.state.lock().expect("version state lock poisoned");
        state
            .script_path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.fallback_script.clone())
    }

    /// Last-applied patch version, 0 if none.
    pub fn current_version(&self) -> u64 {
        self.state
            .lock()
            .expect("version state lock poisoned")
            .current_version()
    }

    /// Compose the absolute URL of a named asset on the update server.
    /// Pure string composition, no I/O.
    pub fn resolve_asset_url(&self, name: &str) -> Result<Url> {
        fetcher::resolve_against(&self.base_url, name)
    }
}
