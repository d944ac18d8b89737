//! HTTP-backed hot-patch delivery with integrity verification.
//!
//! This crate keeps a host application's interpreted script bundle up to
//! date. A remote manifest describes the latest patch (version, script path,
//! expected digest); the updater fetches the manifest, compares the announced
//! version against the last one it applied, downloads the script if needed
//! (preferring a cached copy), verifies its SHA-256 digest, and only then
//! commits it to the local cache and advances the persisted version record.
//! The host keeps running its previous script whenever any step fails.
//!
//! ```ignore
//! use hotpatch::{HotUpdater, HttpFetcher, UpdateOutcome, UpdaterConfig};
//!
//! # async fn demo() -> hotpatch::Result<()> {
//! let fetcher = HttpFetcher::builder().build()?;
//! let config = UpdaterConfig::new("/var/cache/myapp/hotpatch", "/opt/myapp/main.js");
//! let updater = HotUpdater::new(fetcher, config)?;
//!
//! match updater.check_for_update("hotupdate.json").await? {
//!     UpdateOutcome::Applied(update) => {
//!         println!("patched to v{}", update.patch.version);
//!     }
//!     UpdateOutcome::UpToDate => {
//!         println!("already on the latest script");
//!     }
//! }
//!
//! // Hand the current script to the interpreter.
//! let script = updater.current_script_path();
//! # Ok(())
//! # }
//! ```

mod cache;
mod error;
mod fetcher;
mod manifest;
mod state;
mod updater;
mod verify;

pub use cache::{CacheStore, ResourceKey};
pub use error::{Result, UpdateError};
pub use fetcher::{Fetcher, HttpFetcher, HttpFetcherBuilder, DEFAULT_BASE_URL};
pub use manifest::{PatchDescriptor, UpdateManifest};
pub use state::VersionState;
pub use updater::{AppliedUpdate, HotUpdater, UpdateOutcome, UpdaterConfig};
pub use verify::{verify, VerifiedBytes};
