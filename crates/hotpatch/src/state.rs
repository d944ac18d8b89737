use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Persisted record of the last update that was applied.
///
/// The version only ever moves forward, and it moves only after a fetch has
/// been verified and cached. The state file is the source of truth for
/// [`crate::HotUpdater::current_script_path`], so nothing observable changes
/// until a commit has fully succeeded.
#[derive(Debug)]
pub struct VersionState {
    path: PathBuf,
    record: StateRecord,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StateRecord {
    version: u64,
    #[serde(default)]
    script: Option<PathBuf>,
}

impl VersionState {
    /// Load persisted state from `path`, defaulting to version 0 when no
    /// state has ever been written.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let record = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), %err, "version state unreadable, starting from 0");
                StateRecord::default()
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => StateRecord::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, record })
    }

    /// Last-applied patch version, 0 if none was ever applied.
    pub fn current_version(&self) -> u64 {
        self.record.version
    }

    /// Path of the last-applied verified script, if any.
    pub fn script_path(&self) -> Option<&Path> {
        self.record.script.as_deref()
    }

    /// Advance to `version` with the given verified script path, persisting
    /// atomically. The version never decreases; a stale commit is ignored.
    pub fn commit(&mut self, version: u64, script: PathBuf) -> Result<()> {
        if version < self.record.version {
            tracing::warn!(
                version,
                current = self.record.version,
                "ignoring commit that would lower the applied version"
            );
            return Ok(());
        }

        let next = StateRecord {
            version,
            script: Some(script),
        };
        let bytes = serde_json::to_vec(&next)?;

        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;
        let mut temp = NamedTempFile::new_in(parent)?;
        temp.write_all(&bytes)?;
        temp.flush()?;
        temp.as_file().sync_all()?;
        temp.into_temp_path()
            .persist(&self.path)
            .map_err(|err| err.error)?;

        self.record = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_as_version_zero() {
        let dir = tempdir().unwrap();
        let state = VersionState::load(dir.path().join("version.json")).unwrap();
        assert_eq!(state.current_version(), 0);
        assert!(state.script_path().is_none());
    }

    #[test]
    fn commit_survives_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("version.json");

        let mut state = VersionState::load(&path).unwrap();
        state.commit(6, PathBuf::from("/cache/main.js")).unwrap();

        let reloaded = VersionState::load(&path).unwrap();
        assert_eq!(reloaded.current_version(), 6);
        assert_eq!(
            reloaded.script_path(),
            Some(Path::new("/cache/main.js"))
        );
    }

    #[test]
    fn commit_never_lowers_the_version() {
        let dir = tempdir().unwrap();
        let mut state = VersionState::load(dir.path().join("version.json")).unwrap();

        state.commit(6, PathBuf::from("/cache/v6.js")).unwrap();
        state.commit(4, PathBuf::from("/cache/v4.js")).unwrap();

        assert_eq!(state.current_version(), 6);
        assert_eq!(state.script_path(), Some(Path::new("/cache/v6.js")));
    }

    #[test]
    fn corrupt_state_file_resets_to_zero() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("version.json");
        fs::write(&path, b"{{{").unwrap();

        let state = VersionState::load(&path).unwrap();
        assert_eq!(state.current_version(), 0);
    }
}
