use crate::error::Result;
use crate::verify::VerifiedBytes;
use reqwest::Url;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Stable identifier for a remote resource, derived purely from its URL.
///
/// The key combines a truncated SHA-256 of the full URL with a sanitized
/// version of the final path segment, so repeated derivations for the same
/// URL always resolve to the same cache location and distinct URLs with the
/// same file name cannot collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Derive the key for a remote URL.
    pub fn from_url(url: &Url) -> Self {
        let digest = hex::encode(Sha256::digest(url.as_str().as_bytes()));
        let name = url
            .path_segments()
            .and_then(|segments| segments.last())
            .filter(|segment| !segment.is_empty())
            .map(sanitize_segment)
            .unwrap_or_default();

        if name.is_empty() {
            ResourceKey(digest[..16].to_string())
        } else {
            ResourceKey(format!("{}-{}", &digest[..16], name))
        }
    }

    /// The key as a file-name-safe string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Reduce a URL path segment to a safe file name component.
fn sanitize_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    out.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// File-backed map from resource keys to cached payloads.
///
/// The store is deliberately dumb: it knows nothing about versions or
/// freshness. Deciding whether a cached copy may be used belongs to the
/// orchestrator.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Create a store rooted at the given directory. The directory is
    /// created lazily on the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory holding cached files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path a key resolves to. Deterministic and content-independent.
    pub fn path_for(&self, key: &ResourceKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    /// Whether a cached copy exists for the key.
    pub fn has(&self, key: &ResourceKey) -> bool {
        self.path_for(key).is_file()
    }

    /// Read the cached payload for the key, if present.
    pub fn read(&self, key: &ResourceKey) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Write a verified payload for the key, atomically replacing any prior
    /// content, and return the final local path.
    ///
    /// The payload is staged in a temp file in the cache directory and then
    /// renamed into place, so readers never observe a partial file.
    pub fn write(&self, key: &ResourceKey, payload: &VerifiedBytes) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)?;

        let target = self.path_for(key);
        let mut temp = NamedTempFile::new_in(&self.root)?;
        temp.write_all(payload.as_slice())?;
        temp.flush()?;
        temp.as_file().sync_all()?;
        temp.into_temp_path()
            .persist(&target)
            .map_err(|err| err.error)?;

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify;
    use tempfile::tempdir;

    fn verified(bytes: &[u8]) -> VerifiedBytes {
        let digest = hex::encode(Sha256::digest(bytes));
        verify::verify(bytes.to_vec(), &digest).unwrap()
    }

    #[test]
    fn key_is_deterministic_and_url_sensitive() {
        let a = Url::parse("https://host/hotUpdate/main.js").unwrap();
        let b = Url::parse("https://other/hotUpdate/main.js").unwrap();

        assert_eq!(ResourceKey::from_url(&a), ResourceKey::from_url(&a));
        assert_ne!(ResourceKey::from_url(&a), ResourceKey::from_url(&b));
        assert!(ResourceKey::from_url(&a).as_str().ends_with("-main.js"));
    }

    #[test]
    fn key_survives_hostile_segments() {
        let url = Url::parse("https://host/a%2Fb%00c.js").unwrap();
        let key = ResourceKey::from_url(&url);
        assert!(!key.as_str().contains('/'));
        assert!(!key.as_str().contains('\0'));
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("cache"));
        let key = ResourceKey::from_url(&Url::parse("https://host/main.js").unwrap());

        assert!(!store.has(&key));
        assert_eq!(store.read(&key).unwrap(), None);

        let path = store.write(&key, &verified(b"v1")).unwrap();
        assert_eq!(path, store.path_for(&key));
        assert!(store.has(&key));
        assert_eq!(store.read(&key).unwrap(), Some(b"v1".to_vec()));
    }

    #[test]
    fn write_replaces_prior_content() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let key = ResourceKey::from_url(&Url::parse("https://host/main.js").unwrap());

        store.write(&key, &verified(b"v1")).unwrap();
        store.write(&key, &verified(b"v2 is longer")).unwrap();
        assert_eq!(store.read(&key).unwrap(), Some(b"v2 is longer".to_vec()));
    }

    #[test]
    fn path_for_is_stable_across_calls() {
        let store = CacheStore::new("/var/cache/hotpatch");
        let key = ResourceKey::from_url(&Url::parse("https://host/main.js").unwrap());
        assert_eq!(store.path_for(&key), store.path_for(&key));
    }
}
