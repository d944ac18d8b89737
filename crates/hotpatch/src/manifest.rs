use crate::error::{Result, UpdateError};
use serde::{Deserialize, Serialize};

/// Manifest document as it appears on the wire.
///
/// Only `hasUpdate` is unconditionally required; the remaining fields are
/// unspecified when no update is announced, so they stay optional here and
/// are validated in [`UpdateManifest::from_slice`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    has_update: bool,
    #[serde(default)]
    version: Option<u64>,
    #[serde(default)]
    script_path: Option<String>,
    #[serde(default)]
    script_sha256: Option<String>,
}

/// Validated description of the latest available update.
///
/// Immutable once parsed. A manifest that announces an update is guaranteed
/// to carry a version, a script path, and an expected digest; a manifest with
/// a missing or mistyped field never parses into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateManifest {
    /// The server has no update to offer.
    NoUpdate,
    /// A patch is available.
    Available(PatchDescriptor),
}

/// The fields of a manifest that announces an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchDescriptor {
    /// Monotonically increasing patch version.
    pub version: u64,
    /// Path of the script, relative to the update base URL.
    pub script_path: String,
    /// Expected SHA-256 digest (hex) of the script payload.
    pub script_sha256: String,
}

impl UpdateManifest {
    /// Parse and validate a manifest from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: RawManifest = serde_json::from_slice(bytes)?;
        if !raw.has_update {
            return Ok(UpdateManifest::NoUpdate);
        }

        let version = raw.version.ok_or(UpdateError::MissingField("version"))?;
        let script_path = raw
            .script_path
            .ok_or(UpdateError::MissingField("scriptPath"))?;
        let script_sha256 = raw
            .script_sha256
            .ok_or(UpdateError::MissingField("scriptSha256"))?;

        Ok(UpdateManifest::Available(PatchDescriptor {
            version,
            script_path,
            script_sha256,
        }))
    }

    /// The announced patch, if any.
    pub fn patch(&self) -> Option<&PatchDescriptor> {
        match self {
            UpdateManifest::NoUpdate => None,
            UpdateManifest::Available(patch) => Some(patch),
        }
    }
}
