/// Convenient result alias for hot-patch operations.
pub type Result<T> = std::result::Result<T, UpdateError>;

/// Errors that can occur while checking for or applying a hot patch.
#[derive(thiserror::Error, Debug)]
pub enum UpdateError {
    /// Network request to the update server failed (connectivity, timeout,
    /// or a non-2xx status). Recoverable by re-issuing the check.
    #[error("update fetch failed: {0}")]
    Network(#[from] reqwest::Error),
    /// The manifest document could not be decoded from JSON.
    #[error("manifest decoding failed: {0}")]
    Parse(#[from] serde_json::Error),
    /// The manifest announced an update but omitted a required field.
    #[error("manifest missing required field `{0}`")]
    MissingField(&'static str),
    /// The downloaded script digest did not match the manifest.
    #[error("script integrity check failed (expected {expected}, got {actual})")]
    Integrity {
        /// Expected SHA-256 digest.
        expected: String,
        /// Actual SHA-256 digest.
        actual: String,
    },
    /// Failed to read or write the local cache or version state.
    #[error("cache storage operation failed: {0}")]
    Storage(#[from] std::io::Error),
    /// A check was issued while another one was still in flight.
    #[error("an update check is already in progress")]
    Busy,
    /// A URL could not be composed from the configured base and a path.
    #[error("invalid update URL: {0}")]
    InvalidUrl(String),
    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl UpdateError {
    /// Helper for wrapping validation failures.
    pub fn validation(msg: impl Into<String>) -> Self {
        UpdateError::Other(msg.into())
    }
}
