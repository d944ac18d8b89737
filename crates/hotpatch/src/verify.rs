use crate::error::{Result, UpdateError};
use sha2::{Digest, Sha256};

/// Payload bytes that have passed the integrity check.
///
/// This is the only type [`crate::CacheStore::write`] accepts, so a script
/// can never reach the cache or the host runtime without going through
/// [`verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedBytes(Vec<u8>);

impl VerifiedBytes {
    /// The verified payload.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Consume the wrapper.
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

/// Check `bytes` against an expected SHA-256 digest (hex encoded).
///
/// The comparison is exact equality; a mismatch of any kind is an
/// [`UpdateError::Integrity`] and the bytes must be discarded.
pub fn verify(bytes: Vec<u8>, expected_sha256: &str) -> Result<VerifiedBytes> {
    let actual = hex::encode(Sha256::digest(&bytes));
    let expected = expected_sha256.to_ascii_lowercase();
    if actual != expected {
        return Err(UpdateError::Integrity { expected, actual });
    }
    Ok(VerifiedBytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_of(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    #[test]
    fn accepts_matching_digest() {
        let payload = b"console.log('patched');".to_vec();
        let verified = verify(payload.clone(), &digest_of(&payload)).unwrap();
        assert_eq!(verified.as_slice(), payload.as_slice());
    }

    #[test]
    fn digest_comparison_is_case_insensitive_on_the_expectation() {
        let payload = b"payload".to_vec();
        let upper = digest_of(&payload).to_ascii_uppercase();
        assert!(verify(payload, &upper).is_ok());
    }

    #[test]
    fn rejects_mismatched_digest() {
        let err = verify(b"tampered".to_vec(), &digest_of(b"original")).unwrap_err();
        match err {
            UpdateError::Integrity { expected, actual } => {
                assert_eq!(expected, digest_of(b"original"));
                assert_eq!(actual, digest_of(b"tampered"));
            }
            other => panic!("expected integrity error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_garbage_expectation() {
        assert!(matches!(
            verify(b"payload".to_vec(), "not-a-digest"),
            Err(UpdateError::Integrity { .. })
        ));
    }
}
