//! Manifest fingerprinting
//!
//! A fingerprint is the SHA256 of a lockfile's full contents. It is only
//! ever compared for equality: same lockfile bytes = same fingerprint.

use crate::error::{ModlayerError, ModlayerResult};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Content hash of a manifest, 64 lowercase hex characters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash arbitrary bytes
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// A fingerprint no stored value can match
    ///
    /// Used when there is no lockfile to hash, so every build reinstalls.
    pub fn unique() -> Self {
        Self::of_bytes(uuid::Uuid::new_v4().as_bytes())
    }

    /// Wrap a previously persisted value
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes manifest fingerprints from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct Summer;

impl Summer {
    pub fn new() -> Self {
        Self
    }

    /// Hash a manifest's contents
    pub fn sum(&self, path: &Path) -> ModlayerResult<Fingerprint> {
        let contents = fs::read(path).map_err(|e| ModlayerError::ManifestRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let fingerprint = Fingerprint::of_bytes(&contents);
        debug!("Fingerprint of {}: {}", path.display(), fingerprint);
        Ok(fingerprint)
    }
}
