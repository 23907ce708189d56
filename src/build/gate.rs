//! Cache reuse gate

use crate::fingerprint::Fingerprint;
use crate::layer::CacheMetadata;

/// Whether a fresh install is needed for `current`
///
/// Only byte-for-byte equality with the stored fingerprint skips the
/// install; a missing or non-string value always reruns.
pub fn should_run(current: &Fingerprint, metadata: &CacheMetadata) -> bool {
    metadata.cache_sha() != Some(current.as_str())
}
