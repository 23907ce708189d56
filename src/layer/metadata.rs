//! Cache metadata attached to the modules layer
//!
//! The record itself is persisted by whoever drives the build; this side only
//! reads the stored fingerprint and proposes new values.

use crate::fingerprint::Fingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata keys
pub mod keys {
    /// Fingerprint of the lockfile the layer was built from
    pub const CACHE_SHA: &str = "cache_sha";
    /// Build timestamp (RFC3339)
    pub const BUILT_AT: &str = "built_at";
    /// Strategy that produced the layer contents
    pub const STRATEGY: &str = "strategy";
}

/// String-keyed record of arbitrary values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheMetadata(toml::Table);

impl CacheMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: toml::Table) -> Self {
        Self(table)
    }

    /// Last recorded fingerprint, if it is present and a string
    pub fn cache_sha(&self) -> Option<&str> {
        self.0.get(keys::CACHE_SHA).and_then(toml::Value::as_str)
    }

    /// Last recorded build time, if present and parseable
    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.0
            .get(keys::BUILT_AT)
            .and_then(toml::Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
    }

    /// Record a successful build of `fingerprint` at `built_at`
    pub fn record_build(&mut self, fingerprint: &Fingerprint, built_at: DateTime<Utc>) {
        self.0.insert(
            keys::CACHE_SHA.to_string(),
            toml::Value::String(fingerprint.to_string()),
        );
        self.0.insert(
            keys::BUILT_AT.to_string(),
            toml::Value::String(built_at.to_rfc3339()),
        );
    }

    /// Strategy name recorded with the last build
    pub fn strategy(&self) -> Option<&str> {
        self.0.get(keys::STRATEGY).and_then(toml::Value::as_str)
    }

    pub fn record_strategy(&mut self, strategy: &str) {
        self.0.insert(
            keys::STRATEGY.to_string(),
            toml::Value::String(strategy.to_string()),
        );
    }

    /// Forget the recorded fingerprint so the next build cannot count as a hit.
    ///
    /// Used once the layer contents may have been touched by a build that did
    /// not finish.
    pub fn invalidate(&mut self) {
        self.0.remove(keys::CACHE_SHA);
    }

    /// Builder-style variant of [`record_build`](Self::record_build) stamped now
    pub fn with_fingerprint(mut self, fingerprint: &Fingerprint) -> Self {
        self.record_build(fingerprint, Utc::now());
        self
    }

    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.0.get(key)
    }
}
