//! Layer metadata and persistence
//!
//! A layer is a durable directory outside the working tree. The modules
//! layer holds the installed module tree across builds, together with the
//! fingerprint of the lockfile it was built from.

pub mod metadata;
pub mod store;

pub use metadata::{keys, CacheMetadata};
pub use store::{LayerRecord, LayerStore};
