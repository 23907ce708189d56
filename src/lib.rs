//! modlayer - dependency installation with reusable module layers
//!
//! Chooses how to install a project's dependencies, skips the install when
//! the lockfile is unchanged, and keeps the installed module tree in a
//! durable layer directory linked into the working tree.

pub mod build;
pub mod cli;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod layer;
pub mod process;

pub use error::{ModlayerError, ModlayerResult};
