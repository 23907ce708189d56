//! CLI command implementations

pub mod build;
pub mod config;
pub mod resolve;
pub mod sum;

pub use build::execute as build;
pub use config::execute as config;
pub use resolve::execute as resolve;
pub use sum::execute as sum;

use crate::error::{ModlayerError, ModlayerResult};
use std::path::{Path, PathBuf};

/// Resolve an optional directory argument against the current directory
pub(crate) fn working_dir(arg: Option<PathBuf>) -> ModlayerResult<PathBuf> {
    match arg {
        Some(dir) => Ok(dir),
        None => {
            std::env::current_dir().map_err(|e| ModlayerError::io("getting current directory", e))
        }
    }
}

/// Anchor a layers directory argument to the current directory
pub(crate) fn layers_dir(arg: &Path) -> ModlayerResult<PathBuf> {
    std::path::absolute(arg)
        .map_err(|e| ModlayerError::io(format!("resolving layers dir {}", arg.display()), e))
}
