//! Build signals: what the working directory already provides
//!
//! Inspected fresh on every build; nothing here is cached.

use crate::build::strategy::Strategy;
use crate::config::PackageManagerConfig;
use crate::error::{ModlayerError, ModlayerResult};
use crate::layer::CacheMetadata;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Presence of each installation input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildSignals {
    /// Module directory exists (vendored)
    pub modules: bool,
    /// Package manager cache directory exists and is non-empty
    pub cache: bool,
    /// Lockfile exists
    pub lockfile: bool,
}

impl BuildSignals {
    /// Inspect `working_dir`
    ///
    /// A module directory that is our own symlink into `layer_dir` only
    /// counts as present when `previous` says the layer was built from a
    /// vendored tree; otherwise it holds what an earlier install produced.
    pub fn inspect(
        working_dir: &Path,
        layer_dir: &Path,
        settings: &PackageManagerConfig,
        previous: &CacheMetadata,
    ) -> ModlayerResult<Self> {
        let modules_path = working_dir.join(&settings.modules_dir);
        let vendored_layer = previous.strategy() == Some(Strategy::ReuseInPlace.as_str());
        let modules = is_dir(&modules_path)?
            && (vendored_layer
                || !links_into(&modules_path, &layer_dir.join(&settings.modules_dir))?);

        let cache = is_non_empty_dir(&working_dir.join(&settings.cache_dir))?;
        let lockfile = is_file(&working_dir.join(&settings.lockfile))?;

        Ok(Self {
            modules,
            cache,
            lockfile,
        })
    }

    /// All eight combinations, for exhaustive checks
    pub fn all() -> impl Iterator<Item = Self> {
        (0u8..8).map(|bits| Self {
            modules: bits & 0b100 != 0,
            cache: bits & 0b010 != 0,
            lockfile: bits & 0b001 != 0,
        })
    }
}

fn stat(path: &Path) -> ModlayerResult<Option<fs::Metadata>> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(Some(metadata)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ModlayerError::io(format!("checking {}", path.display()), e)),
    }
}

fn is_dir(path: &Path) -> ModlayerResult<bool> {
    Ok(stat(path)?.is_some_and(|m| m.is_dir()))
}

fn is_file(path: &Path) -> ModlayerResult<bool> {
    Ok(stat(path)?.is_some_and(|m| m.is_file()))
}

fn is_non_empty_dir(path: &Path) -> ModlayerResult<bool> {
    if !is_dir(path)? {
        return Ok(false);
    }
    let mut entries = fs::read_dir(path)
        .map_err(|e| ModlayerError::io(format!("listing {}", path.display()), e))?;
    Ok(entries.next().is_some())
}

/// Whether `path` is a symlink whose target is `target`
///
/// A relative `target` also matches its absolute form, which is what
/// placement writes.
pub(crate) fn links_into(path: &Path, target: &Path) -> ModlayerResult<bool> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.file_type().is_symlink() => {
            let link = fs::read_link(path)
                .map_err(|e| ModlayerError::io(format!("reading link {}", path.display()), e))?;
            Ok(link == target || std::path::absolute(target).is_ok_and(|abs| link == abs))
        }
        Ok(_) => Ok(false),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ModlayerError::io(format!("checking {}", path.display()), e)),
    }
}
