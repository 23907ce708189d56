//! Layer placement
//!
//! Moves the working directory's module tree into the modules layer and
//! leaves a symlink behind, so the package manager and everything after it
//! see one logical path while the contents live in durable storage.
//!
//! The tree is moved to a staging name inside the layer first and renamed
//! into place only once complete. A crash between the move and the symlink
//! leaves the working directory with neither; the next build then sees no
//! module directory and installs from scratch.

use crate::build::log::BuildLogger;
use crate::build::signals::links_into;
use crate::config::PackageManagerConfig;
use crate::error::{ModlayerError, ModlayerResult};
use crate::process::{Executable, Execution};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Places module trees into a layer and runs the package manager there
#[derive(Clone)]
pub struct Placement {
    settings: PackageManagerConfig,
    executable: Arc<dyn Executable>,
    logger: BuildLogger,
}

impl Placement {
    pub fn new(
        settings: PackageManagerConfig,
        executable: Arc<dyn Executable>,
        logger: BuildLogger,
    ) -> Self {
        Self {
            settings,
            executable,
            logger,
        }
    }

    /// Where the module tree lives inside `layer_dir`
    pub fn layer_target(&self, layer_dir: &Path) -> PathBuf {
        layer_dir.join(&self.settings.modules_dir)
    }

    /// Move the working module directory into the layer and symlink it back.
    ///
    /// Safe to call again once placed: a working path that already links to
    /// the layer is left alone.
    pub fn place(&self, layer_dir: &Path, working_dir: &Path) -> ModlayerResult<PathBuf> {
        let layer_dir = &absolute(layer_dir)?;
        let working_path = working_dir.join(&self.settings.modules_dir);
        let target = self.layer_target(layer_dir);

        if links_into(&working_path, &target)? {
            debug!("{} already links into the layer", working_path.display());
            fs::create_dir_all(&target)
                .map_err(|e| ModlayerError::io(format!("creating {}", target.display()), e))?;
            return Ok(target);
        }

        if is_symlink(&working_path)? {
            return Err(ModlayerError::placement(
                &working_path,
                "is a symlink that does not point into the modules layer",
            ));
        }

        fs::create_dir_all(&working_path)
            .map_err(|e| ModlayerError::io(format!("creating {}", working_path.display()), e))?;
        fs::create_dir_all(layer_dir)
            .map_err(|e| ModlayerError::io(format!("creating {}", layer_dir.display()), e))?;
        self.clear_stale_staging(layer_dir)?;

        let staging = layer_dir.join(format!(
            ".{}.staging-{}",
            self.settings.modules_dir,
            uuid::Uuid::new_v4().simple()
        ));
        move_dir(&working_path, &staging)?;

        if fs::symlink_metadata(&target).is_ok() {
            remove_path(&target)?;
        }
        fs::rename(&staging, &target).map_err(|e| {
            ModlayerError::io(
                format!("renaming {} to {}", staging.display(), target.display()),
                e,
            )
        })?;

        symlink_dir(&target, &working_path)?;
        info!(
            "Placed {} -> {}",
            working_path.display(),
            target.display()
        );
        Ok(target)
    }

    /// Restore the working symlink to an existing layer tree.
    ///
    /// Only acts when the working path is absent and the layer holds a tree.
    pub fn relink(&self, layer_dir: &Path, working_dir: &Path) -> ModlayerResult<bool> {
        let layer_dir = &absolute(layer_dir)?;
        let working_path = working_dir.join(&self.settings.modules_dir);
        let target = self.layer_target(layer_dir);

        let absent = match fs::symlink_metadata(&working_path) {
            Ok(_) => false,
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => {
                return Err(ModlayerError::io(
                    format!("checking {}", working_path.display()),
                    e,
                ))
            }
        };
        if !absent || !target.is_dir() {
            return Ok(false);
        }

        symlink_dir(&target, &working_path)?;
        debug!("Relinked {} -> {}", working_path.display(), target.display());
        Ok(true)
    }

    /// Place the layer, then run the package manager with `args`.
    ///
    /// Placement failures return before anything is started. If the package
    /// manager fails, its captured output is logged and carried in the
    /// error; the symlink stays in place.
    pub async fn run(
        &self,
        args: Vec<String>,
        layer_dir: &Path,
        working_dir: &Path,
    ) -> ModlayerResult<()> {
        self.place(layer_dir, working_dir)?;

        let execution = Execution {
            args,
            dir: working_dir.to_path_buf(),
            env: self.settings.install_env(),
        };
        let subcommand = format!(
            "{} {}",
            self.settings.name,
            execution.args.first().map(String::as_str).unwrap_or_default()
        );

        self.logger.subprocess(format!(
            "Running '{} {}'",
            self.settings.name,
            execution.args.join(" ")
        ));
        debug!(
            "Invoking {}",
            self.executable.command_line(&execution)
        );

        let started = Instant::now();
        let mut buffer = Vec::new();
        let result = self.executable.execute(&execution, &mut buffer).await;
        let output = String::from_utf8_lossy(&buffer).into_owned();

        match result {
            Ok(()) => {
                self.logger
                    .action(format!("Completed in {}", format_duration(started.elapsed())));
                Ok(())
            }
            Err(e) => {
                self.logger.subprocess(&output);
                Err(ModlayerError::install_failed(subcommand, output, e))
            }
        }
    }

    /// Remove staging directories left behind by an interrupted build
    fn clear_stale_staging(&self, layer_dir: &Path) -> ModlayerResult<()> {
        let prefix = format!(".{}.staging-", self.settings.modules_dir);
        let entries = fs::read_dir(layer_dir)
            .map_err(|e| ModlayerError::io(format!("listing {}", layer_dir.display()), e))?;

        for entry in entries {
            let entry =
                entry.map_err(|e| ModlayerError::io(format!("listing {}", layer_dir.display()), e))?;
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                debug!("Removing stale staging dir {}", entry.path().display());
                remove_path(&entry.path())?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Placement")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Symlink targets are stored verbatim and resolve against the link's own
/// directory, so layer paths are anchored to the current directory first.
fn absolute(path: &Path) -> ModlayerResult<PathBuf> {
    std::path::absolute(path)
        .map_err(|e| ModlayerError::io(format!("resolving {}", path.display()), e))
}

/// Format elapsed time as `850ms` or `1.234s`
pub(crate) fn format_duration(elapsed: Duration) -> String {
    if elapsed < Duration::from_secs(1) {
        format!("{}ms", elapsed.as_millis())
    } else {
        format!("{:.3}s", elapsed.as_secs_f64())
    }
}

fn is_symlink(path: &Path) -> ModlayerResult<bool> {
    match fs::symlink_metadata(path) {
        Ok(metadata) => Ok(metadata.file_type().is_symlink()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ModlayerError::io(format!("checking {}", path.display()), e)),
    }
}

fn remove_path(path: &Path) -> ModlayerResult<()> {
    let metadata = fs::symlink_metadata(path)
        .map_err(|e| ModlayerError::io(format!("checking {}", path.display()), e))?;
    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| ModlayerError::io(format!("removing {}", path.display()), e))
}

/// Rename `src` to `dst`, copying across filesystems when rename cannot
fn move_dir(src: &Path, dst: &Path) -> ModlayerResult<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if crosses_devices(&e) => {
            debug!(
                "{} and {} are on different filesystems, copying",
                src.display(),
                dst.display()
            );
            copy_tree(src, dst)?;
            fs::remove_dir_all(src)
                .map_err(|e| ModlayerError::io(format!("removing {}", src.display()), e))
        }
        Err(e) => Err(ModlayerError::io(
            format!("moving {} to {}", src.display(), dst.display()),
            e,
        )),
    }
}

#[cfg(unix)]
fn crosses_devices(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(libc::EXDEV)
}

#[cfg(not(unix))]
fn crosses_devices(_e: &std::io::Error) -> bool {
    false
}

fn copy_tree(src: &Path, dst: &Path) -> ModlayerResult<()> {
    let metadata = fs::symlink_metadata(src)
        .map_err(|e| ModlayerError::io(format!("checking {}", src.display()), e))?;

    if metadata.is_dir() {
        fs::create_dir_all(dst)
            .map_err(|e| ModlayerError::io(format!("creating {}", dst.display()), e))?;
        let entries = fs::read_dir(src)
            .map_err(|e| ModlayerError::io(format!("listing {}", src.display()), e))?;
        for entry in entries {
            let entry =
                entry.map_err(|e| ModlayerError::io(format!("listing {}", src.display()), e))?;
            copy_tree(&entry.path(), &dst.join(entry.file_name()))?;
        }
        return Ok(());
    }

    #[cfg(unix)]
    if metadata.file_type().is_symlink() {
        let link = fs::read_link(src)
            .map_err(|e| ModlayerError::io(format!("reading link {}", src.display()), e))?;
        return std::os::unix::fs::symlink(&link, dst)
            .map_err(|e| ModlayerError::io(format!("copying link {}", dst.display()), e));
    }

    fs::copy(src, dst)
        .map(|_| ())
        .map_err(|e| ModlayerError::io(format!("copying {} to {}", src.display(), dst.display()), e))
}

fn symlink_dir(target: &Path, link: &Path) -> ModlayerResult<()> {
    #[cfg(unix)]
    let result = std::os::unix::fs::symlink(target, link);
    #[cfg(windows)]
    let result = std::os::windows::fs::symlink_dir(target, link);

    result.map_err(|e| {
        ModlayerError::io(
            format!("linking {} -> {}", link.display(), target.display()),
            e,
        )
    })
}
