//! Installation strategies
//!
//! The set is closed, so strategies are an enum and [`BuildProcess`]
//! dispatches on it. Each strategy answers two questions: does it need to
//! run given the recorded metadata, and how does it install.
//!
//! | Strategy | `should_run` | `run` |
//! |----------|--------------|-------|
//! | CleanInstall | lockfile fingerprint differs | `<pm> ci` |
//! | Install | lockfile fingerprint differs, or no lockfile | `<pm> install` |
//! | ReuseInPlace | nothing recorded yet | place vendored tree, no subprocess |

use crate::build::gate;
use crate::build::log::BuildLogger;
use crate::build::placement::Placement;
use crate::config::PackageManagerConfig;
use crate::error::{ModlayerError, ModlayerResult};
use crate::fingerprint::{Fingerprint, Summer};
use crate::layer::CacheMetadata;
use crate::process::Executable;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// One installation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Strict, reproducible install from the lockfile
    CleanInstall,
    /// Standard install; may write or update the lockfile
    Install,
    /// Trust a vendored module tree
    ReuseInPlace,
}

impl Strategy {
    /// Package manager subcommand, if the strategy runs one
    pub fn subcommand(&self) -> Option<&'static str> {
        match self {
            Self::CleanInstall => Some("ci"),
            Self::Install => Some("install"),
            Self::ReuseInPlace => None,
        }
    }

    /// Full argument vector for the package manager
    pub fn install_args(&self, cache_dir: &Path) -> Option<Vec<String>> {
        self.subcommand().map(|subcommand| {
            vec![
                subcommand.to_string(),
                "--unsafe-perm".to_string(),
                "--cache".to_string(),
                cache_dir.display().to_string(),
            ]
        })
    }

    /// Name shown in the build log, e.g. `npm ci`
    pub fn label(&self, settings: &PackageManagerConfig) -> String {
        match self.subcommand() {
            Some(subcommand) => format!("{} {}", settings.name, subcommand),
            None => format!("reuse vendored {}", settings.modules_dir),
        }
    }
}

impl Strategy {
    /// Stable name, as recorded in layer metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CleanInstall => "clean-install",
            Self::Install => "install",
            Self::ReuseInPlace => "reuse-in-place",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer of [`BuildProcess::should_run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDecision {
    pub run: bool,
    /// Fingerprint to record once the run succeeds
    pub fingerprint: Fingerprint,
}

/// A strategy bound to the collaborators it needs
#[derive(Debug, Clone)]
pub struct BuildProcess {
    strategy: Strategy,
    settings: PackageManagerConfig,
    summer: Summer,
    placement: Placement,
    logger: BuildLogger,
}

impl BuildProcess {
    pub fn new(
        strategy: Strategy,
        settings: PackageManagerConfig,
        executable: Arc<dyn Executable>,
        logger: BuildLogger,
    ) -> Self {
        let placement = Placement::new(settings.clone(), executable, logger.clone());
        Self {
            strategy,
            settings,
            summer: Summer::new(),
            placement,
            logger,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    /// Decide whether the recorded layer can be reused as is
    pub fn should_run(
        &self,
        working_dir: &Path,
        metadata: &CacheMetadata,
    ) -> ModlayerResult<RunDecision> {
        let lockfile = working_dir.join(&self.settings.lockfile);

        let decision = match self.strategy {
            Strategy::CleanInstall => {
                let fingerprint = self.summer.sum(&lockfile)?;
                RunDecision {
                    run: gate::should_run(&fingerprint, metadata),
                    fingerprint,
                }
            }
            Strategy::Install => {
                if lockfile.is_file() {
                    let fingerprint = self.summer.sum(&lockfile)?;
                    RunDecision {
                        run: gate::should_run(&fingerprint, metadata),
                        fingerprint,
                    }
                } else {
                    RunDecision {
                        run: true,
                        fingerprint: Fingerprint::unique(),
                    }
                }
            }
            Strategy::ReuseInPlace => match metadata.cache_sha() {
                Some(recorded) => RunDecision {
                    run: false,
                    fingerprint: Fingerprint::from_stored(recorded),
                },
                None => RunDecision {
                    run: true,
                    fingerprint: if lockfile.is_file() {
                        self.summer.sum(&lockfile)?
                    } else {
                        Fingerprint::unique()
                    },
                },
            },
        };

        debug!(
            "{} should_run={} fingerprint={}",
            self.strategy, decision.run, decision.fingerprint
        );
        Ok(decision)
    }

    /// Install into `layer_dir`, linking it from `working_dir`
    pub async fn run(
        &self,
        layer_dir: &Path,
        cache_dir: &Path,
        working_dir: &Path,
    ) -> ModlayerResult<()> {
        match self.strategy.install_args(cache_dir) {
            Some(args) => self.placement.run(args, layer_dir, working_dir).await,
            None => {
                self.validate_vendored(working_dir)?;
                self.logger.subprocess(format!(
                    "Reusing vendored {}",
                    self.settings.modules_dir
                ));
                self.placement.place(layer_dir, working_dir)?;
                Ok(())
            }
        }
    }

    /// The vendored tree must be a readable directory
    fn validate_vendored(&self, working_dir: &Path) -> ModlayerResult<()> {
        let path = working_dir.join(&self.settings.modules_dir);
        let metadata = std::fs::metadata(&path).map_err(|e| ModlayerError::ModulesInvalid {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        if !metadata.is_dir() {
            return Err(ModlayerError::ModulesInvalid {
                path,
                reason: "not a directory".to_string(),
            });
        }
        std::fs::read_dir(&path).map_err(|e| ModlayerError::ModulesInvalid {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
