//! Installation process selection
//!
//! Rules are checked in order and the first match wins:
//!
//! | # | Condition | Strategy |
//! |---|-----------|----------|
//! | 1 | lockfile, no modules, no cache | clean install |
//! | 2 | modules present | reuse in place |
//! | 3 | no lockfile | install (unpinned) |
//! | 4 | anything else | install |

use crate::build::log::BuildLogger;
use crate::build::signals::BuildSignals;
use crate::build::strategy::Strategy;
use crate::config::PackageManagerConfig;
use crate::error::ModlayerResult;
use crate::layer::CacheMetadata;
use std::path::Path;
use tracing::{debug, warn};

/// Which selection rule fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    PristineLockfile,
    VendoredModules,
    NoLockfile,
    Fallback,
}

/// Outcome of selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub strategy: Strategy,
    pub rule: Rule,
}

impl Selection {
    /// Versions are resolved without a lockfile
    pub fn is_unpinned(&self) -> bool {
        self.rule == Rule::NoLockfile
    }
}

/// Pick exactly one strategy for a set of signals
pub fn select(signals: &BuildSignals) -> Selection {
    let (strategy, rule) = if signals.lockfile && !signals.modules && !signals.cache {
        (Strategy::CleanInstall, Rule::PristineLockfile)
    } else if signals.modules {
        (Strategy::ReuseInPlace, Rule::VendoredModules)
    } else if !signals.lockfile {
        (Strategy::Install, Rule::NoLockfile)
    } else {
        (Strategy::Install, Rule::Fallback)
    };

    Selection { strategy, rule }
}

/// Human-readable account of a selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionTrace {
    /// (input name, found)
    pub inputs: Vec<(String, bool)>,
    pub selected: String,
    pub warning: Option<String>,
}

impl DecisionTrace {
    pub fn new(
        signals: &BuildSignals,
        selection: &Selection,
        settings: &PackageManagerConfig,
    ) -> Self {
        let inputs = vec![
            (settings.modules_dir.clone(), signals.modules),
            (settings.cache_dir.clone(), signals.cache),
            (settings.lockfile.clone(), signals.lockfile),
        ];
        let warning = selection.is_unpinned().then(|| {
            format!(
                "Warning: {} not found, dependency versions will be resolved without it",
                settings.lockfile
            )
        });

        Self {
            inputs,
            selected: selection.strategy.label(settings),
            warning,
        }
    }

    /// Write the trace; purely informational
    pub fn log(&self, logger: &BuildLogger, settings: &PackageManagerConfig) {
        logger.subprocess("Process inputs:");
        let entries: Vec<(&str, &str)> = self
            .inputs
            .iter()
            .map(|(name, found)| (name.as_str(), if *found { "Found" } else { "Not found" }))
            .collect();
        logger.key_values(&entries);
        logger.break_line();
        logger.subprocess(format!(
            "Selected {} build process: '{}'",
            settings.name.to_uppercase(),
            self.selected
        ));
        if let Some(warning) = &self.warning {
            logger.action(warning);
        }
        logger.break_line();
    }
}

/// A completed resolution
#[derive(Debug, Clone)]
pub struct Resolution {
    pub signals: BuildSignals,
    pub selection: Selection,
    pub trace: DecisionTrace,
}

/// Inspects the working directory and selects a strategy
#[derive(Debug, Clone)]
pub struct ProcessResolver {
    settings: PackageManagerConfig,
    logger: BuildLogger,
}

impl ProcessResolver {
    pub fn new(settings: PackageManagerConfig, logger: BuildLogger) -> Self {
        Self { settings, logger }
    }

    /// Select a strategy for `working_dir`; `previous` is the metadata
    /// recorded with the layer at `layer_dir`
    pub fn resolve(
        &self,
        working_dir: &Path,
        layer_dir: &Path,
        previous: &CacheMetadata,
    ) -> ModlayerResult<Resolution> {
        self.logger.process("Resolving installation process");

        let signals = BuildSignals::inspect(working_dir, layer_dir, &self.settings, previous)?;
        let selection = select(&signals);
        let trace = DecisionTrace::new(&signals, &selection, &self.settings);
        trace.log(&self.logger, &self.settings);

        debug!("Signals {:?} selected {:?}", signals, selection);
        if selection.is_unpinned() {
            warn!(
                "No {} in {}, install is not reproducible",
                self.settings.lockfile,
                working_dir.display()
            );
        }

        Ok(Resolution {
            signals,
            selection,
            trace,
        })
    }
}
