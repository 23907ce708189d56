//! Build pipeline
//!
//! One build runs strictly in sequence:
//!
//! 1. [`ProcessResolver`] inspects the working directory and picks a strategy
//! 2. [`BuildProcess::should_run`] compares the lockfile fingerprint with the
//!    recorded one
//! 3. On a hit the layer is reused; otherwise the stored fingerprint is
//!    dropped and [`BuildProcess::run`] places the layer and runs the
//!    package manager
//! 4. The new metadata and layer environment are handed back to the caller
//!    to persist

pub mod environment;
pub mod gate;
pub mod log;
pub mod placement;
pub mod resolver;
pub mod signals;
pub mod strategy;

pub use environment::LayerEnvironment;
pub use log::{BuildLogger, LogBuffer};
pub use placement::Placement;
pub use resolver::{select, DecisionTrace, ProcessResolver, Resolution, Rule, Selection};
pub use signals::BuildSignals;
pub use strategy::{BuildProcess, RunDecision, Strategy};

use crate::config::PackageManagerConfig;
use crate::error::ModlayerResult;
use crate::layer::{CacheMetadata, LayerStore};
use crate::process::Executable;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Inputs supplied by whoever drives the build
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Project root
    pub working_dir: PathBuf,
    /// Modules layer directory
    pub layer_dir: PathBuf,
    /// Package manager cache layer directory
    pub cache_dir: PathBuf,
    /// Metadata recorded by the previous build
    pub metadata: CacheMetadata,
}

/// What the build did and what should be persisted
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub strategy: Strategy,
    /// The previous layer was reused without running anything
    pub reused: bool,
    pub metadata: CacheMetadata,
    pub environment: LayerEnvironment,
}

/// Runs the whole pipeline for one project
#[derive(Clone)]
pub struct Builder {
    settings: PackageManagerConfig,
    executable: Arc<dyn Executable>,
    logger: BuildLogger,
    record: Option<(LayerStore, String)>,
}

impl Builder {
    pub fn new(
        settings: PackageManagerConfig,
        executable: Arc<dyn Executable>,
        logger: BuildLogger,
    ) -> Self {
        Self {
            settings,
            executable,
            logger,
            record: None,
        }
    }

    /// Keep the persisted record of layer `name` in `store` from vouching
    /// for a layer that is being rewritten.
    ///
    /// Without a store, a caller that persists metadata itself must drop the
    /// fingerprint when [`build`](Self::build) fails.
    pub fn with_store(mut self, store: LayerStore, name: impl Into<String>) -> Self {
        self.record = Some((store, name.into()));
        self
    }

    pub async fn build(&self, request: &BuildRequest) -> ModlayerResult<BuildOutcome> {
        let resolution = ProcessResolver::new(self.settings.clone(), self.logger.clone())
            .resolve(&request.working_dir, &request.layer_dir, &request.metadata)?;

        let process = BuildProcess::new(
            resolution.selection.strategy,
            self.settings.clone(),
            self.executable.clone(),
            self.logger.clone(),
        );
        let decision = process.should_run(&request.working_dir, &request.metadata)?;

        let mut metadata = request.metadata.clone();
        if decision.run {
            // A vendored cache takes precedence over the cache layer
            let cache_dir = if resolution.signals.cache {
                request.working_dir.join(&self.settings.cache_dir)
            } else {
                request.cache_dir.clone()
            };

            metadata.invalidate();
            if let Some((store, name)) = &self.record {
                store.invalidate(name).await?;
            }

            self.logger.process("Executing build process");
            process
                .run(&request.layer_dir, &cache_dir, &request.working_dir)
                .await?;
            self.logger.break_line();

            metadata.record_build(&decision.fingerprint, Utc::now());
            metadata.record_strategy(process.strategy().as_str());
            info!(
                "Built layer {} with {}",
                request.layer_dir.display(),
                process.strategy()
            );
        } else {
            self.logger.process(format!(
                "Reusing cached layer {}",
                request.layer_dir.display()
            ));
            self.logger.break_line();
            process
                .placement()
                .relink(&request.layer_dir, &request.working_dir)?;
            info!("Reused layer {}", request.layer_dir.display());
        }

        let environment = LayerEnvironment::new(&self.settings, &request.layer_dir);
        environment.log(&self.logger);

        Ok(BuildOutcome {
            strategy: process.strategy(),
            reused: !decision.run,
            metadata,
            environment,
        })
    }
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
