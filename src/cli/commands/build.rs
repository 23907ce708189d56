//! Build command - install dependencies into the modules layer

use crate::build::{BuildLogger, BuildRequest, Builder};
use crate::cli::args::BuildArgs;
use crate::cli::commands::{layers_dir, working_dir};
use crate::config::Config;
use crate::error::ModlayerResult;
use crate::layer::{LayerRecord, LayerStore};
use crate::process::CommandExecutable;
use std::sync::Arc;
use tracing::debug;

/// Execute the build command
pub async fn execute(args: BuildArgs, config: &Config) -> ModlayerResult<()> {
    let working_dir = working_dir(args.working_dir)?;
    let store = LayerStore::new(layers_dir(&args.layers_dir)?);
    let layers = &config.layers;

    let record = store.load(&layers.modules).await?;
    debug!(
        "Previous fingerprint: {}",
        record.metadata.cache_sha().unwrap_or("<none>")
    );

    let logger = BuildLogger::stdout();
    logger.title(format!(
        "{} {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    ));

    let executable = Arc::new(CommandExecutable::new(&config.package_manager.command)?);
    let builder = Builder::new(config.package_manager.clone(), executable, logger)
        .with_store(store.clone(), layers.modules.clone());

    let request = BuildRequest {
        working_dir,
        layer_dir: store.layer_dir(&layers.modules),
        cache_dir: store.layer_dir(&layers.cache),
        metadata: record.metadata,
    };
    let outcome = builder.build(&request).await?;

    if !outcome.reused {
        let record = LayerRecord {
            metadata: outcome.metadata,
            env: outcome.environment.to_map(),
        };
        store.save(&layers.modules, &record).await?;
    }

    Ok(())
}
