//! Resolve command - show the installation process that would be selected

use crate::build::{BuildLogger, ProcessResolver, Resolution};
use crate::cli::args::{OutputFormat, ResolveArgs};
use crate::cli::commands::{layers_dir, working_dir};
use crate::config::Config;
use crate::error::ModlayerResult;
use crate::layer::{CacheMetadata, LayerStore};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Execute the resolve command
pub async fn execute(args: ResolveArgs, config: &Config) -> ModlayerResult<()> {
    let working_dir = working_dir(args.working_dir)?;
    let (layer_dir, previous) = match args.layers_dir {
        Some(dir) => {
            let store = LayerStore::new(layers_dir(&dir)?);
            let record = store.load(&config.layers.modules).await?;
            (store.layer_dir(&config.layers.modules), record.metadata)
        }
        None => (PathBuf::new(), CacheMetadata::new()),
    };

    let logger = match args.format {
        OutputFormat::Text => BuildLogger::stdout(),
        OutputFormat::Json => BuildLogger::discard(),
    };
    let resolution = ProcessResolver::new(config.package_manager.clone(), logger)
        .resolve(&working_dir, &layer_dir, &previous)?;

    if let OutputFormat::Json = args.format {
        print_resolution_json(&resolution)?;
    }
    Ok(())
}

fn print_resolution_json(resolution: &Resolution) -> ModlayerResult<()> {
    #[derive(serde::Serialize)]
    struct ResolutionJson<'a> {
        inputs: BTreeMap<&'a str, bool>,
        strategy: String,
        process: &'a str,
        reproducible: bool,
    }

    let json = ResolutionJson {
        inputs: resolution
            .trace
            .inputs
            .iter()
            .map(|(name, found)| (name.as_str(), *found))
            .collect(),
        strategy: resolution.selection.strategy.to_string(),
        process: &resolution.trace.selected,
        reproducible: !resolution.selection.is_unpinned(),
    };

    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
