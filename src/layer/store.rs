//! On-disk layer records
//!
//! Each layer `<name>` lives at `<layers>/<name>/` and is described by a
//! sibling `<layers>/<name>.toml` holding its metadata and environment.

use crate::error::{ModlayerError, ModlayerResult};
use crate::layer::metadata::CacheMetadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

/// Persisted description of a layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerRecord {
    /// Cache metadata (fingerprint, build time, anything else)
    pub metadata: CacheMetadata,

    /// Environment the layer contributes to the image
    pub env: BTreeMap<String, String>,
}

/// Reads and writes layer records under a layers directory
#[derive(Debug, Clone)]
pub struct LayerStore {
    root: PathBuf,
}

impl LayerStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding a layer's contents
    pub fn layer_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.toml", name))
    }

    /// Load a layer record; a layer never written yields an empty record
    pub async fn load(&self, name: &str) -> ModlayerResult<LayerRecord> {
        let path = self.record_path(name);
        if !path.exists() {
            debug!("No record for layer {}, starting empty", name);
            return Ok(LayerRecord::default());
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| ModlayerError::io(format!("reading layer record {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| ModlayerError::MetadataInvalid {
            path,
            reason: e.to_string(),
        })
    }

    /// Persist a layer record, creating the layers directory if needed
    pub async fn save(&self, name: &str, record: &LayerRecord) -> ModlayerResult<()> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            ModlayerError::io(format!("creating layers dir {}", self.root.display()), e)
        })?;

        let path = self.record_path(name);
        let content = toml::to_string_pretty(record)?;
        fs::write(&path, content)
            .await
            .map_err(|e| ModlayerError::io(format!("writing layer record {}", path.display()), e))?;

        debug!("Saved layer record {}", path.display());
        Ok(())
    }

    /// Drop the recorded fingerprint of layer `name`, keeping everything else.
    ///
    /// Called before the layer contents are rewritten, so an interrupted or
    /// failed build can never be mistaken for the tree it replaced.
    pub async fn invalidate(&self, name: &str) -> ModlayerResult<()> {
        let mut record = self.load(name).await?;
        if record.metadata.cache_sha().is_none() {
            return Ok(());
        }

        record.metadata.invalidate();
        self.save(name, &record).await?;
        debug!("Invalidated fingerprint of layer {}", name);
        Ok(())
    }
}
