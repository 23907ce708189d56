//! Environment contributed by the modules layer

use crate::build::log::BuildLogger;
use crate::config::PackageManagerConfig;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Variables the layer sets for later build steps and the running image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerEnvironment {
    /// Variables replaced outright
    pub overrides: Vec<(String, String)>,
    /// Directory appended to PATH
    pub path_append: PathBuf,
}

impl LayerEnvironment {
    pub fn new(settings: &PackageManagerConfig, layer_dir: &Path) -> Self {
        let mut overrides = settings.install_env();
        overrides.sort();
        Self {
            overrides,
            path_append: layer_dir.join(&settings.modules_dir).join(".bin"),
        }
    }

    /// Flattened form for persistence: `NAME.override` and `PATH.append`
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map: BTreeMap<String, String> = self
            .overrides
            .iter()
            .map(|(k, v)| (format!("{}.override", k), v.clone()))
            .collect();
        map.insert(
            "PATH.append".to_string(),
            self.path_append.display().to_string(),
        );
        map
    }

    pub fn log(&self, logger: &BuildLogger) {
        logger.process("Configuring environment");
        let mut entries: Vec<(String, String)> = self.overrides.clone();
        entries.push((
            "PATH".to_string(),
            format!("$PATH:{}", self.path_append.display()),
        ));
        let width = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (key, value) in &entries {
            logger.subprocess(format!("{:<width$} -> \"{}\"", key, value, width = width));
        }
        logger.break_line();
    }
}
