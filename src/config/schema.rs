//! Configuration schema for modlayer
//!
//! Configuration is stored at `~/.config/modlayer/config.toml`

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Package manager invocation settings
    pub package_manager: PackageManagerConfig,

    /// Layer naming
    pub layers: LayersConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Package manager settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageManagerConfig {
    /// Name used in the build log and in error messages
    pub name: String,

    /// Program and leading arguments used to launch the package manager
    pub command: Vec<String>,

    /// Lockfile whose bytes are fingerprinted
    pub lockfile: String,

    /// Module directory produced in the working directory
    pub modules_dir: String,

    /// Vendored package-manager cache inside the working directory
    pub cache_dir: String,

    /// Install production dependencies only
    pub production: bool,

    /// Package manager log level
    pub log_level: String,
}

impl Default for PackageManagerConfig {
    fn default() -> Self {
        Self {
            name: "npm".to_string(),
            command: vec!["npm".to_string()],
            lockfile: "package-lock.json".to_string(),
            modules_dir: "node_modules".to_string(),
            cache_dir: "npm-cache".to_string(),
            production: true,
            log_level: "error".to_string(),
        }
    }
}

impl PackageManagerConfig {
    /// Fixed environment handed to every installing subprocess
    pub fn install_env(&self) -> Vec<(String, String)> {
        vec![
            (
                "NPM_CONFIG_PRODUCTION".to_string(),
                self.production.to_string(),
            ),
            ("NPM_CONFIG_LOGLEVEL".to_string(), self.log_level.clone()),
        ]
    }
}

/// Layer names under the layers directory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayersConfig {
    /// Layer holding the installed module tree
    pub modules: String,

    /// Layer used as the package manager's download cache
    pub cache: String,
}

impl Default for LayersConfig {
    fn default() -> Self {
        Self {
            modules: "modules".to_string(),
            cache: "npm-cache".to_string(),
        }
    }
}
