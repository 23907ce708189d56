//! Error types for modlayer
//!
//! All modules use `ModlayerResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for modlayer operations
pub type ModlayerResult<T> = Result<T, ModlayerError>;

/// All errors that can occur in modlayer
#[derive(Error, Debug)]
pub enum ModlayerError {
    // Input errors
    #[error("Failed to read manifest {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Vendored modules at {path} are not usable: {reason}")]
    ModulesInvalid { path: PathBuf, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Invalid layer metadata at {path}: {reason}")]
    MetadataInvalid { path: PathBuf, reason: String },

    // Layer placement errors
    #[error("Cannot place layer at {path}: {reason}")]
    LayerPlacement { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {}", exit_code_display(.code))]
    CommandExit { command: String, code: Option<i32> },

    #[error("{command} failed: {source}\n{output}")]
    InstallFailed {
        command: String,
        output: String,
        #[source]
        source: Box<ModlayerError>,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Package manager error codes for network trouble
const TRANSIENT_MARKERS: &[&str] = &[
    "ETIMEDOUT",
    "ECONNRESET",
    "ECONNREFUSED",
    "EAI_AGAIN",
    "ESOCKETTIMEDOUT",
    "socket hang up",
];

fn exit_code_display(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl ModlayerError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a layer placement error
    pub fn placement(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::LayerPlacement {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a failed installation with the output it captured
    pub fn install_failed(
        command: impl Into<String>,
        output: impl Into<String>,
        source: ModlayerError,
    ) -> Self {
        Self::InstallFailed {
            command: command.into(),
            output: output.into(),
            source: Box::new(source),
        }
    }

    /// Check if error is retryable
    ///
    /// True for a child killed by a signal, or an install whose output shows
    /// a network failure. Resolution conflicts and missing packages fail the
    /// same way on every attempt. Nothing in this crate retries; the flag is
    /// for the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::CommandExit { code: None, .. } => true,
            Self::InstallFailed { output, source, .. } => {
                source.is_retryable()
                    || TRANSIENT_MARKERS.iter().any(|marker| output.contains(marker))
            }
            _ => false,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::CommandFailed { .. } => {
                Some("Check that the package manager is installed and on PATH")
            }
            Self::InstallFailed { .. } => {
                Some("Inspect the captured output above; network or resolution errors are common")
            }
            Self::ModulesInvalid { .. } => {
                Some("Remove the vendored module directory to force a fresh install")
            }
            Self::LayerPlacement { .. } => {
                Some("Remove the module directory symlink from the working directory")
            }
            _ => None,
        }
    }
}
