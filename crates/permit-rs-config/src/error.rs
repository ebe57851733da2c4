//! Errors raised while loading permit config layers.

use std::path::PathBuf;
use thiserror::Error;

/// Why a config layer, or the merged config, was rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer file (or the working directory) could not be read.
    #[error("cannot read {layer} config {}: {source}", .path.display())]
    ReadFailed {
        layer: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A layer file, or inline contents, is not valid JSON5.
    #[error("cannot parse {layer} config{}: {source}", describe_path(.path))]
    ParseFailed {
        layer: String,
        path: Option<PathBuf>,
        #[source]
        source: json5::Error,
    },
    /// The JSON value does not fit the config model.
    #[error("cannot decode {layer} config: {source}")]
    DecodeFailed {
        layer: String,
        #[source]
        source: serde_json::Error,
    },
    /// A specific field failed validation.
    #[error("invalid config at {path}: {message}")]
    InvalidField { path: String, message: String },
}

fn describe_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|path| format!(" {}", path.display()))
        .unwrap_or_default()
}

impl ConfigError {
    /// Name of the layer that failed, when the error is tied to one.
    pub fn layer(&self) -> Option<&str> {
        match self {
            ConfigError::ReadFailed { layer, .. }
            | ConfigError::ParseFailed { layer, .. }
            | ConfigError::DecodeFailed { layer, .. } => Some(layer),
            ConfigError::InvalidField { .. } => None,
        }
    }
}
