//! Reading single config layers from disk.

use super::{ConfigLayer, ConfigLayerSource, LoadedLayer, schema};
use crate::ConfigError;
use log::debug;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Read and parse one JSON5 file, tagging failures with `layer` and the path.
pub(super) fn read_json5(layer: &str, path: &Path) -> Result<Value, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
        layer: layer.to_string(),
        path: path.to_path_buf(),
        source,
    })?;
    json5::from_str(&contents).map_err(|source| ConfigError::ParseFailed {
        layer: layer.to_string(),
        path: Some(path.to_path_buf()),
        source,
    })
}

/// Load and schema-check the layer at `path`.
///
/// A missing file is skipped unless the layer is `required`; any other failure
/// is an error naming the layer.
pub(super) fn load_layer(
    source: ConfigLayerSource,
    path: &Path,
    required: bool,
) -> Result<Option<LoadedLayer>, ConfigError> {
    if !required && !path.exists() {
        debug!(
            "config layer absent (layer={}, path={})",
            source.label(),
            path.display()
        );
        return Ok(None);
    }

    debug!(
        "loading config layer (layer={}, path={})",
        source.label(),
        path.display()
    );
    let value = read_json5(source.label(), path)?;
    schema::validate_layer_schema(&value, &format!("{}({})", source.label(), path.display()))?;
    Ok(Some(LoadedLayer {
        meta: ConfigLayer {
            source,
            path: Some(path.to_path_buf()),
        },
        value,
    }))
}
