//! Layered configuration loader.
//!
//! Discovers configuration layers (system/user/cwd/runtime), validates schema,
//! merges them in precedence order, and produces a final `PermitConfig`.

mod layer_io;
mod merge;
mod paths;
mod schema;


use crate::{ConfigError, PermitConfig};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "permit.json5";
/// Default config directory under the user's home.
const DEFAULT_CONFIG_DIR: &str = ".permit";

/// Lowest token base that still leaves room for issued tokens.
const MAX_FIRST_TOKEN: u64 = u64::MAX / 2;

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: PermitConfig,
    /// Metadata for each layer that contributed.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// System-wide configuration.
    System,
    /// User-specific configuration.
    User,
    /// Current working directory configuration.
    Cwd,
    /// Runtime overrides (highest precedence).
    Runtime,
}

impl ConfigLayerSource {
    /// Short name used in logs and errors.
    pub fn label(self) -> &'static str {
        match self {
            ConfigLayerSource::System => "system",
            ConfigLayerSource::User => "user",
            ConfigLayerSource::Cwd => "cwd",
            ConfigLayerSource::Runtime => "runtime",
        }
    }
}

/// Metadata about a loaded config layer.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    /// Layer origin.
    pub source: ConfigLayerSource,
    /// Location on disk.
    pub path: Option<PathBuf>,
}

/// Options controlling layered config discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to resolve the cwd layer.
    pub cwd: PathBuf,
    /// Optional system config path (defaults to `/etc/permit/permit.json5` on Unix).
    pub system_config_path: Option<PathBuf>,
    /// Optional user config path (defaults to `~/.permit/permit.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Runtime override config paths applied last.
    pub runtime_paths: Vec<PathBuf>,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations for the provided cwd.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            system_config_path: paths::system_config_path(),
            user_config_path: paths::user_config_path(),
            runtime_paths: Vec::new(),
        }
    }

    /// Add a runtime override config path that is applied last.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl PermitConfig {
    /// Load a single config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("loading config from path: {}", path.display());
        let value = layer_io::read_json5("explicit", path)?;
        config_from_value(value, "explicit")
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value =
            json5::from_str(contents).map_err(|source| ConfigError::ParseFailed {
                layer: "inline".to_string(),
                path: None,
                source,
            })?;
        config_from_value(value, "inline")
    }

    /// Load a layered config stack using the default layer locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load a layered config stack using explicit layer locations and overrides.
    ///
    /// Layer precedence (low -> high): system, user, cwd, runtime overrides.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = paths::resolve_cwd(&options.cwd)?;
        debug!("normalized cwd for config load: {}", cwd.display());
        let cwd_path = cwd.join(DEFAULT_CONFIG_FILE);

        let candidates = [
            (ConfigLayerSource::System, options.system_config_path.as_deref()),
            (ConfigLayerSource::User, options.user_config_path.as_deref()),
            (ConfigLayerSource::Cwd, Some(cwd_path.as_path())),
        ]
        .into_iter()
        .filter_map(|(source, path)| path.map(|path| (source, path)))
        .chain(
            options
                .runtime_paths
                .iter()
                .map(|path| (ConfigLayerSource::Runtime, path.as_path())),
        );

        let mut layers = Vec::new();
        let mut merged = Value::Object(serde_json::Map::new());
        let mut seen_paths = HashSet::new();
        for (source, path) in candidates {
            let required = source == ConfigLayerSource::Runtime;
            let Some(loaded) = layer_io::load_layer(source, path, required)? else {
                continue;
            };
            if !seen_paths.insert(paths::dedup_key(path)) {
                debug!(
                    "skipping duplicate layer (layer={}, path={})",
                    source.label(),
                    path.display()
                );
                continue;
            }
            merge::merge_json_values(&mut merged, &loaded.value);
            layers.push(loaded.meta);
        }

        let config = config_from_value(merged, "effective")?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Validate configuration invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.first_token > MAX_FIRST_TOKEN {
            return Err(ConfigError::InvalidField {
                path: "queue.first_token".to_string(),
                message: format!("must be at most {MAX_FIRST_TOKEN}"),
            });
        }
        Ok(())
    }
}

/// Internal representation of a loaded config layer.
#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<PermitConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: PermitConfig =
        serde_json::from_value(value).map_err(|source| ConfigError::DecodeFailed {
            layer: label.to_string(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}
