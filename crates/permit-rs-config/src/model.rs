//! Configuration schema for permit.

use serde::{Deserialize, Serialize};

/// Root config for the permission gateway.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PermitConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl PermitConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> PermitConfigBuilder {
        PermitConfigBuilder::new()
    }
}

/// Builder for assembling a `PermitConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct PermitConfigBuilder {
    config: PermitConfig,
}

impl PermitConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: PermitConfig::default(),
        }
    }

    /// Replace the queue configuration.
    pub fn queue(mut self, queue: QueueConfig) -> Self {
        self.config.queue = queue;
        self
    }

    /// Replace the gateway configuration.
    pub fn gateway(mut self, gateway: GatewayConfig) -> Self {
        self.config.gateway = gateway;
        self
    }

    /// Finalize and return the built `PermitConfig`.
    pub fn build(self) -> PermitConfig {
        self.config
    }
}

/// Per-container queue settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueConfig {
    /// Reserved token base; the first issued token is one above it.
    #[serde(default = "default_first_token")]
    pub first_token: u64,
    /// Let duplicate requests join the in-flight entry, not only pending ones.
    #[serde(default = "default_share_in_flight")]
    pub share_in_flight: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            first_token: default_first_token(),
            share_in_flight: default_share_in_flight(),
        }
    }
}

fn default_first_token() -> u64 {
    10
}

fn default_share_in_flight() -> bool {
    true
}

/// Caller-facing gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Answer immediately when every permission is already granted.
    #[serde(default = "default_fast_path")]
    pub fast_path: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            fast_path: default_fast_path(),
        }
    }
}

fn default_fast_path() -> bool {
    true
}
