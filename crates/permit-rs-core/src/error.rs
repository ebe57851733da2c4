//! Error types for the permission gateway.

use permit_rs_config::ConfigError;
use thiserror::Error;

/// Non-grant outcomes of a permission request.
///
/// A denial is not an error; it arrives as `GrantStatus::Denied` entries.
#[derive(Debug, Error)]
pub enum PermitError {
    /// The owning container was torn down before the host answered.
    #[error("permission request cancelled")]
    Cancelled,
    /// The queue has no request tokens left to assign.
    #[error("permission request tokens exhausted")]
    TokensExhausted,
    /// No permissions were named.
    #[error("permission request is empty")]
    EmptyRequest,
    /// Config loading or validation failed.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}
