//! Where config layers live on disk.

use super::{DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILE};
use crate::ConfigError;
use directories::UserDirs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// `/etc/permit/permit.json5` on Unix; no system layer elsewhere.
pub(super) fn system_config_path() -> Option<PathBuf> {
    if cfg!(unix) {
        Some(Path::new("/etc/permit").join(DEFAULT_CONFIG_FILE))
    } else {
        None
    }
}

/// `~/.permit/permit.json5`, when a home directory is known.
pub(super) fn user_config_path() -> Option<PathBuf> {
    let dirs = UserDirs::new()?;
    Some(dirs.home_dir().join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILE))
}

/// Resolve the working directory; one that does not exist yet is kept as given.
pub(super) fn resolve_cwd(cwd: &Path) -> Result<PathBuf, ConfigError> {
    cwd.canonicalize().or_else(|err| match err.kind() {
        ErrorKind::NotFound => Ok(cwd.to_path_buf()),
        _ => Err(ConfigError::ReadFailed {
            layer: "cwd".to_string(),
            path: cwd.to_path_buf(),
            source: err,
        }),
    })
}

/// Key identifying a layer file, so the same file is never merged twice.
pub(super) fn dedup_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
