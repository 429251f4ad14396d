use std::path::PathBuf;
use directories::ProjectDirs;
use crate::common::{AttendanceError, Config, DevMode, Result};

pub const SYSTEM_SOCKET_PATH: &str = "/run/rollcall/service.sock";

pub fn system_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/rollcall")
}

pub fn system_config_file() -> PathBuf {
    PathBuf::from("/etc/rollcall/rollcall.toml")
}

/// Where record files live: explicit config, then dev dir, then the system dir.
pub fn resolve_data_dir(config: &Config, dev_mode: &DevMode) -> PathBuf {
    if let Some(dir) = &config.storage.data_dir {
        return dir.clone();
    }
    if dev_mode.is_enabled() {
        return dev_mode.data_dir();
    }
    system_data_dir()
}

/// File holding the token from the last successful login.
pub fn token_cache_file(dev_mode: &DevMode) -> Result<PathBuf> {
    if dev_mode.is_enabled() {
        return Ok(dev_mode.config_dir().join("token"));
    }
    let dirs = ProjectDirs::from("org", "rollcall", "Rollcall")
        .ok_or_else(|| AttendanceError::Storage("Failed to get project dirs".into()))?;
    Ok(dirs.config_dir().join("token"))
}
