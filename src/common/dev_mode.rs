use std::path::PathBuf;
use std::fs;
use crate::common::error::Result;

pub const DEV_SOCKET_PATH: &str = "/tmp/rollcall.sock";

#[derive(Debug, Clone)]
pub struct DevMode {
    enabled: bool,
    base_dir: PathBuf,
}

impl DevMode {
    pub fn new(enabled: bool) -> Result<Self> {
        Self::with_base_dir(enabled, PathBuf::from("./dev_data"))
    }

    pub fn with_base_dir(enabled: bool, base_dir: PathBuf) -> Result<Self> {
        // Create dev directories if in dev mode
        if enabled {
            fs::create_dir_all(&base_dir)?;
            fs::create_dir_all(base_dir.join("data"))?;
            fs::create_dir_all(base_dir.join("config"))?;

            tracing::debug!("Development mode enabled - data will be saved to: {}",
                            base_dir.display());
        }

        Ok(Self { enabled, base_dir })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn data_dir(&self) -> PathBuf {
        if self.enabled {
            self.base_dir.join("data")
        } else {
            // This should not be called when not in dev mode
            panic!("data_dir() called when dev mode is disabled")
        }
    }

    pub fn config_dir(&self) -> PathBuf {
        if self.enabled {
            self.base_dir.join("config")
        } else {
            panic!("config_dir() called when dev mode is disabled")
        }
    }

    pub fn socket_path(&self) -> PathBuf {
        if self.enabled {
            PathBuf::from(DEV_SOCKET_PATH)
        } else {
            PathBuf::from(crate::common::paths::SYSTEM_SOCKET_PATH)
        }
    }
}
