use std::fs;
use std::path::{Path, PathBuf};
use crate::common::{AttendanceError, Result};

/// The token from the last successful login, kept in a single file.
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!("Cached token in {}", self.path.display());
        Ok(())
    }

    pub fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// An explicit token wins over the cached one.
    pub fn resolve(&self, explicit: Option<String>) -> Result<String> {
        if let Some(token) = explicit {
            return Ok(token);
        }
        self.load()?.ok_or_else(|| {
            AttendanceError::Unauthorized("not logged in; run `rollcall teacher login` first".to_string())
        })
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
