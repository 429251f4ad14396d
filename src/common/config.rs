use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::common::error::{AttendanceError, Result};
use crate::core::similarity::SAME_PERSON_THRESHOLD;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub checkin: CheckinConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CheckinConfig {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

fn default_similarity_threshold() -> f64 { SAME_PERSON_THRESHOLD }

impl Default for CheckinConfig {
    fn default() -> Self {
        Self { similarity_threshold: default_similarity_threshold() }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// Root of the record files. Falls back to the platform data dir when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_seconds: u64,
    #[serde(default = "default_write_timeout")]
    pub write_timeout_seconds: u64,
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

fn default_socket_path() -> PathBuf { PathBuf::from(crate::common::paths::SYSTEM_SOCKET_PATH) }
fn default_read_timeout() -> u64 { 10 }
fn default_write_timeout() -> u64 { 5 }
fn default_max_message_bytes() -> usize { 16 * 1024 * 1024 }

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            read_timeout_seconds: default_read_timeout(),
            write_timeout_seconds: default_write_timeout(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_hours: u32,
    #[serde(default = "default_password_iterations")]
    pub password_iterations: u32,
}

fn default_secret_env() -> String { "JWT_SECRET".to_string() }
fn default_token_ttl() -> u32 { 24 }
fn default_password_iterations() -> u32 { 10_000 }

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_env: default_secret_env(),
            token_ttl_hours: default_token_ttl(),
            password_iterations: default_password_iterations(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = "configs/rollcall.toml";
        Self::load_from_path(Path::new(config_path))
    }

    /// Dev mode reads the repo config, otherwise the system one. Without
    /// either file the defaults apply.
    pub fn discover(dev_mode: bool) -> Result<Self> {
        let candidates = if dev_mode {
            vec![PathBuf::from("configs/rollcall.toml")]
        } else {
            vec![crate::common::paths::system_config_file(), PathBuf::from("configs/rollcall.toml")]
        };

        match candidates.iter().find(|p| p.exists()) {
            Some(path) => Self::load_from_path(path),
            None => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AttendanceError::Config(format!(
                "Config file not found: {}. Please create it from configs/rollcall.toml.",
                path.display()
            )));
        }

        tracing::info!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| AttendanceError::Config(format!("Config parse error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.checkin.similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(AttendanceError::Config(format!(
                "Similarity threshold must be between 0.0 and 1.0, got {}", threshold
            )));
        }

        if self.service.read_timeout_seconds < 1 || self.service.read_timeout_seconds > 300 {
            return Err(AttendanceError::Config(format!(
                "Read timeout must be between 1 and 300 seconds, got {}",
                self.service.read_timeout_seconds
            )));
        }
        if self.service.write_timeout_seconds < 1 || self.service.write_timeout_seconds > 300 {
            return Err(AttendanceError::Config(format!(
                "Write timeout must be between 1 and 300 seconds, got {}",
                self.service.write_timeout_seconds
            )));
        }

        // Candidate photos travel inside a single message
        if self.service.max_message_bytes < 64 * 1024 {
            return Err(AttendanceError::Config(format!(
                "Message limit must be at least 65536 bytes, got {}",
                self.service.max_message_bytes
            )));
        }

        if self.auth.token_ttl_hours < 1 || self.auth.token_ttl_hours > 24 * 30 {
            return Err(AttendanceError::Config(format!(
                "Token lifetime must be between 1 and 720 hours, got {}",
                self.auth.token_ttl_hours
            )));
        }
        if self.auth.password_iterations == 0 {
            return Err(AttendanceError::Config(
                "Password iterations must be at least 1".to_string()
            ));
        }
        if self.auth.secret_env.trim().is_empty() {
            return Err(AttendanceError::Config(
                "auth.secret_env must name an environment variable".to_string()
            ));
        }

        Ok(())
    }
}
