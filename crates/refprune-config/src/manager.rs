use crate::types::{Credential, Settings};
use refprune_fs::{FileSystem, NativeFileSystem};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Environment variable that overrides the configured registry credential
pub const TOKEN_ENV_VAR: &str = "REFPRUNE_TOKEN";

/// Errors that can occur while loading or saving settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Config file not found at {0}")]
    ConfigNotFound(PathBuf),

    #[error("Invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Loads, validates and persists [`Settings`]
///
/// Settings live in `~/.refprune/config.toml` unless a path is given.
pub struct ConfigManager<F: FileSystem = NativeFileSystem> {
    fs: Arc<F>,
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Get the default config path (~/.refprune/config.toml)
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".refprune").join("config.toml"))
    }

    /// Load settings from the default location
    pub async fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?).await
    }

    /// Load settings from a specific path
    pub async fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let fs = Arc::new(NativeFileSystem::new(config_dir).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ConfigError::ConfigNotFound(path.to_path_buf())
            } else {
                ConfigError::Io(e)
            }
        })?);
        Self::load_with_filesystem(fs, path).await
    }

    /// Write default settings to `path` and return a manager for them
    pub async fn init_at(path: &Path) -> Result<Self, ConfigError> {
        let config_dir = path.parent().unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(config_dir).await?;
        let fs = Arc::new(NativeFileSystem::new(config_dir)?);

        let manager = Self {
            fs,
            config_path: path.to_path_buf(),
            settings: Settings::default(),
        };
        manager.save().await?;
        Ok(manager)
    }
}

impl<F: FileSystem> ConfigManager<F> {
    /// Load settings with a custom FileSystem
    pub async fn load_with_filesystem(fs: Arc<F>, path: &Path) -> Result<Self, ConfigError> {
        if !fs.exists(path).await? {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let contents = fs.read_to_string(path).await?;
        let settings: Settings = toml::from_str(&contents)?;
        validate(&settings)?;

        Ok(Self {
            fs,
            config_path: path.to_path_buf(),
            settings,
        })
    }

    /// Save settings atomically (temp file + rename)
    pub async fn save(&self) -> Result<(), ConfigError> {
        validate(&self.settings)?;
        let toml_str = toml::to_string_pretty(&self.settings)?;

        let temp_path = self.config_path.with_extension("toml.tmp");
        self.fs.write(&temp_path, &toml_str).await?;
        self.fs.rename(&temp_path, &self.config_path).await?;
        Ok(())
    }

    /// Replace the credential when a token is supplied (normally from
    /// [`TOKEN_ENV_VAR`])
    pub fn with_token_override(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.settings.credential = Some(Credential::new(token.trim()));
        }
        self
    }

    /// Get reference to the settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get mutable reference to the settings (caller must call save())
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Freeze the settings for sharing with the registry client and detectors
    pub fn into_shared(self) -> Arc<Settings> {
        Arc::new(self.settings)
    }
}

/// Check invariants serde can't express
pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if !matches!(settings.source.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            field: "source",
            reason: format!("unsupported scheme '{}'", settings.source.scheme()),
        });
    }
    if settings.lock_window == 0 {
        return Err(ConfigError::Invalid {
            field: "lock_window",
            reason: "must be at least 1".to_string(),
        });
    }
    if settings.requests_per_second == Some(0) {
        return Err(ConfigError::Invalid {
            field: "requests_per_second",
            reason: "must be at least 1".to_string(),
        });
    }
    if settings.timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            field: "timeout_secs",
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}
