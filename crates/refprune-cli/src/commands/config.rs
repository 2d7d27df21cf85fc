use anyhow::{Context, Result};
use clap::Subcommand;
use refprune_config::{ConfigError, ConfigManager, Credential, Settings, TOKEN_ENV_VAR};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a default config file
    Init,

    /// Show config file path
    Path,

    /// Print the effective settings (credential redacted)
    Show,

    /// Validate config file
    Validate,
}

pub async fn handle_config_command(cmd: ConfigCommand, config: Option<&Path>) -> Result<ExitCode> {
    match cmd {
        ConfigCommand::Init => init_config(config).await?,
        ConfigCommand::Path => println!("{}", config_path(config)?.display()),
        ConfigCommand::Show => show_config(config).await?,
        ConfigCommand::Validate => validate_config(config).await?,
    }
    Ok(ExitCode::SUCCESS)
}

fn config_path(config: Option<&Path>) -> Result<PathBuf> {
    match config {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(ConfigManager::config_path()?),
    }
}

/// Settings for a run: the given file (which must exist), else the default
/// file when present, else defaults. `REFPRUNE_TOKEN` overrides the
/// credential either way.
pub async fn load_settings(config: Option<&Path>) -> Result<Settings> {
    let token = std::env::var(TOKEN_ENV_VAR).ok();
    let manager = match config {
        Some(path) => ConfigManager::load_from(path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => match ConfigManager::load().await {
            Ok(manager) => manager,
            Err(ConfigError::ConfigNotFound(_) | ConfigError::HomeNotFound) => {
                tracing::debug!("no config file, using defaults");
                let mut settings = Settings::default();
                if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
                    settings.credential = Some(Credential::new(token.trim()));
                }
                return Ok(settings);
            }
            Err(e) => return Err(e).context("Failed to load config"),
        },
    };
    Ok(manager.with_token_override(token).settings().clone())
}

async fn init_config(config: Option<&Path>) -> Result<()> {
    let path = config_path(config)?;
    if path.exists() {
        println!("Config already exists at: {}", path.display());
        println!("To reinitialize, please delete the existing config first.");
        return Ok(());
    }

    ConfigManager::init_at(&path).await?;
    println!("Initialized config at: {}", path.display());
    Ok(())
}

async fn show_config(config: Option<&Path>) -> Result<()> {
    let mut settings = load_settings(config).await?;
    if settings.credential.is_some() {
        settings.credential = Some(Credential::new("***"));
    }
    print!("{}", toml::to_string_pretty(&settings)?);
    Ok(())
}

async fn validate_config(config: Option<&Path>) -> Result<()> {
    let path = config_path(config)?;
    ConfigManager::load_from(&path)
        .await
        .with_context(|| format!("Invalid config at {}", path.display()))?;
    println!("Config at {} is valid", path.display());
    Ok(())
}
