pub mod manager;
pub mod types;

pub use manager::{ConfigError, ConfigManager, TOKEN_ENV_VAR};
pub use types::{Credential, Settings, DEFAULT_LOCK_WINDOW, DEFAULT_SOURCE};
