mod analyze;
mod config;

pub use analyze::{run_analysis, AnalyzeArgs};
pub use config::{handle_config_command, load_settings, ConfigCommand};
