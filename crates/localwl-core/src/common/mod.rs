pub mod config;
pub mod constants;

pub use config::{ConfigError, EngineConfig, ShellPolicy, load_engine_config};
