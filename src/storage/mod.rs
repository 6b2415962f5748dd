//! Configuration storage.

pub mod config;
pub mod paths;

pub use config::{
    CommandInputs, Config, ConfigSource, ConfigSources, DEFAULT_DAYS, ENV_CONFIG, ENV_DAYS,
    ENV_FORMAT, ENV_NO_COLOR, ENV_NO_COLOR_STD, ENV_PRETTY, ENV_PROVIDERS, MAX_DAYS,
    ResolvedConfig,
};
pub use paths::AppPaths;
