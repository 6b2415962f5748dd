//! Application paths for configuration.

use directories::ProjectDirs;
use std::path::PathBuf;

/// Application paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Configuration directory.
    pub config: PathBuf,
}

impl AppPaths {
    /// Create paths for the opsyield application.
    #[must_use]
    pub fn new() -> Self {
        ProjectDirs::from("io", "opsyield", "opsyield").map_or_else(
            || {
                let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
                Self {
                    config: home.join(".config/opsyield"),
                }
            },
            |proj_dirs| Self {
                config: proj_dirs.config_dir().to_path_buf(),
            },
        )
    }

    /// Path to the TOML config file.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

mod dirs {
    use std::path::PathBuf;

    pub fn home_dir() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_lives_in_config_dir() {
        let paths = AppPaths::new();
        let file = paths.config_file();
        assert!(file.starts_with(&paths.config));
        assert_eq!(file.file_name().and_then(|n| n.to_str()), Some("config.toml"));
    }

    #[test]
    fn config_dir_is_named_for_the_app() {
        let paths = AppPaths::new();
        assert!(paths.config.to_string_lossy().contains("opsyield"));
    }
}
