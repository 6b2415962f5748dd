//! Environment detection utilities.

use std::io::IsTerminal;
use std::path::Path;

use crate::core::models::EnvSnapshot;

/// Check if stdout is a TTY.
#[must_use]
pub fn stdout_is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Check if stderr is a TTY.
#[must_use]
pub fn stderr_is_tty() -> bool {
    std::io::stderr().is_terminal()
}

/// Check if color should be enabled.
#[must_use]
pub fn should_use_color(no_color_flag: bool) -> bool {
    if no_color_flag || std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var("TERM").is_ok_and(|t| t == "dumb") {
        return false;
    }
    stdout_is_tty()
}

/// Whether the process appears to run inside a Docker container.
#[must_use]
pub fn in_docker() -> bool {
    Path::new("/.dockerenv").exists()
}

/// Capture the variables that influence how the cloud CLIs find credentials.
#[must_use]
pub fn snapshot() -> EnvSnapshot {
    let var = |key: &str| std::env::var(key).ok();
    EnvSnapshot {
        home: var("HOME"),
        user_profile: var("USERPROFILE"),
        aws_profile: var("AWS_PROFILE"),
        azure_config_dir: var("AZURE_CONFIG_DIR"),
        cloudsdk_config: var("CLOUDSDK_CONFIG"),
        path_len: std::env::var_os("PATH").map_or(0, |p| p.len()),
        pager: var("PAGER"),
        in_docker: in_docker(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_color_flag_wins() {
        assert!(!should_use_color(true));
    }

    #[test]
    fn snapshot_reads_path_length() {
        let snap = snapshot();
        let expected = std::env::var_os("PATH").map_or(0, |p| p.len());
        assert_eq!(snap.path_len, expected);
    }
}
