//! Path utilities for sitepack data directories

use std::path::PathBuf;
use std::sync::OnceLock;

/// Global storage for custom data directory path
static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize the data directory with an optional custom path.
/// Call early in main() before any other path functions are used.
/// If custom_path is None, uses the default ~/.sitepack location.
pub fn init_data_dir(custom_path: Option<PathBuf>) {
    let path = custom_path.unwrap_or_else(default_data_dir);
    if DATA_DIR.set(path.clone()).is_err() {
        let existing = DATA_DIR
            .get()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        tracing::debug!(
            path = %path.display(),
            existing = %existing,
            "Data directory already initialized"
        );
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".sitepack"))
        .unwrap_or_else(|| PathBuf::from(".sitepack"))
}

/// Base data directory; the custom path if set, otherwise ~/.sitepack
pub fn data_dir() -> PathBuf {
    DATA_DIR.get().cloned().unwrap_or_else(default_data_dir)
}

/// ~/.sitepack/logs
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// ~/.sitepack/logs/sitepack.log
pub fn log_file_path() -> PathBuf {
    logs_dir().join("sitepack.log")
}

/// ~/.sitepack/config.toml
pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}
