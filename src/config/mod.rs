//! Configuration file loading and parsing.
//!
//! # Configuration Sources
//!
//! Settings are layered, later sources winning:
//!
//! 1. Built-in defaults
//! 2. JSON configuration file:
//!    - path given via the `CONFIG_FILE` CLI argument (must exist), or
//!    - **Linux/macOS:** `~/.todo-widget-mcp/config.json`
//!    - **Windows:** `%USERPROFILE%\.todo-widget-mcp\config.json`
//! 3. Environment: `WIDGET_ORIGIN`, `BACKEND_ORIGIN`, `PORT`
//!
//! A missing default file is not an error; the server runs on defaults.

mod settings;

pub use settings::{
    Config, LoggingConfig, ServerConfig, WidgetConfig, ENV_BACKEND_ORIGIN, ENV_PORT,
    ENV_WIDGET_ORIGIN,
};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns the default configuration directory.
///
/// - **Linux/macOS:** `~/.todo-widget-mcp/`
/// - **Windows:** `%USERPROFILE%\.todo-widget-mcp\`
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".todo-widget-mcp"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads the configuration file, then applies environment overrides.
///
/// If `path` is `None`, the platform-specific default location is used when
/// it exists and built-in defaults otherwise.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given configuration file cannot be found
/// - The file cannot be read
/// - The JSON is malformed
/// - An environment override is malformed
/// - Any field fails validation
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => read_config_file(p)?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(p) => read_config_file(&p)?,
            None => Config::default(),
        },
    };

    config.apply_env(|key| std::env::var(key).ok())?;

    // Validate the configuration
    config.validate()?;

    Ok(config)
}

/// Reads and parses a configuration file without applying overrides.
///
/// # Errors
///
/// Returns an error if the file is missing, unreadable, or malformed.
pub fn read_config_file(config_path: &Path) -> Result<Config, ConfigError> {
    if !config_path.exists() {
        return Err(ConfigError::NotFound {
            path: config_path.to_path_buf(),
        });
    }

    let contents = std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: config_path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_config_dir_exists() {
        assert!(default_config_dir().is_some());
    }

    #[test]
    fn default_config_path_exists() {
        let path = default_config_path();
        assert!(path.is_some());
        assert!(path.unwrap().to_string_lossy().contains("config.json"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_config_file(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn read_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "server": {{ "port": 4321 }}, "widget": {{ "origin": "https://w.example.com" }} }}"#
        )
        .unwrap();

        let config = read_config_file(file.path()).unwrap();
        assert_eq!(config.server.port, 4321);
        assert_eq!(config.widget.origin.as_deref(), Some("https://w.example.com"));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let result = read_config_file(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }
}
