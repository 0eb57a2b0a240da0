//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.
//! Environment variables are layered on top with [`Config::apply_env`].

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable naming the widget bundle's origin.
pub const ENV_WIDGET_ORIGIN: &str = "WIDGET_ORIGIN";

/// Environment variable naming this backend's public origin.
pub const ENV_BACKEND_ORIGIN: &str = "BACKEND_ORIGIN";

/// Environment variable naming the listening port.
pub const ENV_PORT: &str = "PORT";

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Widget origin and caching settings.
    #[serde(default)]
    pub widget: WidgetConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, origin) in [
            ("widget.origin", &self.widget.origin),
            ("widget.backend_origin", &self.widget.backend_origin),
        ] {
            if let Some(origin) = origin {
                if !origin.starts_with("http://") && !origin.starts_with("https://") {
                    return Err(ConfigError::ValidationError {
                        message: format!(
                            "Invalid {field} '{origin}'. Must start with http:// or https://"
                        ),
                    });
                }
            }
        }

        if self.widget.fetch_timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "widget.fetch_timeout_secs must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Overrides settings from environment variables.
    ///
    /// `lookup` is usually `|key| std::env::var(key).ok()`; taking it as a
    /// parameter keeps the override logic testable.
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` is not a valid port number.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(origin) = lookup(ENV_WIDGET_ORIGIN).filter(|v| !v.is_empty()) {
            self.widget.origin = Some(origin);
        }
        if let Some(origin) = lookup(ENV_BACKEND_ORIGIN).filter(|v| !v.is_empty()) {
            self.widget.backend_origin = Some(origin);
        }
        if let Some(port) = lookup(ENV_PORT).filter(|v| !v.is_empty()) {
            self.server.port = port.parse().map_err(|_| ConfigError::ValidationError {
                message: format!("Invalid {ENV_PORT} '{port}'. Must be a number 0-65535"),
            })?;
        }
        Ok(())
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

/// Widget asset configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WidgetConfig {
    /// Origin serving the widget bundle (index page plus hashed assets).
    #[serde(default)]
    pub origin: Option<String>,

    /// Public origin of this backend, used in the widget HTML.
    #[serde(default)]
    pub backend_origin: Option<String>,

    /// Seconds a discovered filename stays fresh.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Timeout for each request to the widget origin, in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl WidgetConfig {
    /// Cache TTL as a [`Duration`].
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Fetch timeout as a [`Duration`].
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            origin: None,
            backend_origin: None,
            cache_ttl_secs: default_cache_ttl(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

const fn default_cache_ttl() -> u64 {
    60
}

const fn default_fetch_timeout() -> u64 {
    10
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
