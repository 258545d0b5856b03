//! Runtime configuration.
//!
//! Server and worker settings come from environment variables; processor
//! definitions come from a TOML file of `[[processor]]` tables.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use catcher_core::paths;
use catcher_core::processing::{ProcessorConfig, ProcessorConfigError, ProcessorRegistry};
use catcher_worker::WorkerConfig;
use serde::Deserialize;

/// Configuration that cannot be loaded. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    InvalidVar {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("Failed to read processor config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse processor config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Processor(#[from] ProcessorConfigError),
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: IpAddr,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// SQLite database file.
    pub db_path: PathBuf,
    /// Processor definitions file.
    pub config_path: PathBuf,
    pub poll_interval_secs: u64,
    pub max_retries: u32,
    /// Shared secret for webhook signatures. `None` disables verification.
    pub webhook_secret: Option<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight work (default: `10`).
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                            |
    /// |------------------------------|------------------------------------|
    /// | `CATCHER_HOST`               | `0.0.0.0`                          |
    /// | `CATCHER_PORT`               | `8080`                             |
    /// | `CATCHER_DB`                 | `$XDG_CACHE_HOME/catcher/jobs.db`  |
    /// | `CATCHER_CONFIG`             | `$XDG_CONFIG_HOME/catcher/config.toml` |
    /// | `CATCHER_POLL_INTERVAL_SECS` | `5`                                |
    /// | `CATCHER_MAX_RETRIES`        | `3`                                |
    /// | `CATCHER_WEBHOOK_SECRET`     | unset                              |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                               |
    /// | `SHUTDOWN_TIMEOUT_SECS`      | `10`                               |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = parse_var(&lookup, "CATCHER_HOST", IpAddr::from([0, 0, 0, 0]), "an IP address")?;
        let port = parse_var(&lookup, "CATCHER_PORT", 8080u16, "a valid port")?;

        let db_path = path_var(&lookup, "CATCHER_DB").unwrap_or_else(paths::default_db_path);
        let config_path =
            path_var(&lookup, "CATCHER_CONFIG").unwrap_or_else(paths::default_config_path);

        let poll_interval_secs =
            parse_var(&lookup, "CATCHER_POLL_INTERVAL_SECS", 5u64, "a positive integer")?;
        if poll_interval_secs == 0 {
            return Err(ConfigError::InvalidVar {
                var: "CATCHER_POLL_INTERVAL_SECS",
                expected: "a positive integer",
                value: "0".into(),
            });
        }

        let max_retries = parse_var(&lookup, "CATCHER_MAX_RETRIES", 3u32, "a non-negative integer")?;

        let webhook_secret = lookup("CATCHER_WEBHOOK_SECRET").filter(|s| !s.is_empty());

        let request_timeout_secs =
            parse_var(&lookup, "REQUEST_TIMEOUT_SECS", 30u64, "a valid u64")?;
        let shutdown_timeout_secs =
            parse_var(&lookup, "SHUTDOWN_TIMEOUT_SECS", 10u64, "a valid u64")?;

        Ok(Self {
            host,
            port,
            db_path,
            config_path,
            poll_interval_secs,
            max_retries,
            webhook_secret,
            request_timeout_secs,
            shutdown_timeout_secs,
        })
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            max_retries: self.max_retries,
            ..WorkerConfig::default()
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn parse_var<F, T>(
    lookup: &F,
    var: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidVar {
            var,
            expected,
            value,
        }),
    }
}

fn path_var<F>(lookup: &F, var: &str) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .filter(|v| !v.is_empty())
        .map(|v| paths::expand_path(&v))
}

// ---------------------------------------------------------------------------
// Processor definitions
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct ProcessorFile {
    #[serde(default, rename = "processor")]
    processors: Vec<ProcessorConfig>,
}

/// Parse the text of a processor config file.
pub fn parse_processor_configs(text: &str) -> Result<Vec<ProcessorConfig>, toml::de::Error> {
    let file: ProcessorFile = toml::from_str(text)?;
    Ok(file.processors)
}

/// Read processor definitions from `path`. A missing file yields none.
pub fn load_processor_configs(path: &Path) -> Result<Vec<ProcessorConfig>, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "No processor config file, starting with no processors");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    parse_processor_configs(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate processor definitions, preserving file order.
pub fn load_registry(path: &Path) -> Result<ProcessorRegistry, ConfigError> {
    let configs = load_processor_configs(path)?;
    let registry = ProcessorRegistry::from_configs(&configs)?;
    for processor in registry.processors() {
        tracing::info!(
            processor = %processor.name(),
            target_dir = %processor.target_dir().display(),
            "Registered processor",
        );
    }
    Ok(registry)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
