//! Configuration loading and resolution
//!
//! Each setting is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`AIAC_HOST`, `AIAC_PORT`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is normal. An unreadable or malformed one is
//! logged and ignored so the service still starts on defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Largest accepted pacing scale factor
pub const MAX_PACING_FACTOR: f64 = 1000.0;

pub const ENV_HOST: &str = "AIAC_HOST";
pub const ENV_PORT: &str = "AIAC_PORT";

/// Optional settings read from `config.toml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub max_upload_bytes: Option<usize>,
    /// `instant`, `realtime` or a scale factor such as `0.25`
    #[serde(default)]
    pub progress_pacing: Option<String>,
    #[serde(default)]
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }
}

/// How the server paces simulated compile stages
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressPacing {
    /// No waiting between stages
    Instant,
    /// Wait the full stage delay
    Realtime,
    /// Wait the stage delay multiplied by the factor
    Scaled(f64),
}

impl ProgressPacing {
    /// Apply the pacing to a nominal stage delay
    ///
    /// A product too large for `Duration` saturates; a negative or NaN
    /// factor means no wait.
    pub fn scale(&self, delay: Duration) -> Duration {
        match self {
            ProgressPacing::Instant => Duration::ZERO,
            ProgressPacing::Realtime => delay,
            ProgressPacing::Scaled(factor) => {
                let secs = delay.as_secs_f64() * factor;
                if secs.is_nan() || secs <= 0.0 {
                    Duration::ZERO
                } else {
                    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
                }
            }
        }
    }
}

impl Default for ProgressPacing {
    fn default() -> Self {
        ProgressPacing::Instant
    }
}

impl fmt::Display for ProgressPacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressPacing::Instant => f.write_str("instant"),
            ProgressPacing::Realtime => f.write_str("realtime"),
            ProgressPacing::Scaled(factor) => write!(f, "{}", factor),
        }
    }
}

impl FromStr for ProgressPacing {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "instant" => Ok(ProgressPacing::Instant),
            "realtime" => Ok(ProgressPacing::Realtime),
            other => match other.parse::<f64>() {
                Ok(factor) if (0.0..=MAX_PACING_FACTOR).contains(&factor) => {
                    Ok(ProgressPacing::Scaled(factor))
                }
                _ => Err(Error::Config(format!("Invalid progress pacing: {}", s))),
            },
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config_path: Option<PathBuf>,
    pub progress_pacing: Option<ProgressPacing>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub progress_pacing: ProgressPacing,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            progress_pacing: ProgressPacing::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Resolve configuration from all sources
    ///
    /// Never fails: problems in lower-priority sources are logged and the
    /// next source is used.
    pub fn resolve(overrides: ConfigOverrides) -> Self {
        let toml_config = match overrides.config_path.clone().or_else(default_config_path) {
            Some(path) if path.exists() => match TomlConfig::load(&path) {
                Ok(config) => {
                    info!("Loaded config file {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Ignoring config file: {}", e);
                    TomlConfig::default()
                }
            },
            Some(path) if overrides.config_path.is_some() => {
                warn!("Config file not found: {} (using defaults)", path.display());
                TomlConfig::default()
            }
            _ => TomlConfig::default(),
        };

        Self::merge(overrides, toml_config)
    }

    /// Combine command-line, environment and file values
    pub fn merge(overrides: ConfigOverrides, file: TomlConfig) -> Self {
        let defaults = Self::default();

        let host = overrides
            .host
            .or_else(|| std::env::var(ENV_HOST).ok().filter(|h| !h.trim().is_empty()))
            .or(file.host)
            .unwrap_or(defaults.host);

        let port = overrides
            .port
            .or_else(env_port)
            .or(file.port)
            .unwrap_or(defaults.port);

        let progress_pacing = overrides
            .progress_pacing
            .or_else(|| {
                file.progress_pacing.as_deref().and_then(|raw| {
                    raw.parse()
                        .map_err(|e| warn!("{} (using default)", e))
                        .ok()
                })
            })
            .unwrap_or(defaults.progress_pacing);

        Self {
            host,
            port,
            max_upload_bytes: file.max_upload_bytes.unwrap_or(defaults.max_upload_bytes),
            progress_pacing,
            log_level: file.log_level.unwrap_or(defaults.log_level),
        }
    }

    /// `host:port` string suitable for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_port() -> Option<u16> {
    let raw = std::env::var(ENV_PORT).ok()?;
    match raw.trim().parse() {
        Ok(port) => Some(port),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid port", ENV_PORT, raw);
            None
        }
    }
}

/// Get default configuration file path for the platform
fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("aiac").join("config.toml"));

    if cfg!(target_os = "linux") {
        // Try ~/.config/aiac/config.toml first, then /etc/aiac/config.toml
        if let Some(path) = user_config.as_ref().filter(|p| p.exists()) {
            return Some(path.clone());
        }
        let system_config = PathBuf::from("/etc/aiac/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
        None
    } else {
        user_config
    }
}
