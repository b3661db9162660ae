//! Configuration module - environment variable parsing and game constants

mod game;

pub use game::{GameConfig, MapConfig, ShellConfig, TankConfig};

use std::env;
use std::time::Duration;

/// Default pyTanks server address
const DEFAULT_SERVER_ADDR: &str = "localhost:9042";

/// Player API path; the version segment must match the server
const DEFAULT_API_PATH: &str = "/pyTanksAPI/beta-0/player";

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Client configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server host and port, e.g. `localhost:9042`
    pub server_addr: String,
    /// Path of the player endpoint on the server
    pub api_path: String,
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    pub log_level: String,
    /// Plain text or JSON log lines
    pub log_format: LogFormat,
    /// Target frame rate for the game loop
    pub frames_per_second: u32,
    /// How often average/minimum FPS is reported
    pub fps_log_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            api_path: DEFAULT_API_PATH.to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            frames_per_second: 60,
            fps_log_interval: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let server_addr = lookup("SERVER_ADDR").unwrap_or(defaults.server_addr);
        if server_addr.trim().is_empty() || server_addr.contains("://") {
            return Err(ConfigError::InvalidAddress(server_addr));
        }

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        let frames_per_second = match lookup("TARGET_FPS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(fps) if fps > 0 => fps,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "TARGET_FPS",
                        value: raw,
                    })
                }
            },
            None => defaults.frames_per_second,
        };

        let fps_log_interval = match lookup("FPS_LOG_INTERVAL_SECS") {
            Some(raw) => match raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|secs| *secs > 0.0)
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            {
                Some(interval) => interval,
                None => {
                    return Err(ConfigError::Invalid {
                        name: "FPS_LOG_INTERVAL_SECS",
                        value: raw,
                    })
                }
            },
            None => defaults.fps_log_interval,
        };

        Ok(Self {
            server_addr,
            api_path: lookup("API_PATH").unwrap_or(defaults.api_path),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format,
            frames_per_second,
            fps_log_interval,
        })
    }

    /// Full WebSocket URL of the player endpoint
    pub fn endpoint(&self) -> String {
        format!("ws://{}{}", self.server_addr, self.api_path)
    }

    /// Immutable game constants for this session
    pub fn game_config(&self) -> GameConfig {
        GameConfig::new(self.frames_per_second)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address: {0:?} (expected host:port)")]
    InvalidAddress(String),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
