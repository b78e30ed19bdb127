//! # Configuration Management
//!
//! Protocol constants and runtime configuration for the packet codec.
//!
//! The wire constants (magic value, block size, opcode bounds) are fixed by the
//! protocol and live here as named constants. Runtime settings (opcode bounds
//! used by the stream codec, metrics, logging) are grouped in [`SgConfig`].
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()` (`SG_PROTOCOL_*` variables)
//!
//! ## Opcode Bounds
//! Encode accepts opcodes `0..=9`, decode accepts `0..=6`. Encode permits a
//! superset so that reserved opcodes can be produced before every peer decodes
//! them. The bounds are configurable, but the defaults match the protocol.

use crate::core::packet::Direction;
use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::Level;

/// Magic value framing every packet (written little-endian, 4 bytes)
pub const MAGIC_VALUE: u32 = 0xFEFE;

/// Magic value as it appears on the wire
pub const MAGIC_BYTES: [u8; 4] = MAGIC_VALUE.to_le_bytes();

/// Size of the data block a packet may carry
pub const BLOCK_SIZE: usize = 1024;

/// Highest opcode accepted when encoding
pub const ENCODE_MAX_OPCODE: i32 = 9;

/// Highest opcode accepted when decoding
pub const DECODE_MAX_OPCODE: i32 = 6;

/// Lowest opcode accepted in either direction
pub const MIN_OPCODE: i32 = 0;

/// Whether the stream codec records metrics by default
pub const RECORD_METRICS: bool = true;

/// Environment variables read by [`SgConfig::from_env`]
pub const ENV_ENCODE_MAX_OPCODE: &str = "SG_PROTOCOL_ENCODE_MAX_OPCODE";
pub const ENV_DECODE_MAX_OPCODE: &str = "SG_PROTOCOL_DECODE_MAX_OPCODE";
pub const ENV_RECORD_METRICS: &str = "SG_PROTOCOL_RECORD_METRICS";
pub const ENV_LOG_LEVEL: &str = "SG_PROTOCOL_LOG_LEVEL";
pub const ENV_LOG_JSON: &str = "SG_PROTOCOL_LOG_JSON";

/// Longest accepted `app_name`
pub const MAX_APP_NAME_LEN: usize = 64;

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ProtocolError::ConfigError(format!("{key}={value:?}: {e}")))
}

/// Inclusive upper opcode bound for each direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct OpcodeLimits {
    pub encode_max: i32,
    pub decode_max: i32,
}

impl Default for OpcodeLimits {
    fn default() -> Self {
        Self {
            encode_max: ENCODE_MAX_OPCODE,
            decode_max: DECODE_MAX_OPCODE,
        }
    }
}

impl OpcodeLimits {
    /// Upper bound applied in the given direction
    pub fn max_for(&self, direction: Direction) -> i32 {
        match direction {
            Direction::Encode => self.encode_max,
            Direction::Decode => self.decode_max,
        }
    }

    pub fn accepts(&self, direction: Direction, op: i32) -> bool {
        (MIN_OPCODE..=self.max_for(direction)).contains(&op)
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SgConfig {
    /// Stream codec configuration
    #[serde(default)]
    pub codec: CodecConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SgConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Apply `SG_PROTOCOL_*` overrides from `lookup` on top of the defaults.
    ///
    /// Unset variables keep their defaults; a set variable that fails to parse
    /// is a `ConfigError` naming the variable.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(max) = lookup(ENV_ENCODE_MAX_OPCODE) {
            config.codec.encode_max_opcode = parse_var(ENV_ENCODE_MAX_OPCODE, &max)?;
        }

        if let Some(max) = lookup(ENV_DECODE_MAX_OPCODE) {
            config.codec.decode_max_opcode = parse_var(ENV_DECODE_MAX_OPCODE, &max)?;
        }

        if let Some(flag) = lookup(ENV_RECORD_METRICS) {
            config.codec.record_metrics = parse_var(ENV_RECORD_METRICS, &flag)?;
        }

        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            config.logging.log_level = parse_var(ENV_LOG_LEVEL, &level)?;
        }

        if let Some(json) = lookup(ENV_LOG_JSON) {
            config.logging.json_format = parse_var(ENV_LOG_JSON, &json)?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.codec.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Stream codec configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CodecConfig {
    /// Highest opcode the codec will encode
    pub encode_max_opcode: i32,

    /// Highest opcode the codec will accept when decoding
    pub decode_max_opcode: i32,

    /// Whether encode/decode outcomes are counted in the global metrics
    pub record_metrics: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            encode_max_opcode: ENCODE_MAX_OPCODE,
            decode_max_opcode: DECODE_MAX_OPCODE,
            record_metrics: RECORD_METRICS,
        }
    }
}

impl CodecConfig {
    /// Opcode bounds described by this configuration
    pub fn opcode_limits(&self) -> OpcodeLimits {
        OpcodeLimits {
            encode_max: self.encode_max_opcode,
            decode_max: self.decode_max_opcode,
        }
    }

    /// Validate codec configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.encode_max_opcode < MIN_OPCODE {
            errors.push(format!(
                "Encode opcode bound must be at least {MIN_OPCODE} (got {})",
                self.encode_max_opcode
            ));
        }

        if self.decode_max_opcode < MIN_OPCODE {
            errors.push(format!(
                "Decode opcode bound must be at least {MIN_OPCODE} (got {})",
                self.decode_max_opcode
            ));
        }

        // Peers would accept opcodes nobody is allowed to send
        if self.decode_max_opcode > self.encode_max_opcode {
            errors.push(format!(
                "Decode opcode bound {} exceeds encode bound {}",
                self.decode_max_opcode, self.encode_max_opcode
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Recorded as the `app` field of the startup event emitted by
    /// [`crate::utils::logging::init_logging`]
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("sg-protocol"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("app_name cannot be empty".to_string());
        } else if self.app_name.len() > MAX_APP_NAME_LEN {
            errors.push(format!(
                "app_name too long: {} characters (maximum: {MAX_APP_NAME_LEN})",
                self.app_name.len()
            ));
        } else if let Some(bad) = self.app_name.chars().find(|c| !is_app_name_char(*c)) {
            // Must stay a single token in plain and JSON output alike
            errors.push(format!(
                "app_name {:?} contains {bad:?}; use ASCII letters, digits, '-', '_' or '.'",
                self.app_name
            ));
        }

        match (&self.log_file_path, self.log_to_file) {
            (Some(path), true) => {
                let path = Path::new(path);
                if path.is_dir() {
                    errors.push(format!("log_file_path is a directory: {}", path.display()));
                } else if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            }
            (None, true) => {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
            (_, false) => {}
        }

        if !self.log_to_console && !self.log_to_file {
            errors.push(
                "No log output enabled: codec diagnostics would be dropped (enable console or file)"
                    .to_string(),
            );
        }

        errors
    }
}

fn is_app_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
