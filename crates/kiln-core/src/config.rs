//! Container configuration schemas.
//!
//! Configuration is deserialized from TOML files via the `config` crate,
//! with environment variable overrides prefixed `KILN__`. Hosts that embed
//! the container programmatically can construct these structs directly;
//! all fields carry serde defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::BuildError;

/// Root configuration for one plugin container instance.
///
/// The output-path configuration is fixed at container construction and
/// never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Working-directory root. Relative output paths resolve under it.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Output path settings.
    #[serde(default)]
    pub output: OutputConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Output path and filename-template settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory emitted files are written under.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
    /// Single output file path. Used as the name template for entry emits.
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Filename pattern for emitted assets.
    ///
    /// Supports the `[name]`, `[hash]`, `[ext]`, and `[extname]`
    /// placeholders.
    #[serde(default = "default_asset_file_names")]
    pub asset_file_names: String,
    /// Filename pattern for emitted entry chunks.
    #[serde(default = "default_entry_file_names")]
    pub entry_file_names: String,
}

/// Logging settings consumed by [`crate::logging::init`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `"trace"`, `"debug"`, `"info"`, `"warn"`, `"error"`.
    /// Overridden by `RUST_LOG` when set.
    #[serde(default = "default_level")]
    pub level: String,
    /// Log format: `"json"` or `"pretty"`.
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            file: None,
            asset_file_names: default_asset_file_names(),
            entry_file_names: default_entry_file_names(),
        }
    }
}

impl ContainerConfig {
    /// Load configuration from a TOML file.
    ///
    /// Merges the file (if present) with environment variables prefixed
    /// with `KILN__`.
    pub fn load(path: &str) -> Result<Self, BuildError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("KILN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| BuildError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| BuildError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_asset_file_names() -> String {
    "[name][extname]".to_string()
}

fn default_entry_file_names() -> String {
    "[name].js".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}
