//! # Configuration
//!
//! Settings for code generation and the transpile pipeline, loadable from a
//! TOML file:
//!
//! ```toml
//! port = "/dev/ttyACM0"
//!
//! [codegen]
//! indent_width = 2
//!
//! [output]
//! source = "build/program.c"
//! binary = "build/program.hex"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Formatting of generated source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodegenOptions {
    /// Spaces per nesting level.
    pub indent_width: usize,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self { indent_width: 2 }
    }
}

/// Where generated artifacts are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub source: PathBuf,
    pub binary: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("program.c"),
            binary: PathBuf::from("program.hex"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranspilerConfig {
    pub codegen: CodegenOptions,
    pub output: OutputConfig,
    /// Serial port to flash; no upload happens when unset.
    pub port: Option<String>,
}

/// Errors from reading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl TranspilerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("[CONFIG] Loaded {}: {:?}", path.display(), config);
        Ok(config)
    }
}
