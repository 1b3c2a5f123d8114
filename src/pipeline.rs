//! # Transpile Pipeline
//!
//! Runs a block description all the way to a flashed device: compile to C,
//! write the source, then hand off to an external build tool and, when a
//! port is configured, an external flasher.
//!
//! The build and flash tools are supplied by the caller through the
//! [`Compiler`] and [`Uploader`] traits; this crate never spawns them itself.

use crate::compiler::compile_file_with_options;
use crate::config::TranspilerConfig;
use crate::error::{PipelineError, ToolError};
use std::path::{Path, PathBuf};

/// Builds a binary from generated source (e.g. an avr-gcc wrapper).
pub trait Compiler {
    fn compile(&self, source: &Path, binary: &Path) -> Result<(), ToolError>;
}

/// Transfers a binary to a device on a serial port (e.g. an avrdude wrapper).
pub trait Uploader {
    fn upload(&self, binary: &Path, port: &str) -> Result<(), ToolError>;
}

/// What a successful [`Transpiler::transpile`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspileOutcome {
    pub source: PathBuf,
    pub binary: PathBuf,
    /// Port the binary was flashed to, if any.
    pub uploaded: Option<String>,
}

pub struct Transpiler<C, U> {
    config: TranspilerConfig,
    compiler: C,
    uploader: U,
}

impl<C: Compiler, U: Uploader> Transpiler<C, U> {
    pub fn new(config: TranspilerConfig, compiler: C, uploader: U) -> Self {
        Self {
            config,
            compiler,
            uploader,
        }
    }

    pub fn config(&self) -> &TranspilerConfig {
        &self.config
    }

    /// Load `input`, generate C, build it and optionally flash it.
    ///
    /// Stops at the first failing stage. Nothing is written when the diagram
    /// does not load or validate.
    pub fn transpile(&self, input: impl AsRef<Path>) -> Result<TranspileOutcome, PipelineError> {
        let input = input.as_ref();
        let output = &self.config.output;
        tracing::info!("[PIPELINE] Transpiling {}", input.display());

        let code = compile_file_with_options(input, &self.config.codegen)?;

        if let Some(parent) = output.source.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| PipelineError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&output.source, &code).map_err(|source| PipelineError::Io {
            path: output.source.clone(),
            source,
        })?;
        tracing::info!("[PIPELINE] Wrote {} ({} bytes)", output.source.display(), code.len());

        self.compiler.compile(&output.source, &output.binary)?;
        tracing::info!("[PIPELINE] Built {}", output.binary.display());

        let uploaded = match &self.config.port {
            Some(port) => {
                self.uploader.upload(&output.binary, port)?;
                tracing::info!("[PIPELINE] Uploaded to {}", port);
                Some(port.clone())
            }
            None => {
                tracing::info!("[PIPELINE] No port configured, skipping upload");
                None
            }
        };

        Ok(TranspileOutcome {
            source: output.source.clone(),
            binary: output.binary.clone(),
            uploaded,
        })
    }
}
