//! # Block Diagram Graph Compiler (BDGC)
//!
//! Turns the block diagrams built in the visual editor into statement-level
//! C source for Arduino-class microcontrollers.
//!
//! A diagram is a graph of typed blocks (start, loop, conditional, pin
//! read/write, sleep, raw code, variable declaration) linked by id. BDGC
//! provides:
//! - Loading of the editor's JSON description into a typed block graph
//! - Validation that reports every structural problem in one pass
//! - Deterministic, indentation-tracking code generation
//! - A thin pipeline that hands generated source to external build/flash tools
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bdgc::compile_str;
//!
//! let json = r#"{ "blocks": {
//!     "0": { "type": "start", "next": 1 },
//!     "1": { "type": "write", "next": null, "attributes": { "pin": 12, "value": 1 } }
//! } }"#;
//!
//! match compile_str(json) {
//!     Ok(source) => std::fs::write("program.c", source)?,
//!     Err(e) => eprintln!("Compilation failed: {}", e),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! 1. **Loading** - JSON descriptors become `Block`s; references are checked
//!    once every block exists
//! 2. **Validation** - structural invariants, all violations aggregated
//! 3. **Code Generation** - structural recursion from the start block

pub mod codegen;
pub mod compiler;
pub mod config;
pub mod error;
pub mod graph;
pub mod loader;
pub mod pipeline;
pub mod validator;

// Re-export the main compilation API
pub use compiler::{
    compile_file,
    compile_file_with_options,
    compile_graph,
    compile_graph_with_options,
    compile_str,
    compile_str_with_options,
};

pub use codegen::{generate, generate_with_options, ArduinoCodeGenerator};
pub use config::{CodegenOptions, ConfigError, OutputConfig, TranspilerConfig};
pub use error::{
    CompileError, LoadError, PipelineError, ToolError, ValidationReport, Violation, ViolationKind,
};
pub use graph::{Block, BlockGraph, BlockId, BlockKind, Branch, PinLevel, ReferenceField};
pub use loader::{load_file, load_str, load_value};
pub use pipeline::{Compiler, TranspileOutcome, Transpiler, Uploader};
pub use validator::{check, validate, ValidatedGraph};
