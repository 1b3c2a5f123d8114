//! # Block Diagram Compiler
//!
//! Main entry points for compiling block diagrams to Arduino C source.

use crate::codegen::ArduinoCodeGenerator;
use crate::config::CodegenOptions;
use crate::error::CompileError;
use crate::graph::BlockGraph;
use crate::loader;
use crate::validator;
use std::path::Path;

/// Compile a block graph to Arduino C source
///
/// This is the main entry point for the compiler. It validates the graph and,
/// if every invariant holds, generates the program text.
///
/// # Arguments
///
/// * `graph` - The loaded block graph
///
/// # Returns
///
/// * `Ok(String)` - The generated source code
/// * `Err(CompileError)` - Every validation problem found in the graph
///
/// # Examples
///
/// ```rust
/// use bdgc::{compile_graph, Block, BlockGraph, BlockKind, PinLevel};
///
/// let graph: BlockGraph = vec![
///     Block::new(0, BlockKind::Start).with_next(1),
///     Block::new(1, BlockKind::Write { pin: 12, value: PinLevel::High }),
/// ]
/// .into_iter()
/// .collect();
///
/// let code = compile_graph(&graph).unwrap();
/// assert!(code.contains("digitalWrite(12,1);"));
/// ```
pub fn compile_graph(graph: &BlockGraph) -> Result<String, CompileError> {
    compile_graph_with_options(graph, &CodegenOptions::default())
}

/// Compile a block graph with explicit code generation options
pub fn compile_graph_with_options(
    graph: &BlockGraph,
    options: &CodegenOptions,
) -> Result<String, CompileError> {
    tracing::info!("[BDGC] Starting block diagram compilation ({} blocks)", graph.len());

    // Phase 1: Validate structure
    tracing::info!("[BDGC] Phase 1: Validating graph...");
    let validated = validator::validate(graph)?;
    tracing::info!("[BDGC] Entry block: {}", validated.entry());

    // Phase 2: Generate code
    tracing::info!("[BDGC] Phase 2: Generating Arduino C...");
    let code = ArduinoCodeGenerator::new(validated, options.clone()).generate_program();

    tracing::info!("[BDGC] Compilation successful ({} bytes)", code.len());
    Ok(code)
}

/// Load, validate and generate from JSON text
pub fn compile_str(json: &str) -> Result<String, CompileError> {
    compile_str_with_options(json, &CodegenOptions::default())
}

/// Load, validate and generate from JSON text with explicit options
pub fn compile_str_with_options(
    json: &str,
    options: &CodegenOptions,
) -> Result<String, CompileError> {
    tracing::info!("[BDGC] Phase 0: Loading block description...");
    let graph = loader::load_str(json)?;
    compile_graph_with_options(&graph, options)
}

/// Load, validate and generate from a JSON file
pub fn compile_file(path: impl AsRef<Path>) -> Result<String, CompileError> {
    compile_file_with_options(path, &CodegenOptions::default())
}

/// Load, validate and generate from a JSON file with explicit options
pub fn compile_file_with_options(
    path: impl AsRef<Path>,
    options: &CodegenOptions,
) -> Result<String, CompileError> {
    tracing::info!("[BDGC] Phase 0: Loading block description...");
    let graph = loader::load_file(path)?;
    compile_graph_with_options(&graph, options)
}
