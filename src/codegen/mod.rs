//! # Arduino Code Generation
//!
//! C source generation for validated block graphs.

mod arduino_codegen;
pub mod statements;

pub use arduino_codegen::*;
