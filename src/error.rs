//! Error types for every compilation phase.

use crate::graph::{BlockId, ReferenceField};
use std::fmt;
use std::path::PathBuf;

/// Errors raised while loading a block description. Loading stops at the
/// first one.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("block key {0:?} is not a non-negative integer id")]
    InvalidBlockId(String),

    #[error("block id {0} appears more than once")]
    DuplicateBlockId(BlockId),

    #[error("block {id} has unknown type {}", describe_tag(.tag))]
    UnknownBlockType { id: BlockId, tag: Option<String> },

    #[error("block {id} is missing required field '{field}'")]
    MissingField { id: BlockId, field: &'static str },

    #[error("block {id} has invalid attribute '{attribute}': {reason}")]
    InvalidAttribute {
        id: BlockId,
        attribute: String,
        reason: String,
    },

    #[error("block {block} refers to missing block {target} through '{field}'")]
    DanglingReference {
        block: BlockId,
        field: ReferenceField,
        target: BlockId,
    },
}

/// What is wrong in a single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViolationKind {
    #[error("graph has no start block")]
    NoStartBlock,

    #[error("graph has {} start blocks ({}), expected exactly one", .ids.len(), join_ids(.ids))]
    MultipleStartBlocks { ids: Vec<BlockId> },

    #[error("'{field}' refers to missing block {target}")]
    DanglingReference {
        field: ReferenceField,
        target: BlockId,
    },

    #[error("conditional is missing its '{branch}' branch")]
    MissingBranch { branch: ReferenceField },

    #[error("'{field}' to block {target} closes a reference cycle")]
    ReferenceCycle {
        field: ReferenceField,
        target: BlockId,
    },

    #[error("'{field}' refers to the start block")]
    StartReferenced { field: ReferenceField },

    #[error("required attribute '{attribute}' is empty")]
    EmptyAttribute { attribute: &'static str },
}

/// One validation finding, attributed to a block where that makes sense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub block: Option<BlockId>,
    pub kind: ViolationKind,
}

impl Violation {
    pub fn at(block: BlockId, kind: ViolationKind) -> Self {
        Self {
            block: Some(block),
            kind,
        }
    }

    pub fn graph(kind: ViolationKind) -> Self {
        Self { block: None, kind }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.block {
            Some(id) => write!(f, "block {}: {}", id, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Every violation found in a graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} validation error(s){}", .violations.len(), list_violations(.violations))]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }
}

fn list_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|violation| format!("\n  - {}", violation))
        .collect()
}

/// Errors from the one-call compile entry points.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("invalid block graph: {0}")]
    Invalid(#[from] ValidationReport),
}

/// Failure reported by an external build or flash tool.
#[derive(Debug, thiserror::Error)]
#[error("{tool} failed: {message}")]
pub struct ToolError {
    pub tool: String,
    pub message: String,
}

impl ToolError {
    pub fn new(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Errors from the end-to-end transpile pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Toolchain(#[from] ToolError),
}

fn describe_tag(tag: &Option<String>) -> String {
    match tag {
        Some(tag) => format!("{tag:?}"),
        None => "(missing)".to_string(),
    }
}

fn join_ids(ids: &[BlockId]) -> String {
    ids.iter()
        .map(BlockId::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
