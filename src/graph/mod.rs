//! # Block Graph Model
//!
//! In-memory representation of a block diagram.
//!
//! The graph owns every block in an id-keyed table. Blocks never own each
//! other: `next`, `child` and the conditional branches are plain [`BlockId`]s
//! looked up through the graph, which lets the loader create all blocks first
//! and link them afterwards.

pub mod defaults;

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a block, unique within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for BlockId {
    fn from(id: u32) -> Self {
        BlockId(id)
    }
}

/// Logical level of a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PinLevel {
    #[default]
    Low,
    High,
}

impl PinLevel {
    /// Numeric level as written into `digitalWrite`.
    pub fn as_int(self) -> u8 {
        match self {
            PinLevel::Low => 0,
            PinLevel::High => 1,
        }
    }
}

impl fmt::Display for PinLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_int())
    }
}

/// One arm of a conditional.
///
/// The editor must always send both arms, even when an arm is empty, so a
/// key that was never sent is kept apart from an explicit `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    /// The attribute was not present in the description.
    Missing,
    /// Present but `null`: the arm has no statements.
    Empty,
    /// First statement of the arm.
    To(BlockId),
}

impl Branch {
    pub fn target(self) -> Option<BlockId> {
        match self {
            Branch::To(id) => Some(id),
            Branch::Missing | Branch::Empty => None,
        }
    }

    pub fn is_missing(self) -> bool {
        matches!(self, Branch::Missing)
    }
}

/// Names the relation a reference travels along, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReferenceField {
    Next,
    Child,
    IfTrue,
    IfFalse,
}

impl fmt::Display for ReferenceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReferenceField::Next => "next",
            ReferenceField::Child => "child",
            ReferenceField::IfTrue => "children.true",
            ReferenceField::IfFalse => "children.false",
        })
    }
}

/// Variant-specific part of a block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    Start,
    Loop {
        condition: String,
        child: Option<BlockId>,
    },
    Conditional {
        condition: String,
        if_true: Branch,
        if_false: Branch,
    },
    Read {
        variable: String,
        pin: u32,
    },
    Write {
        pin: u32,
        value: PinLevel,
    },
    Sleep {
        length: u64,
    },
    Code {
        code: String,
    },
    Variable {
        name: String,
    },
}

impl BlockKind {
    /// Tag used for this variant in the editor's JSON.
    pub fn tag(&self) -> &'static str {
        match self {
            BlockKind::Start => "start",
            BlockKind::Loop { .. } => "loop",
            BlockKind::Conditional { .. } => "conditional",
            BlockKind::Read { .. } => "read",
            BlockKind::Write { .. } => "write",
            BlockKind::Sleep { .. } => "sleep",
            BlockKind::Code { .. } => "code",
            BlockKind::Variable { .. } => "variable",
        }
    }
}

/// A single node of the diagram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub id: BlockId,
    pub next: Option<BlockId>,
    #[serde(flatten)]
    pub kind: BlockKind,
    /// Attributes this variant does not understand, kept as sent.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl Block {
    pub fn new(id: u32, kind: BlockKind) -> Self {
        Self {
            id: BlockId(id),
            next: None,
            kind,
            extra: BTreeMap::new(),
        }
    }

    /// Builder-style setter for `next`.
    pub fn with_next(mut self, next: u32) -> Self {
        self.next = Some(BlockId(next));
        self
    }

    pub fn is_start(&self) -> bool {
        matches!(self.kind, BlockKind::Start)
    }

    /// Every outgoing reference, in `next`, `child`, true, false order.
    pub fn references(&self) -> Vec<(ReferenceField, BlockId)> {
        let mut refs = Vec::with_capacity(3);
        if let Some(next) = self.next {
            refs.push((ReferenceField::Next, next));
        }
        match &self.kind {
            BlockKind::Loop { child: Some(child), .. } => {
                refs.push((ReferenceField::Child, *child));
            }
            BlockKind::Conditional { if_true, if_false, .. } => {
                if let Some(target) = if_true.target() {
                    refs.push((ReferenceField::IfTrue, target));
                }
                if let Some(target) = if_false.target() {
                    refs.push((ReferenceField::IfFalse, target));
                }
            }
            _ => {}
        }
        refs
    }
}

/// The complete set of blocks for one program.
///
/// Iteration is always in ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BlockGraph {
    blocks: BTreeMap<BlockId, Block>,
}

impl BlockGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block, returning the one it replaced if the id was taken.
    pub fn insert(&mut self, block: Block) -> Option<Block> {
        self.blocks.insert(block.id, block)
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.blocks.contains_key(&id)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Ids of all start blocks.
    pub fn start_blocks(&self) -> Vec<BlockId> {
        self.blocks().filter(|b| b.is_start()).map(|b| b.id).collect()
    }

    /// The entry point, if exactly one start block exists.
    pub fn entry(&self) -> Option<BlockId> {
        match self.start_blocks().as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

impl FromIterator<Block> for BlockGraph {
    fn from_iter<I: IntoIterator<Item = Block>>(iter: I) -> Self {
        let mut graph = BlockGraph::new();
        for block in iter {
            graph.insert(block);
        }
        graph
    }
}
