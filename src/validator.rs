//! # Graph Validator
//!
//! Checks the structural invariants code generation relies on:
//! - Exactly one start block
//! - Every reference lands on an existing block, and no block reachable from
//!   the start block points back at it
//! - Conditionals carry both branches
//! - No block can reach itself through `next`, `child` or a branch
//! - Text attributes the emitted statements need are not empty
//!
//! Unlike loading, validation never stops early: every violation found is
//! reported together.

use crate::error::{ValidationReport, Violation, ViolationKind};
use crate::graph::{BlockGraph, BlockId, BlockKind, ReferenceField};
use std::collections::{HashMap, HashSet};
use std::ops::Deref;

/// A graph that passed [`validate`]. Code generation only accepts this type.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedGraph<'a> {
    graph: &'a BlockGraph,
    entry: BlockId,
}

impl<'a> ValidatedGraph<'a> {
    /// The unique start block.
    pub fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn graph(&self) -> &'a BlockGraph {
        self.graph
    }
}

impl Deref for ValidatedGraph<'_> {
    type Target = BlockGraph;

    fn deref(&self) -> &BlockGraph {
        self.graph
    }
}

/// Validate a graph, returning a handle usable for generation.
pub fn validate(graph: &BlockGraph) -> Result<ValidatedGraph<'_>, ValidationReport> {
    let violations = check(graph);
    if !violations.is_empty() {
        return Err(ValidationReport { violations });
    }
    let entry = graph.entry().ok_or_else(|| ValidationReport {
        violations: vec![Violation::graph(ViolationKind::NoStartBlock)],
    })?;
    Ok(ValidatedGraph { graph, entry })
}

/// Collect every violation in the graph, in a stable order.
pub fn check(graph: &BlockGraph) -> Vec<Violation> {
    tracing::info!("[VALIDATOR] Checking {} blocks", graph.len());

    let mut violations = Vec::new();
    check_start(graph, &mut violations);
    check_references(graph, &mut violations);
    check_branches(graph, &mut violations);
    check_attributes(graph, &mut violations);
    check_cycles(graph, &mut violations);

    for violation in &violations {
        tracing::warn!("[VALIDATOR] {}", violation);
    }
    tracing::info!("[VALIDATOR] {} violation(s) found", violations.len());
    violations
}

fn check_start(graph: &BlockGraph, violations: &mut Vec<Violation>) {
    let starts = graph.start_blocks();
    match starts.len() {
        0 => violations.push(Violation::graph(ViolationKind::NoStartBlock)),
        1 => {}
        _ => violations.push(Violation::graph(ViolationKind::MultipleStartBlocks {
            ids: starts,
        })),
    }
}

fn check_references(graph: &BlockGraph, violations: &mut Vec<Violation>) {
    let reachable = reachable_from_start(graph);
    for block in graph.blocks() {
        for (field, target) in block.references() {
            match graph.get(target) {
                None => violations.push(Violation::at(
                    block.id,
                    ViolationKind::DanglingReference { field, target },
                )),
                // Orphans are never emitted, so only reachable blocks matter here.
                Some(target) if target.is_start() && reachable.contains(&block.id) => violations
                    .push(Violation::at(block.id, ViolationKind::StartReferenced { field })),
                Some(_) => {}
            }
        }
    }
}

/// Every block reachable from any start block, start blocks included.
fn reachable_from_start(graph: &BlockGraph) -> HashSet<BlockId> {
    let mut seen: HashSet<BlockId> = graph.start_blocks().into_iter().collect();
    let mut pending: Vec<BlockId> = seen.iter().copied().collect();

    while let Some(id) = pending.pop() {
        let Some(block) = graph.get(id) else {
            continue;
        };
        for (_, target) in block.references() {
            if graph.contains(target) && seen.insert(target) {
                pending.push(target);
            }
        }
    }
    seen
}

fn check_branches(graph: &BlockGraph, violations: &mut Vec<Violation>) {
    for block in graph.blocks() {
        if let BlockKind::Conditional { if_true, if_false, .. } = &block.kind {
            if if_true.is_missing() {
                violations.push(Violation::at(
                    block.id,
                    ViolationKind::MissingBranch {
                        branch: ReferenceField::IfTrue,
                    },
                ));
            }
            if if_false.is_missing() {
                violations.push(Violation::at(
                    block.id,
                    ViolationKind::MissingBranch {
                        branch: ReferenceField::IfFalse,
                    },
                ));
            }
        }
    }
}

fn check_attributes(graph: &BlockGraph, violations: &mut Vec<Violation>) {
    for block in graph.blocks() {
        let required: Option<(&'static str, &str)> = match &block.kind {
            BlockKind::Loop { condition, .. } | BlockKind::Conditional { condition, .. } => {
                Some(("condition", condition.as_str()))
            }
            BlockKind::Read { variable, .. } => Some(("variable", variable.as_str())),
            BlockKind::Variable { name } => Some(("name", name.as_str())),
            // An empty code block still emits a valid `;`
            BlockKind::Start
            | BlockKind::Write { .. }
            | BlockKind::Sleep { .. }
            | BlockKind::Code { .. } => None,
        };
        if let Some((attribute, text)) = required {
            if text.trim().is_empty() {
                violations.push(Violation::at(
                    block.id,
                    ViolationKind::EmptyAttribute { attribute },
                ));
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Iterative depth-first search over all reference edges. An edge into a
/// block still on the stack closes a cycle.
fn check_cycles(graph: &BlockGraph, violations: &mut Vec<Violation>) {
    let mut marks: HashMap<BlockId, Mark> = HashMap::with_capacity(graph.len());

    for root in graph.blocks() {
        if marks.contains_key(&root.id) {
            continue;
        }

        // Each frame is a block and the index of its next edge to explore.
        let mut stack: Vec<(BlockId, Vec<(ReferenceField, BlockId)>, usize)> =
            vec![(root.id, root.references(), 0)];
        marks.insert(root.id, Mark::InProgress);

        while let Some((id, edges, cursor)) = stack.last_mut() {
            let Some(&(field, target)) = edges.get(*cursor) else {
                marks.insert(*id, Mark::Done);
                stack.pop();
                continue;
            };
            *cursor += 1;
            let source = *id;

            match marks.get(&target) {
                Some(Mark::InProgress) => {
                    tracing::debug!("[VALIDATOR] Cycle through {} -> {}", source, target);
                    violations.push(Violation::at(
                        source,
                        ViolationKind::ReferenceCycle { field, target },
                    ));
                }
                Some(Mark::Done) => {}
                None => {
                    // Dangling targets are reported by `check_references`
                    if let Some(block) = graph.get(target) {
                        marks.insert(target, Mark::InProgress);
                        stack.push((target, block.references(), 0));
                    }
                }
            }
        }
    }
}
