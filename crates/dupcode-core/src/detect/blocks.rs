//! Duplicate statement blocks: same shape at every level, at most a
//! bounded number of distinct atomic differences.

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::ast::render::render_value;
use crate::ast::visit::{walk, Visitor};
use crate::ast::{NodeId, NodeKind, Tree, ValueSlot};
use crate::config::CheckerConfig;
use crate::diagnostics::{Diagnostic, DiagnosticHandler, DiagnosticKind};
use crate::span::Span;

use super::lines_between;

/// Collects every statement-sequence block eligible for duplicate
/// comparison: bodies (and else-blocks) of conditionals and loops,
/// with-bodies, try parts, function bodies, and the module body
/// without definitions and the entry-point guard.
pub(crate) struct BlockCollector {
    blocks: Vec<Vec<NodeId>>,
}

impl BlockCollector {
    pub(crate) fn collect(tree: &Tree, module: NodeId) -> Vec<Vec<NodeId>> {
        let mut collector = BlockCollector { blocks: Vec::new() };
        collector.visit(tree, module);
        collector.blocks
    }
}

impl Visitor for BlockCollector {
    fn visit_module(&mut self, tree: &Tree, id: NodeId) {
        let body: Vec<NodeId> = tree
            .children(id)
            .iter()
            .copied()
            .filter(|&stmt| {
                !matches!(tree.kind(stmt), NodeKind::FunctionDef | NodeKind::ClassDef)
                    && !tree.is_main_block(stmt)
            })
            .collect();
        self.blocks.push(body);
        walk(self, tree, id);
    }

    fn visit_if(&mut self, tree: &Tree, id: NodeId) {
        self.blocks.push(tree.if_body(id).to_vec());
        let orelse = tree.if_orelse(id);
        if tree.kind(orelse) == NodeKind::Block && !tree.children(orelse).is_empty() {
            self.blocks.push(tree.children(orelse).to_vec());
        }
        walk(self, tree, id);
    }

    fn visit_while(&mut self, tree: &Tree, id: NodeId) {
        let children = tree.children(id);
        self.blocks.push(tree.block_statements(children[1]).to_vec());
        if !tree.children(children[2]).is_empty() {
            self.blocks.push(tree.children(children[2]).to_vec());
        }
        walk(self, tree, id);
    }

    fn visit_for(&mut self, tree: &Tree, id: NodeId) {
        let children = tree.children(id);
        self.blocks.push(tree.block_statements(children[2]).to_vec());
        if !tree.children(children[3]).is_empty() {
            self.blocks.push(tree.children(children[3]).to_vec());
        }
        walk(self, tree, id);
    }

    fn visit_with(&mut self, tree: &Tree, id: NodeId) {
        let children = tree.children(id);
        self.blocks
            .push(tree.block_statements(children[children.len() - 1]).to_vec());
        walk(self, tree, id);
    }

    fn visit_try(&mut self, tree: &Tree, id: NodeId) {
        let children = tree.children(id);
        self.blocks.push(tree.block_statements(children[0]).to_vec());
        for &handler in &children[1..children.len() - 2] {
            self.blocks
                .push(tree.block_statements(tree.children(handler)[2]).to_vec());
        }
        let orelse = children[children.len() - 2];
        if !tree.children(orelse).is_empty() {
            self.blocks.push(tree.children(orelse).to_vec());
        }
        walk(self, tree, id);
    }

    fn visit_function_def(&mut self, tree: &Tree, id: NodeId) {
        self.blocks
            .push(tree.block_statements(tree.children(id)[1]).to_vec());
        walk(self, tree, id);
    }
}

fn ident_of(tree: &Tree, id: NodeId) -> Option<String> {
    tree.ident(id).map(str::to_string)
}

/// Record the atomic difference between two same-kind nodes, if any.
/// Returns `false` when the difference rules out any meaningful
/// generalization (differing boolean operators).
fn record_diffs(
    tree: &Tree,
    a: NodeId,
    b: NodeId,
    diffs: &mut FxHashSet<(String, String)>,
) -> bool {
    match tree.kind(a) {
        NodeKind::Compare => {
            for (slot_a, slot_b) in tree.ops(a).iter().zip(tree.ops(b)) {
                if let (Some(op_a), Some(op_b)) = (slot_a.as_op(), slot_b.as_op()) {
                    if op_a != op_b {
                        diffs.insert((op_a.symbol().to_string(), op_b.symbol().to_string()));
                    }
                }
            }
        }
        NodeKind::BoolOp => {
            if tree.op(a) != tree.op(b) {
                return false;
            }
        }
        NodeKind::BinOp | NodeKind::AugAssign | NodeKind::UnaryOp => {
            if let (Some(op_a), Some(op_b)) = (tree.op(a), tree.op(b)) {
                if op_a != op_b {
                    diffs.insert((op_a.symbol().to_string(), op_b.symbol().to_string()));
                }
            }
        }
        NodeKind::Name | NodeKind::AssignName | NodeKind::Attribute | NodeKind::AssignAttr => {
            if let (Some(name_a), Some(name_b)) = (ident_of(tree, a), ident_of(tree, b)) {
                if name_a != name_b {
                    diffs.insert((name_a, name_b));
                }
            }
        }
        NodeKind::Const => {
            let value_a = tree.value(a).and_then(ValueSlot::as_value);
            let value_b = tree.value(b).and_then(ValueSlot::as_value);
            if let (Some(value_a), Some(value_b)) = (value_a, value_b) {
                if value_a != value_b {
                    diffs.insert((render_value(value_a), render_value(value_b)));
                }
            }
        }
        _ => {}
    }
    true
}

/// Same kind and child count at every level; the distinct-difference
/// set must stay within `max_diffs`.
fn blocks_match(
    tree: &Tree,
    block1: &[NodeId],
    block2: &[NodeId],
    max_diffs: usize,
    diffs: &mut FxHashSet<(String, String)>,
) -> bool {
    if block1.len() != block2.len() {
        return false;
    }
    for (&a, &b) in block1.iter().zip(block2) {
        if tree.kind(a) != tree.kind(b) {
            return false;
        }
        let children_a = tree.children(a);
        let children_b = tree.children(b);
        if children_a.len() != children_b.len() {
            return false;
        }
        if !record_diffs(tree, a, b, diffs) || diffs.len() > max_diffs {
            return false;
        }
        if !blocks_match(tree, children_a, children_b, max_diffs, diffs) {
            return false;
        }
    }
    true
}

/// Kind of the compound statement (or module) owning `stmt`.
fn enclosing_kind(tree: &Tree, stmt: NodeId) -> Option<NodeKind> {
    let parent = tree.parent(stmt)?;
    match tree.kind(parent) {
        NodeKind::Block => tree.parent(parent).map(|grand| tree.kind(grand)),
        kind => Some(kind),
    }
}

/// Pairwise-compare collected blocks in source order; the first
/// non-overlapping match per starting block wins, so overlapping
/// spans are reported once.
pub fn duplicate_blocks(
    tree: &Tree,
    module: NodeId,
    config: &CheckerConfig,
    handler: &dyn DiagnosticHandler,
) {
    let mut blocks: Vec<Vec<NodeId>> = BlockCollector::collect(tree, module)
        .into_iter()
        .filter(|block| {
            !block.is_empty()
                && lines_between(tree, block[0], block[block.len() - 1]) >= config.min_block_lines
        })
        .collect();
    if blocks.len() < 2 {
        return;
    }
    blocks.sort_by_key(|block| {
        (
            tree.span(block[0]).start_line,
            tree.span(block[block.len() - 1]).end_line,
        )
    });

    let mut max_closed_line = 0;
    for i in 0..blocks.len() {
        for j in i + 1..blocks.len() {
            let block1 = &blocks[i];
            let block2 = &blocks[j];

            let last1 = tree.span(block1[block1.len() - 1]);
            if enclosing_kind(tree, block1[0]) != enclosing_kind(tree, block2[0])
                || last1.end_line <= max_closed_line
            {
                continue;
            }

            let mut diffs = FxHashSet::default();
            if blocks_match(tree, block1, block2, config.max_block_diffs, &mut diffs) {
                let first1 = tree.span(block1[0]);
                debug!(
                    diffs = diffs.len(),
                    line = first1.start_line,
                    "duplicate block pair found"
                );
                handler.report(Diagnostic::new(
                    DiagnosticKind::DuplicateBlocks,
                    Span::new(
                        first1.start_line,
                        first1.start_col,
                        last1.end_line,
                        last1.end_col,
                    ),
                    vec![format!(
                        "{} and {}",
                        first1.start_line,
                        tree.span(block2[0]).start_line
                    )],
                ));
                max_closed_line = last1.end_line;
                break;
            }
        }
    }
}
