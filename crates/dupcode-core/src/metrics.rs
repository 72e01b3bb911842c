//! Size metrics driving the savings gate: a surface-weight token
//! count, a statement count and the structural complexity score used
//! by the duplicate-expression detector.

use rustc_hash::FxHashSet;

use crate::ast::render::render;
use crate::ast::{NodeId, NodeKind, Tree};

/// Recursive size metric: one unit per node, one extra unit per
/// else-clause. Approximates surface syntactic weight, not lexer
/// token count. `Block`, `Empty` and expression-statement wrappers
/// are transparent.
pub fn token_count(tree: &Tree, id: NodeId) -> u32 {
    let children: u32 = tree.children(id).iter().map(|&c| token_count(tree, c)).sum();
    match tree.kind(id) {
        NodeKind::Block | NodeKind::Module | NodeKind::ExprStmt | NodeKind::Empty => children,
        NodeKind::If | NodeKind::For | NodeKind::While => {
            1 + children + if tree.has_else_block(id) { 1 } else { 0 }
        }
        NodeKind::IfExp => 2 + children,
        _ => 1 + children,
    }
}

pub fn token_count_seq(tree: &Tree, ids: &[NodeId]) -> u32 {
    ids.iter().map(|&id| token_count(tree, id)).sum()
}

/// Count statement-level nodes under `id`.
///
/// Definitions and imports count only when `include_defs` is set; the
/// `if __name__ == "__main__"` guard counts only when
/// `include_main_guard` is set. Compound statements count one unit
/// plus their bodies plus one more for an else-clause.
pub fn statement_count(
    tree: &Tree,
    id: NodeId,
    include_defs: bool,
    include_main_guard: bool,
) -> u32 {
    let count_block = |block: NodeId| -> u32 {
        statement_count_seq(tree, tree.block_statements(block), include_defs, include_main_guard)
    };

    let children = tree.children(id);
    match tree.kind(id) {
        NodeKind::FunctionDef => {
            if include_defs {
                1 + count_block(children[1])
            } else {
                0
            }
        }
        NodeKind::ClassDef => {
            if include_defs {
                1 + count_block(children[0])
            } else {
                0
            }
        }
        NodeKind::Import | NodeKind::ImportFrom => {
            if include_defs {
                1
            } else {
                0
            }
        }
        NodeKind::If => {
            if tree.is_main_block(id) && !include_main_guard {
                return 0;
            }
            let orelse = tree.if_orelse(id);
            let orelse_count = match tree.kind(orelse) {
                NodeKind::If => statement_count(tree, orelse, include_defs, include_main_guard),
                NodeKind::Block => count_block(orelse),
                _ => 0,
            };
            1 + count_block(children[1])
                + if tree.has_else_block(id) { 1 } else { 0 }
                + orelse_count
        }
        NodeKind::While => {
            1 + count_block(children[1])
                + if tree.has_else_block(id) { 1 } else { 0 }
                + count_block(children[2])
        }
        NodeKind::For => {
            1 + count_block(children[2])
                + if tree.has_else_block(id) { 1 } else { 0 }
                + count_block(children[3])
        }
        NodeKind::Try => {
            let handlers = &children[1..children.len() - 2];
            let handler_count: u32 = handlers
                .iter()
                .map(|&h| {
                    let body = tree.children(h)[2];
                    statement_count_seq(
                        tree,
                        tree.block_statements(body),
                        include_defs,
                        include_main_guard,
                    )
                })
                .sum();
            2 + count_block(children[0])
                + handler_count
                + count_block(children[children.len() - 2])
                + count_block(children[children.len() - 1])
        }
        NodeKind::With => 1 + count_block(*children.last().expect("with has a body")),
        NodeKind::Module => {
            statement_count_seq(tree, children, include_defs, include_main_guard)
        }
        NodeKind::Block => {
            statement_count_seq(tree, children, include_defs, include_main_guard)
        }
        _ => 1,
    }
}

pub fn statement_count_seq(
    tree: &Tree,
    ids: &[NodeId],
    include_defs: bool,
    include_main_guard: bool,
) -> u32 {
    ids.iter()
        .map(|&id| statement_count(tree, id, include_defs, include_main_guard))
        .sum()
}

/// Structural complexity of an expression subtree, weighted by
/// operator arity and nesting.
///
/// Returns `None` for expressions that must not be scored: calls to
/// anything outside the pure-builtin allow-list, and attribute or
/// subscript nodes sitting in an assignment-target position.
pub fn expression_complexity(
    tree: &Tree,
    id: NodeId,
    allowed_calls: &FxHashSet<String>,
) -> Option<u32> {
    let kind = tree.kind(id);

    if matches!(kind, NodeKind::Attribute | NodeKind::Subscript) {
        if let Some(parent) = tree.parent(id) {
            if tree.kind(parent).is_assign_like() {
                return None;
            }
        }
    }

    if kind == NodeKind::Call {
        let func = tree.children(id)[0];
        if !allowed_calls.contains(&render(tree, func)) {
            return None;
        }
    }

    let children = tree.children(id);
    let sum_children = |tree: &Tree| -> Option<u32> {
        let mut total = 0;
        for &child in children {
            total += expression_complexity(tree, child, allowed_calls)?;
        }
        Some(total)
    };

    match kind {
        NodeKind::BinOp => Some(2 + sum_children(tree)?),
        NodeKind::BoolOp => Some(children.len() as u32 - 1 + sum_children(tree)?),
        NodeKind::Compare => {
            let mut total = expression_complexity(tree, children[0], allowed_calls)?;
            for &operand in &children[1..] {
                total += 1 + expression_complexity(tree, operand, allowed_calls)?;
            }
            Some(total)
        }
        NodeKind::Name | NodeKind::Const => Some(1),
        NodeKind::Attribute => Some(1 + sum_children(tree)?),
        _ => sum_children(tree),
    }
}

/// The savings gate: a rewrite is worth suggesting only if it does
/// not add statements and shrinks the token weight below
/// `ratio` (0.8 by default) of the original.
pub fn saves_enough(
    tokens_before: u32,
    stmts_before: u32,
    tokens_after: u32,
    stmts_after: u32,
    ratio: f64,
) -> bool {
    stmts_after <= stmts_before && (tokens_after as f64) < ratio * tokens_before as f64
}
