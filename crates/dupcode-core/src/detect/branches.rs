//! If-chain detectors: identical leading or trailing statements
//! across all branches (hoistable out of the conditional), and runs
//! of consecutive ifs with identical bodies (joinable with `or`).

use tracing::debug;

use crate::ast::{NodeId, NodeKind, Tree};
use crate::config::CheckerConfig;
use crate::diagnostics::{Diagnostic, DiagnosticHandler, DiagnosticKind};
use crate::matchers::{are_identical, are_identical_seqs};
use crate::metrics::statement_count_seq;
use crate::span::Span;

use super::lines_between;

/// Collect the chain starting at `node`: the node itself plus every
/// elif, in order. Returns whether the chain ends with an else block.
pub(crate) fn extract_from_elif(tree: &Tree, node: NodeId) -> (bool, Vec<NodeId>) {
    let mut ifs = vec![node];
    if tree.has_else_block(node) {
        return (true, ifs);
    }
    let mut current = node;
    while tree.has_elif_block(current) {
        let elif = tree.if_orelse(current);
        ifs.push(elif);
        if tree.has_else_block(elif) {
            return (true, ifs);
        }
        current = elif;
    }
    (false, ifs)
}

/// Extend an else-less chain with following sibling if statements,
/// stopping before the first sibling whose own chain ends with an
/// else.
pub(crate) fn extract_from_siblings(tree: &Tree, node: NodeId, seq_ifs: &mut Vec<NodeId>) {
    let mut sibling = tree.next_sibling(node);
    while let Some(s) = sibling {
        if tree.kind(s) != NodeKind::If {
            return;
        }
        let (ends_with_else, chain) = extract_from_elif(tree, s);
        if ends_with_else {
            return;
        }
        seq_ifs.extend(chain);
        sibling = tree.next_sibling(s);
    }
}

/// Per-branch statement lists of a complete chain. `None` when some
/// elif lacks a continuation (the chain does not cover all paths).
fn branch_bodies(tree: &Tree, node: NodeId) -> Option<Vec<Vec<NodeId>>> {
    let mut branches = vec![tree.if_body(node).to_vec()];
    let mut current = node;
    while tree.has_elif_block(current) {
        let elif = tree.if_orelse(current);
        let orelse = tree.if_orelse(elif);
        let continues = match tree.kind(orelse) {
            NodeKind::If => true,
            NodeKind::Block => !tree.children(orelse).is_empty(),
            _ => false,
        };
        if !continues {
            return None;
        }
        branches.push(tree.if_body(elif).to_vec());
        current = elif;
    }
    branches.push(tree.block_statements(tree.if_orelse(current)).to_vec());
    Some(branches)
}

/// Length of the identical leading (or trailing) statement run shared
/// by every branch.
fn stmts_difference(tree: &Tree, branches: &[Vec<NodeId>], forward: bool) -> usize {
    let min_len = branches.iter().map(Vec::len).min().unwrap_or(0);
    let reference = &branches[0];
    for i in 0..min_len {
        for branch in &branches[1..] {
            let (a, b) = if forward {
                (reference[i], branch[i])
            } else {
                (
                    reference[reference.len() - 1 - i],
                    branch[branch.len() - 1 - i],
                )
            };
            if !are_identical(tree, a, b) {
                return i;
            }
        }
    }
    min_len
}

/// The compound statement owning `stmt` (its parent, looking through
/// the block wrapper).
fn statement_anchor(tree: &Tree, stmt: NodeId) -> NodeId {
    match tree.parent(stmt) {
        Some(parent) if tree.kind(parent) == NodeKind::Block => {
            tree.parent(parent).unwrap_or(parent)
        }
        Some(parent) => parent,
        None => stmt,
    }
}

fn report_hoist(
    tree: &Tree,
    handler: &dyn DiagnosticHandler,
    branches: &[Vec<NodeId>],
    difference: usize,
    anchor: NodeId,
    forward: bool,
) {
    let reference = &branches[0];
    let (first, last) = if forward {
        (reference[0], reference[difference - 1])
    } else {
        (reference[reference.len() - difference], reference[reference.len() - 1])
    };
    handler.report(Diagnostic::new(
        DiagnosticKind::DuplicateIfBranches,
        tree.span(anchor),
        vec![
            lines_between(tree, first, last).to_string(),
            (if forward { "before" } else { "after" }).to_string(),
        ],
    ));
}

/// Identical code starting or ending all branches of a complete
/// if/elif/else chain can be hoisted out of the conditional.
pub fn duplicate_if_branches(
    tree: &Tree,
    node: NodeId,
    config: &CheckerConfig,
    handler: &dyn DiagnosticHandler,
) -> bool {
    let orelse = tree.if_orelse(node);
    let has_orelse = match tree.kind(orelse) {
        NodeKind::If => true,
        NodeKind::Block => !tree.children(orelse).is_empty(),
        _ => false,
    };
    if !has_orelse || tree.is_parents_elif(node) {
        return false;
    }

    let mut branches = match branch_bodies(tree, node) {
        Some(branches) => branches,
        None => return false,
    };

    let mut any_message = false;
    let same_prefix = stmts_difference(tree, &branches, true);
    if same_prefix >= 1 {
        report_hoist(tree, handler, &branches, same_prefix, node, true);
        any_message = true;
        if branches.iter().any(|branch| branch.len() == same_prefix) {
            return any_message;
        }
    }

    let same_suffix = stmts_difference(tree, &branches, false);
    if same_suffix >= 1 {
        // a lone trailing return is an allowed early-return pattern;
        // branches consisting only of it drop out of the comparison
        if same_suffix == 1 {
            let last = branches[0][branches[0].len() - 1];
            if tree.kind(last) == NodeKind::Return {
                let skip = branches.iter().take_while(|branch| branch.len() == 1).count();
                branches.drain(..skip);
                if branches.len() < 2 {
                    return any_message;
                }
            }
        }
        let anchor = statement_anchor(tree, branches[0][branches[0].len() - 1]);

        // hoisting must not split a coherent trailing segment
        let same_part = &branches[0][branches[0].len() - same_suffix..];
        let same_count = statement_count_seq(tree, same_part, true, true) as f64;
        let min_branch = branches
            .iter()
            .map(|branch| statement_count_seq(tree, branch, true, true))
            .min()
            .unwrap_or(0) as f64;
        let remainder = min_branch - same_prefix as f64;
        if remainder <= 0.0 || same_count / remainder < config.coherence_ratio {
            debug!(
                same_suffix,
                "trailing hoist would split a coherent segment, skipping"
            );
            return any_message;
        }

        report_hoist(tree, handler, &branches, same_suffix, anchor, false);
        any_message = true;
    }
    any_message
}

/// Statements shared by the if at `start` and how many consecutive
/// chain members carry an identical body. Joining an elif with a
/// following sibling chain is never suggested.
fn same_ifs_count(tree: &Tree, seq_ifs: &[NodeId], start: usize) -> usize {
    let reference = tree.if_body(seq_ifs[start]);
    for i in start + 1..seq_ifs.len() {
        let same_chain = match tree.parent(seq_ifs[start]) {
            Some(parent) => tree.is_ancestor_of(parent, seq_ifs[i]),
            None => false,
        };
        if !same_chain {
            return i - start;
        }
        if !are_identical_seqs(tree, reference, tree.if_body(seq_ifs[i])) {
            return i - start;
        }
    }
    seq_ifs.len() - start
}

/// Consecutive ifs (elifs and sibling chains without a final else)
/// with identical bodies can be joined with `or` in one condition.
pub fn duplicate_seq_ifs(tree: &Tree, node: NodeId, handler: &dyn DiagnosticHandler) -> bool {
    if tree.is_parents_elif(node) {
        return false;
    }
    // a previous sibling if without an else already covered this run
    if let Some(prev) = tree.prev_sibling(node) {
        if tree.kind(prev) == NodeKind::If && !extract_from_elif(tree, prev).0 {
            return false;
        }
    }

    let (ends_with_else, mut seq_ifs) = extract_from_elif(tree, node);
    if ends_with_else {
        return false;
    }
    extract_from_siblings(tree, node, &mut seq_ifs);
    if seq_ifs.len() == 1 {
        return false;
    }

    let mut any_message = false;
    let mut i = 0;
    while i < seq_ifs.len() - 1 {
        let count = same_ifs_count(tree, &seq_ifs, i);
        if count > 1 {
            let first = tree.span(seq_ifs[i]);
            let last_if = seq_ifs[i + count - 1];
            let last = tree
                .if_body(last_if)
                .last()
                .map(|&stmt| tree.span(stmt))
                .unwrap_or_else(|| tree.span(last_if));
            handler.report(Diagnostic::new(
                DiagnosticKind::DuplicateSeqIfs,
                Span::new(first.start_line, first.start_col, last.end_line, last.end_col),
                vec![count.to_string()],
            ));
            any_message = true;
        }
        i += count;
    }
    any_message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::Builder;
    use crate::diagnostics::CollectingDiagnosticHandler;

    fn log_stmt(b: &mut Builder, line: u32, text: &str) -> NodeId {
        let arg = b.str(line, text);
        let call = b.call_name(line, "log", vec![arg]);
        b.expr_stmt(line, call)
    }

    #[test]
    fn test_common_prefix_reported() {
        let mut b = Builder::new();
        let test = b.name(1, "flag");
        let shared1 = log_stmt(&mut b, 2, "start");
        let then_only = log_stmt(&mut b, 3, "then");
        let shared2 = log_stmt(&mut b, 5, "start");
        let else_only = log_stmt(&mut b, 6, "else");
        let chain = b.if_else(1, test, vec![shared1, then_only], vec![shared2, else_only]);
        let (tree, _module) = b.module(vec![chain]);

        let handler = CollectingDiagnosticHandler::new();
        assert!(duplicate_if_branches(&tree, chain, &CheckerConfig::default(), &handler));
        let diags = handler.get_diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::DuplicateIfBranches);
        assert_eq!(diags[0].args, vec!["1".to_string(), "before".to_string()]);
    }

    #[test]
    fn test_common_suffix_respects_coherence() {
        // the shared trailing statement is only a third of the
        // smallest branch, so hoisting it would split the segment
        let mut b = Builder::new();
        let test = b.name(1, "flag");
        let t1 = log_stmt(&mut b, 2, "a");
        let t2 = log_stmt(&mut b, 3, "b");
        let t3 = log_stmt(&mut b, 4, "tail");
        let e1 = log_stmt(&mut b, 6, "c");
        let e2 = log_stmt(&mut b, 7, "d");
        let e3 = log_stmt(&mut b, 8, "tail");
        let chain = b.if_else(1, test, vec![t1, t2, t3], vec![e1, e2, e3]);
        let (tree, _module) = b.module(vec![chain]);

        let handler = CollectingDiagnosticHandler::new();
        assert!(!duplicate_if_branches(&tree, chain, &CheckerConfig::default(), &handler));
        assert_eq!(handler.count(), 0);
    }

    #[test]
    fn test_whole_branch_suffix_reported() {
        let mut b = Builder::new();
        let test = b.name(1, "flag");
        let t1 = log_stmt(&mut b, 2, "x");
        let t2 = log_stmt(&mut b, 3, "y");
        let e1 = log_stmt(&mut b, 5, "x");
        let e2 = log_stmt(&mut b, 6, "y");
        let chain = b.if_else(1, test, vec![t1, t2], vec![e1, e2]);
        let (tree, _module) = b.module(vec![chain]);

        let handler = CollectingDiagnosticHandler::new();
        assert!(duplicate_if_branches(&tree, chain, &CheckerConfig::default(), &handler));
        // identical branches: the prefix consumes everything
        let diags = handler.get_diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].args[1], "before");
    }

    #[test]
    fn test_incomplete_chain_not_reported() {
        let mut b = Builder::new();
        let test = b.name(1, "flag");
        let shared = log_stmt(&mut b, 2, "start");
        let chain = b.if_stmt(1, test, vec![shared]);
        let (tree, _module) = b.module(vec![chain]);

        let handler = CollectingDiagnosticHandler::new();
        assert!(!duplicate_if_branches(&tree, chain, &CheckerConfig::default(), &handler));
    }

    #[test]
    fn test_seq_ifs_with_identical_bodies() {
        let mut b = Builder::new();
        let mk_if = |b: &mut Builder, line: u32, cond: &str| {
            let test = b.name(line, cond);
            let ret = {
                let t = b.bool(line + 1, true);
                b.ret(line + 1, Some(t))
            };
            b.if_stmt(line, test, vec![ret])
        };
        let if1 = mk_if(&mut b, 1, "a");
        let if2 = mk_if(&mut b, 3, "b");
        let if3 = mk_if(&mut b, 5, "c");
        let (tree, _module) = b.module(vec![if1, if2, if3]);

        let handler = CollectingDiagnosticHandler::new();
        assert!(duplicate_seq_ifs(&tree, if1, &handler));
        let diags = handler.get_diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].args, vec!["3".to_string()]);
        assert_eq!(diags[0].span.start_line, 1);
        assert_eq!(diags[0].span.end_line, 6);
    }

    #[test]
    fn test_seq_ifs_skips_later_sibling_starts() {
        let mut b = Builder::new();
        let mk_if = |b: &mut Builder, line: u32, cond: &str| {
            let test = b.name(line, cond);
            let ret = b.ret(line + 1, None);
            b.if_stmt(line, test, vec![ret])
        };
        let if1 = mk_if(&mut b, 1, "a");
        let if2 = mk_if(&mut b, 3, "b");
        let (tree, _module) = b.module(vec![if1, if2]);

        let handler = CollectingDiagnosticHandler::new();
        // the run starting at if2 was already covered by if1's run
        assert!(!duplicate_seq_ifs(&tree, if2, &handler));
    }

    #[test]
    fn test_seq_ifs_does_not_join_elif_with_sibling() {
        // if a: log("first") elif b: return -- then a sibling
        // if c: return; the elif and the sibling have identical
        // bodies but belong to different chains
        let mut b = Builder::new();
        let first_body = log_stmt(&mut b, 2, "first");
        let t2 = b.name(3, "b");
        let ret2 = b.ret(4, None);
        let elif = b.if_stmt(3, t2, vec![ret2]);
        let t1 = b.name(1, "a");
        let chain = b.if_full(1, t1, vec![first_body], elif);
        let t3 = b.name(5, "c");
        let ret3 = b.ret(6, None);
        let sibling = b.if_stmt(5, t3, vec![ret3]);
        let (tree, _module) = b.module(vec![chain, sibling]);

        let handler = CollectingDiagnosticHandler::new();
        assert!(!duplicate_seq_ifs(&tree, chain, &handler));
        assert_eq!(handler.count(), 0);
    }
}
