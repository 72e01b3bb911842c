//! Module-wide similarity pass.
//!
//! Walks every statement in document order once. If statements get
//! the branch-level analyses (hoists, joinable conditions, and fix
//! synthesis over antiunified branch bodies); sibling runs are
//! searched for loop-shaped repetition; pairs of equal-length,
//! same-shaped runs elsewhere in the module become candidates for
//! extraction into a shared helper function. A per-pass reported set
//! keeps overlapping findings from stacking up.

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::analysis::test_vars_change;
use crate::antiunify::{antiunify, Aunified};
use crate::ast::{NodeId, NodeKind, Tree};
use crate::config::CheckerConfig;
use crate::diagnostics::{Diagnostic, DiagnosticHandler};
use crate::fix::function::{fixed_by_function_ifs, fixed_by_function_runs};
use crate::fix::loops::fixed_by_loop;
use crate::fix::move_if::fixed_by_moving_if;
use crate::fix::ternary::fixed_by_ternary;
use crate::fix::variables::fixed_by_vars;
use crate::fix::Fixed;
use crate::metrics::{statement_count, statement_count_seq, token_count, token_count_seq};
use crate::span::Span;

use super::branches::{duplicate_if_branches, duplicate_seq_ifs, extract_from_elif};

/// Statements worth pairing; block comments, passes, asserts and
/// class headers only produce noise.
fn included(tree: &Tree, stmt: NodeId) -> bool {
    !tree.is_block_comment(stmt)
        && !matches!(
            tree.kind(stmt),
            NodeKind::Pass | NodeKind::Assert | NodeKind::ClassDef
        )
}

/// Every statement-level node in document order, nested bodies and
/// function bodies included.
fn collect_statements(tree: &Tree, module: NodeId) -> Vec<NodeId> {
    fn collect(tree: &Tree, id: NodeId, out: &mut Vec<NodeId>) {
        for &child in tree.children(id) {
            if tree.kind(child).is_statement() && included(tree, child) {
                out.push(child);
            }
            collect(tree, child, out);
        }
    }
    let mut out = Vec::new();
    collect(tree, module, &mut out);
    out
}

/// The statement and its following siblings, filtered.
fn sibling_run(tree: &Tree, node: NodeId) -> Vec<NodeId> {
    let mut run = Vec::new();
    let mut current = Some(node);
    while let Some(id) = current {
        if included(tree, id) {
            run.push(id);
        }
        current = tree.next_sibling(id);
    }
    run
}

fn mark_subtree(tree: &Tree, id: NodeId, reported: &mut FxHashSet<NodeId>) {
    reported.insert(id);
    for &child in tree.children(id) {
        mark_subtree(tree, child, reported);
    }
}

/// Candidate partitions of a sibling run into equal chunks, longest
/// prefix first, shortest chunks first within it. A partition whose
/// trailing chunk is short antiunifies with a length mismatch and is
/// rejected downstream.
fn loop_partitions(siblings: &[NodeId]) -> Vec<Vec<Vec<NodeId>>> {
    let mut partitions = Vec::new();
    for end in (1..=siblings.len()).rev() {
        for subblock_len in 1..=end / 2 {
            let chunks = siblings[..end]
                .chunks(subblock_len)
                .map(<[NodeId]>::to_vec)
                .collect();
            partitions.push(chunks);
        }
    }
    partitions
}

fn runs_token_count(tree: &Tree, runs: &[Vec<NodeId>]) -> u32 {
    runs.iter().map(|run| token_count_seq(tree, run)).sum()
}

fn runs_statement_count(tree: &Tree, runs: &[Vec<NodeId>]) -> u32 {
    runs.iter()
        .map(|run| statement_count_seq(tree, run, false, true))
        .sum()
}

/// Offer a repeated sibling run to the loop synthesizer.
fn similar_to_loop(
    tree: &Tree,
    to_aunify: &[Vec<NodeId>],
    aunified: &Aunified,
    config: &CheckerConfig,
    handler: &dyn DiagnosticHandler,
) -> bool {
    let fixed = match fixed_by_loop(tree, aunified, to_aunify, config) {
        Some(fixed) => fixed,
        None => return false,
    };
    let tokens_before = runs_token_count(tree, to_aunify);
    let stmts_before = runs_statement_count(tree, to_aunify);
    if !fixed.saves_enough(tokens_before, stmts_before, config.token_savings_ratio) {
        debug!(
            tokens_before,
            tokens_after = fixed.tokens,
            "loop rewrite fails the savings gate"
        );
        return false;
    }

    let first = tree.span(to_aunify[0][0]);
    let last = match to_aunify[to_aunify.len() - 1].last() {
        Some(&last) => tree.span(last),
        None => return false,
    };
    handler.report(Diagnostic::new(
        fixed.kind,
        Span::new(first.start_line, first.start_col, last.end_line, last.end_col),
        fixed.args,
    ));
    true
}

/// Offer a group of equal-length statement runs to the function
/// synthesizer.
fn similar_to_function(
    tree: &Tree,
    to_aunify: &[Vec<NodeId>],
    aunified: &Aunified,
    config: &CheckerConfig,
    handler: &dyn DiagnosticHandler,
) -> bool {
    let fixed = match fixed_by_function_runs(tree, aunified, to_aunify, config) {
        Some(fixed) => fixed,
        None => return false,
    };
    let tokens_before = runs_token_count(tree, to_aunify);
    let stmts_before = runs_statement_count(tree, to_aunify);
    if !fixed.saves_enough(tokens_before, stmts_before, config.token_savings_ratio) {
        debug!(
            tokens_before,
            tokens_after = fixed.tokens,
            "function rewrite fails the savings gate"
        );
        return false;
    }

    let first = tree.span(to_aunify[0][0]);
    let last = match to_aunify[0].last() {
        Some(&last) => tree.span(last),
        None => return false,
    };
    handler.report(Diagnostic::new(
        fixed.kind,
        Span::new(first.start_line, first.start_col, last.end_line, last.end_col),
        fixed.args,
    ));
    true
}

/// Antiunify the branch bodies of a complete if/elif/else chain and
/// pick the cheapest applicable rewrite passing the savings gate.
pub(crate) fn duplicate_blocks_in_if(
    tree: &Tree,
    node: NodeId,
    config: &CheckerConfig,
    handler: &dyn DiagnosticHandler,
) -> bool {
    if tree.is_parents_elif(node) {
        return false;
    }
    let (ends_with_else, ifs) = extract_from_elif(tree, node);
    if !ends_with_else {
        return false;
    }

    let mut bodies: Vec<Vec<NodeId>> = Vec::new();
    for (i, &if_) in ifs.iter().enumerate() {
        bodies.push(tree.if_body(if_).to_vec());
        if i == ifs.len() - 1 {
            bodies.push(tree.block_statements(tree.if_orelse(if_)).to_vec());
        }
    }

    let aunified = antiunify(tree, &bodies);
    if aunified.has_mismatch() || aunified.assigns_to_avar() {
        return false;
    }

    let tokens_before = token_count(tree, node);
    let stmts_before = statement_count(tree, node, false, true);

    let tests: Vec<NodeId> = ifs.iter().map(|&if_| tree.if_test(if_)).collect();
    let called = aunified.called_avar();
    let tests_change = test_vars_change(tree, &tests, &bodies);

    let mut candidates: Vec<Fixed> = Vec::new();
    if !called && !tests_change {
        candidates.extend(fixed_by_ternary(tree, &aunified, &tests, config));
    }
    if !tests_change {
        candidates.extend(fixed_by_moving_if(tree, &aunified, &tests, config));
    }
    if !called {
        candidates.extend(fixed_by_vars(tree, &aunified, &tests, config));
        candidates.extend(fixed_by_function_ifs(tree, &aunified, &tests, &[node], config));
    }

    let best = candidates
        .into_iter()
        .filter(|fixed| fixed.saves_enough(tokens_before, stmts_before, config.token_savings_ratio))
        .min_by_key(|fixed| fixed.tokens);
    let fixed = match best {
        Some(fixed) => fixed,
        None => {
            debug!("no branch rewrite passes the savings gate");
            return false;
        }
    };
    handler.report(Diagnostic::new(fixed.kind, tree.span(node), fixed.args));
    true
}

/// Both runs pair a statement of the same kind at every position.
fn pairwise_same_kinds(tree: &Tree, fsts: &[NodeId], snds: &[NodeId]) -> bool {
    fsts.iter()
        .zip(snds)
        .all(|(&a, &b)| tree.kind(a) == tree.kind(b))
}

/// Two runs overlap when the first reaches into (or past) the second.
fn overlaps(
    position: &FxHashMap<NodeId, usize>,
    i: usize,
    j: usize,
    fsts: &[NodeId],
    snds: &[NodeId],
) -> bool {
    if i + fsts.len() - 1 >= j {
        return true;
    }
    match (
        position.get(&fsts[fsts.len() - 1]),
        position.get(&snds[snds.len() - 1]),
    ) {
        (Some(&fst_end), Some(&snd_end)) => fst_end >= snd_end,
        _ => true,
    }
}

/// One pass over the module: if-level analyses, loop-shaped sibling
/// repetition, and cross-location helper-function candidates.
pub(crate) fn check(
    tree: &Tree,
    module: NodeId,
    config: &CheckerConfig,
    handler: &dyn DiagnosticHandler,
) {
    if tree.children(module).is_empty() {
        return;
    }
    let stmt_nodes = collect_statements(tree, module);
    let position: FxHashMap<NodeId, usize> = stmt_nodes
        .iter()
        .enumerate()
        .map(|(index, &node)| (node, index))
        .collect();

    let mut reported: FxHashSet<NodeId> = FxHashSet::default();
    let mut candidates: IndexMap<(NodeId, usize), usize> = IndexMap::new();

    for (i, &fst) in stmt_nodes.iter().enumerate() {
        if reported.contains(&fst) {
            continue;
        }

        if tree.kind(fst) == NodeKind::If {
            let hoisted = duplicate_if_branches(tree, fst, config, handler);
            let joined = duplicate_seq_ifs(tree, fst, handler);
            let rewritten = duplicate_blocks_in_if(tree, fst, config, handler);
            if hoisted || joined || rewritten {
                mark_subtree(tree, fst, &mut reported);
                continue;
            }
        }

        let fst_siblings = sibling_run(tree, fst);

        if fst_siblings.len() >= 3
            && !fst_siblings
                .iter()
                .any(|&s| tree.kind(s) == NodeKind::FunctionDef)
        {
            for to_aunify in loop_partitions(&fst_siblings) {
                let aunified = antiunify(tree, &to_aunify);
                if similar_to_loop(tree, &to_aunify, &aunified, config, handler) {
                    for run in &to_aunify {
                        for &stmt in run {
                            mark_subtree(tree, stmt, &mut reported);
                        }
                    }
                    break;
                }
            }
            if reported.contains(&fst) {
                continue;
            }
        }

        'pairing: for (j, &snd) in stmt_nodes.iter().enumerate().skip(i + 1) {
            if tree.is_ancestor_of(fst, snd) {
                continue;
            }
            let snd_siblings = sibling_run(tree, snd);
            for length in (1..=fst_siblings.len().min(snd_siblings.len())).rev() {
                let fsts = &fst_siblings[..length];
                let snds = &snd_siblings[..length];
                if overlaps(&position, i, j, fsts, snds) || !pairwise_same_kinds(tree, fsts, snds)
                {
                    continue;
                }
                let next_id = candidates.len();
                let id = *candidates.entry((fst, length)).or_insert(next_id);
                candidates.insert((snd, length), id);
                break 'pairing;
            }
        }
    }

    let mut groups: IndexMap<usize, Vec<(NodeId, usize)>> = IndexMap::new();
    for (&(node, length), &id) in &candidates {
        groups.entry(id).or_default().push((node, length));
    }
    for (_, members) in groups {
        let to_aunify: Vec<Vec<NodeId>> = members
            .iter()
            .map(|&(node, length)| {
                let mut run = sibling_run(tree, node);
                run.truncate(length);
                run
            })
            .collect();
        let aunified = antiunify(tree, &to_aunify);
        if aunified.has_mismatch() || aunified.assigns_to_avar() || aunified.called_avar() {
            continue;
        }
        // runs of whole function definitions would call for reusing
        // one of them instead of extracting a third
        if to_aunify
            .iter()
            .all(|run| tree.kind(run[0]) == NodeKind::FunctionDef)
        {
            continue;
        }
        similar_to_function(tree, &to_aunify, &aunified, config, handler);
    }
}
