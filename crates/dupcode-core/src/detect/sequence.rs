//! Repeated statement sequences inside a block that could be
//! collapsed into a loop.
//!
//! Candidate sub-block lengths are tried shortest-first; the scan
//! commits to the first length reaching the repetition threshold,
//! skips the consumed statements and restarts after them. Repetitions
//! may differ in at most one constant position, consistent across the
//! whole run; fewer repetitions are required when the differing
//! values form an arithmetic progression expressible as a range.

use tracing::debug;

use crate::ast::{NodeId, NodeKind, Tree, Value, ValueSlot};
use crate::config::CheckerConfig;
use crate::diagnostics::{Diagnostic, DiagnosticHandler, DiagnosticKind};
use crate::matchers::are_identical;

use super::blocks::BlockCollector;
use super::lines_between;

/// Where two same-shaped statements differ: at most one constant
/// position, identified by its child-index path.
struct SingleDiff {
    /// The differing value pair; `None` when the statements are
    /// identical.
    pair: Option<(Value, Value)>,
    path: Vec<usize>,
}

impl SingleDiff {
    fn identical() -> Self {
        SingleDiff {
            pair: None,
            path: Vec::new(),
        }
    }
}

/// Compare two nodes position by position. `None` disqualifies the
/// pair outright: differing shape, differing identifiers or
/// operators, differing assignment targets, and statement kinds that
/// never belong in a loop body (asserts, imports, block comments,
/// bare prints).
fn single_diff(tree: &Tree, a: NodeId, b: NodeId) -> Option<SingleDiff> {
    let kind = tree.kind(a);
    if kind != tree.kind(b) {
        return None;
    }

    if kind == NodeKind::Const {
        let value_a = tree.value(a).and_then(ValueSlot::as_value)?;
        let value_b = tree.value(b).and_then(ValueSlot::as_value)?;
        if std::mem::discriminant(value_a) != std::mem::discriminant(value_b) {
            return None;
        }
        if value_a == value_b {
            return Some(SingleDiff::identical());
        }
        return Some(SingleDiff {
            pair: Some((value_a.clone(), value_b.clone())),
            path: Vec::new(),
        });
    }

    if matches!(
        kind,
        NodeKind::Name | NodeKind::AssignName | NodeKind::Attribute | NodeKind::AssignAttr
    ) && tree.ident(a) != tree.ident(b)
    {
        return None;
    }
    if matches!(
        kind,
        NodeKind::BinOp | NodeKind::BoolOp | NodeKind::UnaryOp | NodeKind::AugAssign
    ) && tree.op(a) != tree.op(b)
    {
        return None;
    }
    if kind == NodeKind::Compare
        && tree
            .ops(a)
            .iter()
            .zip(tree.ops(b))
            .any(|(x, y)| x.as_op() != y.as_op())
    {
        return None;
    }
    if kind == NodeKind::Assign {
        let targets_a = &tree.children(a)[..tree.children(a).len() - 1];
        let targets_b = &tree.children(b)[..tree.children(b).len() - 1];
        if targets_a
            .iter()
            .zip(targets_b)
            .any(|(&x, &y)| !are_identical(tree, x, y))
        {
            return None;
        }
    }
    if matches!(kind, NodeKind::AugAssign | NodeKind::AnnAssign)
        && !are_identical(tree, tree.children(a)[0], tree.children(b)[0])
    {
        return None;
    }
    if tree.is_block_comment(a) {
        return None;
    }
    if matches!(kind, NodeKind::Assert | NodeKind::Import | NodeKind::ImportFrom) {
        return None;
    }
    if kind == NodeKind::Call {
        let func = tree.children(a)[0];
        if tree.kind(func) == NodeKind::Name && tree.ident(func) == Some("print") {
            return None;
        }
    }

    single_diff_list(tree, tree.children(a), tree.children(b))
}

/// All differing child positions must carry the same value pair; the
/// recorded path points at the first of them.
fn single_diff_list(tree: &Tree, a: &[NodeId], b: &[NodeId]) -> Option<SingleDiff> {
    if a.len() != b.len() {
        return None;
    }
    let mut result: Option<SingleDiff> = None;
    for (i, (&x, &y)) in a.iter().zip(b).enumerate() {
        let sub = single_diff(tree, x, y)?;
        if let Some(pair) = sub.pair {
            match &result {
                Some(prior) => {
                    if prior.pair.as_ref() != Some(&pair) {
                        return None;
                    }
                }
                None => {
                    let mut path = sub.path;
                    path.push(i);
                    result = Some(SingleDiff {
                        pair: Some(pair),
                        path,
                    });
                }
            }
        }
    }
    Some(result.unwrap_or_else(SingleDiff::identical))
}

/// Per-repetition diff values of a run starting at `start`:
/// `[v1, v2, v3, ...]`, `None` entries for identical repetitions.
/// Stops when a comparison disqualifies or the diff position drifts.
fn seq_diffs(
    tree: &Tree,
    block: &[NodeId],
    subblock_len: usize,
    start: usize,
    seq_repetitions: usize,
) -> Vec<Option<Value>> {
    let mut path: Option<Vec<usize>> = None;
    let mut diffs: Vec<Option<Value>> = Vec::new();
    let mut i = start;
    while i + 2 * subblock_len <= block.len() {
        let sub1 = &block[i..i + subblock_len];
        let sub2 = &block[i + subblock_len..i + 2 * subblock_len];
        let diff = match single_diff_list(tree, sub1, sub2) {
            Some(diff) => diff,
            None => return diffs,
        };

        match &path {
            Some(current) => {
                if !current.is_empty() && !diff.path.is_empty() && *current != diff.path {
                    return diffs;
                }
                // a long identical run followed by a divergent pair
                // stands on its own
                if current.is_empty() && !diff.path.is_empty() && diffs.len() >= seq_repetitions {
                    return diffs;
                }
                if current.is_empty() && !diff.path.is_empty() {
                    path = Some(diff.path);
                }
            }
            None => path = Some(diff.path),
        }

        if diffs.is_empty() {
            match &diff.pair {
                Some((v1, v2)) => {
                    diffs.push(Some(v1.clone()));
                    diffs.push(Some(v2.clone()));
                }
                None => {
                    diffs.push(None);
                    diffs.push(None);
                }
            }
        } else {
            diffs.push(diff.pair.map(|(_, v2)| v2));
        }

        i += subblock_len;
    }
    diffs
}

/// A diff sequence is expressible as a `range` when nothing varies or
/// every value is an integer and the step is constant.
fn can_use_range(diffs: &[Option<Value>]) -> bool {
    if diffs.iter().all(Option::is_none) {
        return true;
    }
    let values: Option<Vec<i64>> = diffs
        .iter()
        .map(|diff| match diff {
            Some(Value::Int(n)) => Some(*n),
            _ => None,
        })
        .collect();
    let values = match values {
        Some(values) => values,
        None => return false,
    };
    if values.len() < 2 {
        return true;
    }
    let step = values[1] - values[0];
    values.windows(2).all(|w| w[1] - w[0] == step)
}

fn process_block(
    tree: &Tree,
    block: &[NodeId],
    config: &CheckerConfig,
    handler: &dyn DiagnosticHandler,
) {
    let max_subblock_len = block.len() / config.seq_repetitions;
    if max_subblock_len == 0 {
        return;
    }

    let mut start = 0;
    while start < block.len() - 1 {
        let mut committed = false;
        for subblock_len in 1..=max_subblock_len {
            let diffs = seq_diffs(tree, block, subblock_len, start, config.seq_repetitions);
            let enough = (diffs.len() >= config.seq_repetitions && can_use_range(&diffs))
                || diffs.len() >= config.seq_repetitions_no_range;
            if enough {
                let first = &block[start..start + subblock_len];
                let last = &block
                    [start + (diffs.len() - 1) * subblock_len..start + diffs.len() * subblock_len];
                debug!(
                    repetitions = diffs.len(),
                    subblock_len, "repeated sequence found"
                );
                handler.report(Diagnostic::new(
                    DiagnosticKind::DuplicateSequence,
                    tree.span(first[0]).merge(tree.span(last[last.len() - 1])),
                    vec![
                        diffs.len().to_string(),
                        lines_between(tree, first[0], first[first.len() - 1]).to_string(),
                    ],
                ));
                start += diffs.len() * subblock_len;
                committed = true;
                break;
            }
        }
        if !committed {
            start += 1;
        }
    }
}

/// Scan every collected block for repeating sub-sequences.
pub fn duplicate_sequence(
    tree: &Tree,
    module: NodeId,
    config: &CheckerConfig,
    handler: &dyn DiagnosticHandler,
) {
    let mut blocks: Vec<Vec<NodeId>> = BlockCollector::collect(tree, module)
        .into_iter()
        .filter(|block| !block.is_empty())
        .collect();
    blocks.sort_by_key(|block| {
        (
            tree.span(block[0]).start_line,
            tree.span(block[block.len() - 1]).end_line,
        )
    });

    for block in &blocks {
        if block.len() >= 2 {
            process_block(tree, block, config, handler);
        }
    }
}
