//! Duplication detectors: stateless scanners run once per module.
//!
//! Working memory (the reported set, candidate tables) lives for a
//! single [`check_module`] call and is discarded at the end, so
//! repeated invocations over different trees are independent.

pub mod blocks;
pub mod branches;
pub mod exprs;
pub mod sequence;
pub mod similar;

use crate::ast::{NodeId, Tree};
use crate::config::CheckerConfig;
use crate::diagnostics::DiagnosticHandler;

/// Source lines from the first statement's start to the last
/// statement's end, inclusive.
pub(crate) fn lines_between(tree: &Tree, first: NodeId, last: NodeId) -> u32 {
    tree.span(last)
        .end_line
        .saturating_sub(tree.span(first).start_line)
        + 1
}

/// Run every duplication detector over one module tree, reporting
/// findings through `handler`.
pub fn check_module(
    tree: &Tree,
    module: NodeId,
    config: &CheckerConfig,
    handler: &dyn DiagnosticHandler,
) {
    exprs::duplicate_exprs(tree, module, config, handler);
    blocks::duplicate_blocks(tree, module, config, handler);
    sequence::duplicate_sequence(tree, module, config, handler);
    similar::check(tree, module, config, handler);
}
