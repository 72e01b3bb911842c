//! Complex expressions used repeatedly in a module, worth extracting
//! to a local variable or helper function.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::ast::render::render;
use crate::ast::visit::{walk, Visitor};
use crate::ast::{NodeId, NodeKind, Tree};
use crate::config::CheckerConfig;
use crate::diagnostics::{Diagnostic, DiagnosticHandler, DiagnosticKind};
use crate::metrics::expression_complexity;

/// Expression kinds tracked for duplication; bare names and constants
/// never score high enough to matter.
fn is_tracked_kind(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Attribute
            | NodeKind::BinOp
            | NodeKind::BoolOp
            | NodeKind::Call
            | NodeKind::Compare
            | NodeKind::DictExpr
            | NodeKind::DictComp
            | NodeKind::IfExp
            | NodeKind::FString
            | NodeKind::Lambda
            | NodeKind::ListExpr
            | NodeKind::ListComp
            | NodeKind::SetExpr
            | NodeKind::SetComp
            | NodeKind::Starred
            | NodeKind::Subscript
            | NodeKind::TupleExpr
            | NodeKind::UnaryOp
    )
}

struct ExprCollector<'c> {
    threshold: u32,
    allowed_calls: &'c FxHashSet<String>,
    /// Rendering -> occurrences, in first-appearance order.
    groups: IndexMap<String, Vec<NodeId>>,
}

impl Visitor for ExprCollector<'_> {
    fn visit_assert(&mut self, _tree: &Tree, _id: NodeId) {}

    fn visit_expression(&mut self, tree: &Tree, id: NodeId) {
        if !is_tracked_kind(tree.kind(id)) {
            walk(self, tree, id);
            return;
        }
        match expression_complexity(tree, id, self.allowed_calls) {
            // unscorable: skip this subtree, keep looking below it
            None => walk(self, tree, id),
            Some(complexity) if complexity >= self.threshold => {
                self.groups.entry(render(tree, id)).or_default().push(id);
                walk(self, tree, id);
            }
            // children of a low-complexity expression cannot reach
            // the threshold either
            Some(_) => {}
        }
    }
}

/// Report every expression scoring at least the complexity threshold
/// that occurs verbatim two or more times. Longer expressions are
/// reported first so a nested duplicate is suppressed by its parent's
/// report.
pub fn duplicate_exprs(
    tree: &Tree,
    module: NodeId,
    config: &CheckerConfig,
    handler: &dyn DiagnosticHandler,
) {
    let allowed_calls = config.expr_functions_set();
    let mut collector = ExprCollector {
        threshold: config.expr_complexity_threshold,
        allowed_calls: &allowed_calls,
        groups: IndexMap::new(),
    };
    collector.visit(tree, module);

    let mut groups: Vec<(String, Vec<NodeId>)> = collector
        .groups
        .into_iter()
        .filter(|(_, exprs)| exprs.len() >= 2)
        .collect();
    groups.sort_by(|(name_a, exprs_a), (name_b, exprs_b)| {
        name_b.len().cmp(&name_a.len()).then_with(|| {
            let a = tree.span(exprs_a[0]);
            let b = tree.span(exprs_b[0]);
            (a.start_line, a.start_col).cmp(&(b.start_line, b.start_col))
        })
    });

    let mut emitted: FxHashSet<NodeId> = FxHashSet::default();
    for (name, exprs) in groups {
        let suppressed = tree
            .parent(exprs[0])
            .is_some_and(|parent| emitted.contains(&parent));
        if !suppressed {
            let mut sorted = exprs.clone();
            sorted.sort_by_key(|&e| (tree.span(e).start_line, tree.span(e).end_line));
            let lines: Vec<String> = sorted
                .iter()
                .map(|&e| tree.span(e).start_line.to_string())
                .collect();
            handler.report(Diagnostic::new(
                DiagnosticKind::DuplicateExprs,
                tree.span(exprs[0]),
                vec![name, lines.join(", ")],
            ));
        }
        emitted.extend(exprs);
    }
}
