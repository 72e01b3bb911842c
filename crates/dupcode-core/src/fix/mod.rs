//! Fix synthesizers: given a generalized core and its variables,
//! construct a candidate replacement tree and estimate its cost.
//!
//! The synthetic trees built here exist purely for cost estimation
//! and message text; they are never written back into the source
//! tree. Each synthesizer returns `None` when it does not apply, and
//! the caller keeps the cheapest candidate that clears the savings
//! gate.

pub mod function;
pub mod loops;
pub mod move_if;
pub mod ternary;
pub mod variables;

use crate::antiunify::SubValue;
use crate::ast::build::Builder;
use crate::ast::{NodeId, Tree, Value};
use crate::diagnostics::DiagnosticKind;
use crate::metrics;

/// A candidate rewrite with its estimated cost.
#[derive(Debug, Clone)]
pub struct Fixed {
    pub kind: DiagnosticKind,
    pub tokens: u32,
    pub statements: u32,
    pub args: Vec<String>,
}

impl Fixed {
    pub fn saves_enough(&self, tokens_before: u32, stmts_before: u32, ratio: f64) -> bool {
        metrics::saves_enough(tokens_before, stmts_before, self.tokens, self.statements, ratio)
    }
}

/// Turn a substituted value back into a node: subtrees are copied,
/// identifier payloads become names, other scalars become constants.
pub(crate) fn materialize_sub(builder: &mut Builder, src: &Tree, sub: &SubValue) -> NodeId {
    match sub {
        SubValue::Node(id) => builder.copy_from(src, *id),
        SubValue::Seq(ids) => {
            let copies = ids.iter().map(|&id| builder.copy_from(src, id)).collect();
            builder.tuple_expr(0, copies)
        }
        SubValue::Value(Value::Ident(name)) => builder.name(0, name.clone()),
        SubValue::Value(value) => builder.constant(0, value.clone()),
        SubValue::Op(op) => builder.name(0, op.symbol()),
    }
}

/// Build an if/elif/…/else chain bottom-up from the given tests and
/// per-branch bodies (`bodies.len() == tests.len() + 1`, last one is
/// the else block). Returns the root if.
pub(crate) fn build_if_chain(
    builder: &mut Builder,
    tests: Vec<NodeId>,
    mut bodies: Vec<Vec<NodeId>>,
) -> NodeId {
    debug_assert_eq!(bodies.len(), tests.len() + 1);
    let else_body = bodies.pop().unwrap_or_default();
    let mut orelse = if else_body.is_empty() {
        builder.empty()
    } else {
        builder.block(else_body)
    };
    for (test, body) in tests.into_iter().zip(bodies).rev() {
        orelse = builder.if_full(0, test, body, orelse);
    }
    orelse
}

/// Dedup variables by their substitution tuple, keeping the first
/// occurrence; identical substitutions across positions collapse to
/// one shared parameter.
pub(crate) fn dedup_avars(src: &Tree, aunified: &crate::antiunify::Aunified) -> Vec<usize> {
    let mut seen: Vec<Vec<String>> = Vec::new();
    let mut kept = Vec::new();
    for (index, avar) in aunified.avars.iter().enumerate() {
        let key: Vec<String> = avar.subs.iter().map(|s| s.render_key(src)).collect();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        kept.push(index);
    }
    kept
}
