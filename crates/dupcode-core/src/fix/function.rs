//! Extract the generalized code into a shared helper function, one
//! call per branch or duplicated run.

use crate::analysis::{control_statements, free_vars, vars_used_after};
use crate::antiunify::Aunified;
use crate::ast::build::Builder;
use crate::ast::{CmpOp, NodeId, Tree};
use crate::config::CheckerConfig;
use crate::diagnostics::DiagnosticKind;
use crate::metrics::{statement_count, statement_count_seq, token_count, token_count_seq};

use super::{build_if_chain, dedup_avars, materialize_sub, Fixed};

struct HelperParts {
    /// Call-site statements, one sequence per input.
    calls: Vec<Vec<NodeId>>,
    aux_def: NodeId,
    /// Escaping control-flow signals needing post-call propagation.
    control_needed: usize,
}

/// Build the helper function and its per-input call sites.
///
/// Parameters are the distinct variable tuples; free variables of the
/// core are passed through as extra arguments. When the region leaks
/// values or control flow, the call grows assignment targets and, per
/// control signal, a propagation stub. `inline_stubs` appends the
/// stubs at each call site (duplicated runs); otherwise the caller
/// places them after the conditional.
fn build_helper(
    src: &Tree,
    aunified: &Aunified,
    inputs: usize,
    used_after_region: &[NodeId],
    inline_stubs: bool,
    builder: &mut Builder,
) -> HelperParts {
    let kept = dedup_avars(src, aunified);
    let extra_args = free_vars(&aunified.tree, &aunified.roots);
    let returns_needed = vars_used_after(src, used_after_region).len();
    let control_needed = control_statements(&aunified.tree, &aunified.roots);

    let mut calls = Vec::with_capacity(inputs);
    for input in 0..inputs {
        let mut args: Vec<NodeId> = kept
            .iter()
            .map(|&index| materialize_sub(builder, src, &aunified.avars[index].subs[input]))
            .collect();
        for name in &extra_args {
            args.push(builder.name(0, name.clone()));
        }
        let call = builder.call_name(0, "AUX", args);

        let mut stmts = Vec::new();
        if returns_needed + control_needed == 0 {
            stmts.push(builder.expr_stmt(0, call));
        } else {
            let targets: Vec<NodeId> = (0..control_needed + returns_needed)
                .map(|i| builder.assign_name(0, format!("r{}", i)))
                .collect();
            stmts.push(builder.assign(0, targets, call));
        }
        if inline_stubs {
            stmts.extend(control_stubs(builder, control_needed));
        }
        calls.push(stmts);
    }

    let param_names: Vec<String> = kept
        .iter()
        .map(|&index| aunified.avars[index].name.clone())
        .chain(extra_args.iter().cloned())
        .collect();
    let params: Vec<&str> = param_names.iter().map(String::as_str).collect();
    let body: Vec<NodeId> = aunified
        .roots
        .iter()
        .map(|&root| builder.copy_from(&aunified.tree, root))
        .collect();
    let aux_def = builder.func_def(0, "AUX", params, body);

    HelperParts {
        calls,
        aux_def,
        control_needed,
    }
}

/// `if r_i is None: return` stubs forwarding escaped control flow.
fn control_stubs(builder: &mut Builder, control_needed: usize) -> Vec<NodeId> {
    (0..control_needed)
        .map(|i| {
            let name = builder.name(0, format!("r{}", i));
            let none = builder.none(0);
            let test = builder.compare(0, name, vec![(CmpOp::Is, none)]);
            let ret = builder.ret(0, None);
            builder.if_stmt(0, test, vec![ret])
        })
        .collect()
}

/// Helper extraction for an if/elif/else chain: calls go into a
/// rebuilt conditional, stubs after it.
pub fn fixed_by_function_ifs(
    src: &Tree,
    aunified: &Aunified,
    tests: &[NodeId],
    used_after_region: &[NodeId],
    config: &CheckerConfig,
) -> Option<Fixed> {
    if !config.suggest_function {
        return None;
    }

    let mut builder = Builder::new();
    let parts = build_helper(
        src,
        aunified,
        tests.len() + 1,
        used_after_region,
        false,
        &mut builder,
    );
    let test_copies = tests.iter().map(|&t| builder.copy_from(src, t)).collect();
    let root = build_if_chain(&mut builder, test_copies, parts.calls);
    let mut rewrite = vec![root];
    rewrite.extend(control_stubs(&mut builder, parts.control_needed));
    let built = builder.into_tree();

    let tokens = token_count_seq(&built, &rewrite) + token_count(&built, parts.aux_def);
    let statements = statement_count_seq(&built, &rewrite, false, true)
        + statement_count(&built, parts.aux_def, false, true);

    Some(Fixed {
        kind: DiagnosticKind::SimilarToFunction,
        tokens,
        statements,
        args: Vec::new(),
    })
}

/// Helper extraction for duplicated statement runs: one call sequence
/// per run, stubs inline after each call.
pub fn fixed_by_function_runs(
    src: &Tree,
    aunified: &Aunified,
    to_aunify: &[Vec<NodeId>],
    config: &CheckerConfig,
) -> Option<Fixed> {
    if !config.suggest_function {
        return None;
    }

    let mut builder = Builder::new();
    let parts = build_helper(
        src,
        aunified,
        to_aunify.len(),
        &to_aunify[0],
        true,
        &mut builder,
    );
    let calls: Vec<NodeId> = parts.calls.into_iter().flatten().collect();
    let built = builder.into_tree();

    let tokens = token_count_seq(&built, &calls) + token_count(&built, parts.aux_def);
    let statements = statement_count_seq(&built, &calls, false, true)
        + statement_count(&built, parts.aux_def, false, true);

    Some(Fixed {
        kind: DiagnosticKind::SimilarToFunction,
        tokens,
        statements,
        args: Vec::new(),
    })
}
