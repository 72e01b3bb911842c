//! End-to-end scenarios over the public API: build a tree, run the
//! detectors, check what gets reported.

use dupcode_core::ast::render::render_seq;
use dupcode_core::ast::{NodeId, Value};
use dupcode_core::fix::loops::fixed_by_loop;
use dupcode_core::metrics::saves_enough;
use dupcode_core::{
    antiunify, check_module, Builder, CheckerConfig, CollectingDiagnosticHandler,
    DiagnosticHandler, DiagnosticKind, SubValue,
};
use proptest::prelude::*;

fn append_stmt(b: &mut Builder, line: u32, list: &str, value: i64) -> NodeId {
    let obj = b.name(line, list);
    let method = b.attribute(line, obj, "append");
    let arg = b.int(line, value);
    let call = b.call(line, method, vec![arg]);
    b.expr_stmt(line, call)
}

/// `if x: return True else: return False` antiunifies to
/// `return <var>` with boolean substitutions, and the ternary
/// synthesizer wins with the equivalent of `return x`.
#[test]
fn scenario_bool_returns_become_ternary() {
    let mut b = Builder::new();
    let x = b.name(1, "x");
    let t = b.bool(2, true);
    let r1 = b.ret(2, Some(t));
    let f = b.bool(4, false);
    let r2 = b.ret(4, Some(f));
    let chain = b.if_else(1, x, vec![r1], vec![r2]);
    let (tree, module) = b.module(vec![chain]);

    let aunified = antiunify(&tree, &[vec![r1], vec![r2]]);
    assert_eq!(aunified.avars.len(), 1);
    assert!(matches!(
        aunified.avars[0].subs[0],
        SubValue::Value(Value::Bool(true))
    ));
    assert!(matches!(
        aunified.avars[0].subs[1],
        SubValue::Value(Value::Bool(false))
    ));
    assert_eq!(
        render_seq(&aunified.tree, &aunified.roots),
        "return sub_0"
    );

    let handler = CollectingDiagnosticHandler::new();
    check_module(&tree, module, &CheckerConfig::default(), &handler);
    let diags = handler.get_diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].kind, DiagnosticKind::IfToTernary);
    assert_eq!(diags[0].span.start_line, 1);
}

/// Three `a.append(n)` statements form a loop candidate whose
/// substitution sequence is an arithmetic progression; four
/// repetitions clear the sequence detector's threshold.
#[test]
fn scenario_append_run_becomes_range_loop() {
    let mut b = Builder::new();
    let stmts: Vec<NodeId> = (1..=3)
        .map(|i| append_stmt(&mut b, i as u32, "a", i))
        .collect();
    let (tree, _module) = b.module(stmts.clone());

    let runs: Vec<Vec<NodeId>> = stmts.iter().map(|&s| vec![s]).collect();
    let aunified = antiunify(&tree, &runs);
    assert_eq!(aunified.avars.len(), 1);
    let subs: Vec<i64> = aunified.avars[0]
        .subs
        .iter()
        .filter_map(SubValue::as_int)
        .collect();
    assert_eq!(subs, vec![1, 2, 3]);

    // subblock length 1, repeated 3 times, start 1 step 1
    let fixed = fixed_by_loop(&tree, &aunified, &runs, &CheckerConfig::default())
        .expect("three repetitions of one statement are enough for the synthesizer");
    assert_eq!(fixed.args, vec!["3".to_string(), "1".to_string()]);

    // three repetitions stay below the sequence detector's threshold
    let mut b = Builder::new();
    let three: Vec<NodeId> = (1..=3)
        .map(|i| append_stmt(&mut b, i as u32, "a", i))
        .collect();
    let (tree, module) = b.module(three);
    let handler = CollectingDiagnosticHandler::new();
    check_module(&tree, module, &CheckerConfig::default(), &handler);
    assert!(!handler
        .get_diagnostics()
        .iter()
        .any(|d| d.kind == DiagnosticKind::DuplicateSequence));

    // four do not
    let mut b = Builder::new();
    let four: Vec<NodeId> = (1..=4)
        .map(|i| append_stmt(&mut b, i as u32, "a", i))
        .collect();
    let (tree, module) = b.module(four);
    let handler = CollectingDiagnosticHandler::new();
    check_module(&tree, module, &CheckerConfig::default(), &handler);
    let diags = handler.get_diagnostics();
    assert!(diags
        .iter()
        .any(|d| d.kind == DiagnosticKind::DuplicateSequence
            && d.args == vec!["4".to_string(), "1".to_string()]));
}

/// Two if blocks with bodies differing only in one operator match as
/// duplicate blocks under the default three-difference bound.
#[test]
fn scenario_one_operator_difference_is_duplicate_block() {
    use dupcode_core::ast::BinaryOp;

    let mut b = Builder::new();
    let body = |b: &mut Builder, line: u32, op: BinaryOp| {
        let s1 = {
            let t = b.assign_name(line, "t");
            let a = b.name(line, "a");
            let bb = b.name(line, "b");
            let combined = b.binop(line, op, a, bb);
            b.assign(line, vec![t], combined)
        };
        let s2 = {
            let out = b.name(line + 1, "out");
            let method = b.attribute(line + 1, out, "push");
            let t = b.name(line + 1, "t");
            let call = b.call(line + 1, method, vec![t]);
            b.expr_stmt(line + 1, call)
        };
        let s3 = {
            let count = b.assign_name(line + 2, "count");
            let one = b.int(line + 2, 1);
            b.aug_assign(line + 2, BinaryOp::Add, count, one)
        };
        vec![s1, s2, s3]
    };
    let t1 = b.name(1, "first");
    let body1 = body(&mut b, 2, BinaryOp::Add);
    let if1 = b.if_stmt(1, t1, body1);
    let t2 = b.name(5, "second");
    let body2 = body(&mut b, 6, BinaryOp::Sub);
    let if2 = b.if_stmt(5, t2, body2);
    let (tree, module) = b.module(vec![if1, if2]);

    let handler = CollectingDiagnosticHandler::new();
    check_module(&tree, module, &CheckerConfig::default(), &handler);
    let diags = handler.get_diagnostics();
    assert!(diags
        .iter()
        .any(|d| d.kind == DiagnosticKind::DuplicateBlocks && d.args[0] == "2 and 6"));
}

/// A variable in call-target position rules out the function and
/// variable rewrites; moving the if into the loop still applies.
#[test]
fn scenario_called_position_limits_rewrites() {
    use dupcode_core::ast::BinaryOp;

    let mut b = Builder::new();
    let branch = |b: &mut Builder, line: u32, func: &str| {
        let target = b.assign_name(line, "i");
        let items = b.name(line, "items");
        let body = {
            let s1 = {
                let t = b.assign_name(line + 1, "v");
                let i = b.name(line + 1, "i");
                let scale = b.name(line + 1, "scale");
                let product = b.binop(line + 1, BinaryOp::Mul, i, scale);
                b.assign(line + 1, vec![t], product)
            };
            let s2 = {
                let v = b.name(line + 2, "v");
                let call = b.call_name(line + 2, "log", vec![v]);
                b.expr_stmt(line + 2, call)
            };
            let s3 = {
                let v = b.name(line + 3, "v");
                let call = b.call_name(line + 3, func, vec![v]);
                b.expr_stmt(line + 3, call)
            };
            vec![s1, s2, s3]
        };
        b.for_stmt(line, target, items, body, vec![])
    };
    let flag = b.name(1, "flag");
    let loop1 = branch(&mut b, 2, "first");
    let loop2 = branch(&mut b, 7, "second");
    let chain = b.if_else(1, flag, vec![loop1], vec![loop2]);
    let (tree, module) = b.module(vec![chain]);

    let aunified = antiunify(&tree, &[vec![loop1], vec![loop2]]);
    assert!(aunified.called_avar());

    let handler = CollectingDiagnosticHandler::new();
    check_module(&tree, module, &CheckerConfig::default(), &handler);
    let diags = handler.get_diagnostics();
    assert!(diags.iter().any(|d| d.kind == DiagnosticKind::IfIntoBlock));
    for diag in &diags {
        assert!(!matches!(
            diag.kind,
            DiagnosticKind::IfToTernary
                | DiagnosticKind::IfToVariables
                | DiagnosticKind::SimilarToFunction
        ));
    }
}

#[test]
fn savings_gate_is_strict_at_the_ratio() {
    assert!(!saves_enough(100, 10, 80, 10, 0.8));
    assert!(saves_enough(100, 10, 79, 10, 0.8));
    assert!(!saves_enough(100, 10, 20, 11, 0.8));
}

#[derive(Debug, Clone)]
enum StmtSpec {
    Assign { target: char, value: i64 },
    Append { list: char, value: i64 },
    Ret { value: i64 },
}

fn stmt_spec() -> impl Strategy<Value = StmtSpec> {
    prop_oneof![
        (prop::sample::select(vec!['a', 'b']), 0..10i64)
            .prop_map(|(target, value)| StmtSpec::Assign { target, value }),
        (prop::sample::select(vec!['x', 'y']), 0..10i64)
            .prop_map(|(list, value)| StmtSpec::Append { list, value }),
        (0..10i64).prop_map(|value| StmtSpec::Ret { value }),
    ]
}

fn build_run(b: &mut Builder, line: &mut u32, specs: &[StmtSpec]) -> Vec<NodeId> {
    specs
        .iter()
        .map(|spec| {
            let l = *line;
            *line += 1;
            match spec {
                StmtSpec::Assign { target, value } => {
                    let t = b.assign_name(l, target.to_string());
                    let v = b.int(l, *value);
                    b.assign(l, vec![t], v)
                }
                StmtSpec::Append { list, value } => append_stmt(b, l, &list.to_string(), *value),
                StmtSpec::Ret { value } => {
                    let v = b.int(l, *value);
                    b.ret(l, Some(v))
                }
            }
        })
        .collect()
}

proptest! {
    /// Substituting each variable's per-input value back into the
    /// core reproduces every input exactly.
    #[test]
    fn antiunification_identity(
        specs1 in prop::collection::vec(stmt_spec(), 1..5),
        specs2 in prop::collection::vec(stmt_spec(), 1..5),
    ) {
        let mut b = Builder::new();
        let mut line = 1;
        let run1 = build_run(&mut b, &mut line, &specs1);
        let run2 = build_run(&mut b, &mut line, &specs2);
        let (tree, _module) = {
            let all: Vec<NodeId> = run1.iter().chain(&run2).copied().collect();
            b.module(all)
        };

        let inputs = vec![run1, run2];
        let aunified = antiunify(&tree, &inputs);
        prop_assert!(aunified
            .avars
            .iter()
            .all(|avar| avar.subs.len() == inputs.len()));
        for (i, input) in inputs.iter().enumerate() {
            let (reified_tree, reified) = aunified.reify(&tree, i);
            prop_assert_eq!(
                render_seq(&reified_tree, &reified),
                render_seq(&tree, input)
            );
        }
    }

    /// Antiunifying the same inputs twice yields the same variables
    /// and the same core.
    #[test]
    fn antiunification_determinism(
        specs1 in prop::collection::vec(stmt_spec(), 1..5),
        specs2 in prop::collection::vec(stmt_spec(), 1..5),
    ) {
        let mut b = Builder::new();
        let mut line = 1;
        let run1 = build_run(&mut b, &mut line, &specs1);
        let run2 = build_run(&mut b, &mut line, &specs2);
        let tree = b.into_tree();

        let inputs = vec![run1, run2];
        let first = antiunify(&tree, &inputs);
        let second = antiunify(&tree, &inputs);
        prop_assert_eq!(first.avars.len(), second.avars.len());
        prop_assert_eq!(
            render_seq(&first.tree, &first.roots),
            render_seq(&second.tree, &second.roots)
        );
    }

    /// A rewrite at or above the ratio is never accepted, whatever
    /// the sizes.
    #[test]
    fn savings_gate_monotonicity(tokens_before in 1u32..500, stmts in 0u32..50) {
        let at_ratio = (0.8 * tokens_before as f64).ceil() as u32;
        prop_assert!(!saves_enough(tokens_before, stmts, at_ratio, stmts, 0.8));
        prop_assert!(!saves_enough(tokens_before, stmts, tokens_before, stmts, 0.8));
    }
}
