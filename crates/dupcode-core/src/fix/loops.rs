//! Collapse a run of repeated sub-blocks into a loop over the values
//! that vary between repetitions.

use crate::antiunify::{Aunified, SubValue};
use crate::ast::build::Builder;
use crate::ast::{NodeId, Tree};
use crate::config::CheckerConfig;
use crate::diagnostics::DiagnosticKind;
use crate::metrics::{statement_count, statement_count_seq, token_count};

use super::{materialize_sub, Fixed};

/// `range(...)` call covering an arithmetic progression, with the
/// argument count trimmed: a step of 1 drops the step argument, a
/// start of 0 additionally drops the start.
fn range_node(builder: &mut Builder, sequence: &[SubValue]) -> Option<NodeId> {
    let values: Vec<i64> = sequence
        .iter()
        .map(SubValue::as_int)
        .collect::<Option<Vec<_>>>()?;
    let (first, rest) = values.split_first()?;
    let second = rest.first()?;
    let step = second - first;
    if values.windows(2).any(|w| w[1] - w[0] != step) {
        return None;
    }

    let last = values[values.len() - 1];
    let start = builder.int(0, *first);
    let stop = builder.int(0, last + 1);
    let args = if step != 1 {
        let step = builder.int(0, step);
        vec![start, stop, step]
    } else if *first != 0 {
        vec![start, stop]
    } else {
        vec![stop]
    };
    Some(builder.call_name(0, "range", args))
}

/// Iteration source for the proposed loop: a bare `range` when
/// nothing varies, a range or explicit tuple for one variable, zipped
/// ranges or a list of per-iteration tuples for several.
fn build_iter(
    builder: &mut Builder,
    src: &Tree,
    aunified: &Aunified,
    repetitions: usize,
) -> NodeId {
    let sequences: Vec<&Vec<SubValue>> =
        aunified.avars.iter().map(|avar| &avar.subs).collect();

    if sequences.is_empty() {
        let count = builder.int(0, repetitions as i64);
        return builder.call_name(0, "range", vec![count]);
    }

    if sequences.len() == 1 {
        if let Some(range) = range_node(builder, sequences[0]) {
            return range;
        }
        let values = sequences[0]
            .iter()
            .map(|sub| materialize_sub(builder, src, sub))
            .collect();
        return builder.tuple_expr(0, values);
    }

    let ranges: Vec<Option<NodeId>> = sequences
        .iter()
        .map(|sequence| range_node(builder, sequence))
        .collect();
    if let Some(ranges) = ranges.into_iter().collect::<Option<Vec<_>>>() {
        return builder.call_name(0, "zip", ranges);
    }

    let tuples = (0..sequences[0].len())
        .map(|i| {
            let elements = sequences
                .iter()
                .map(|sequence| materialize_sub(builder, src, &sequence[i]))
                .collect();
            builder.tuple_expr(0, elements)
        })
        .collect();
    builder.list_expr(0, tuples)
}

/// Loop target: `_` when nothing varies, the variable's name for one,
/// a tuple of names for several.
fn build_target(builder: &mut Builder, aunified: &Aunified) -> NodeId {
    match aunified.avars.len() {
        0 => builder.assign_name(0, "_"),
        1 => builder.assign_name(0, aunified.avars[0].name.clone()),
        _ => {
            let names = aunified
                .avars
                .iter()
                .map(|avar| builder.assign_name(0, avar.name.clone()))
                .collect();
            builder.tuple_expr(0, names)
        }
    }
}

/// Rejected outright for shape-mismatch, assignment-target or
/// called-position variables, and for runs too small to be worth a
/// loop (neither more repetitions nor more statements per repetition
/// than `min_loop_extent`).
pub fn fixed_by_loop(
    src: &Tree,
    aunified: &Aunified,
    to_aunify: &[Vec<NodeId>],
    config: &CheckerConfig,
) -> Option<Fixed> {
    if !config.suggest_loop {
        return None;
    }
    if aunified.has_mismatch() || aunified.assigns_to_avar() || aunified.called_avar() {
        return None;
    }
    if to_aunify.len().max(to_aunify[0].len()) <= config.min_loop_extent {
        return None;
    }

    let mut builder = Builder::new();
    let target = build_target(&mut builder, aunified);
    let iter = build_iter(&mut builder, src, aunified, to_aunify.len());
    let body = aunified
        .roots
        .iter()
        .map(|&root| builder.copy_from(&aunified.tree, root))
        .collect();
    let for_ = builder.for_stmt(0, target, iter, body, vec![]);
    let built = builder.into_tree();

    Some(Fixed {
        kind: DiagnosticKind::SimilarToLoop,
        tokens: token_count(&built, for_),
        statements: statement_count(&built, for_, false, true),
        args: vec![
            to_aunify.len().to_string(),
            statement_count_seq(src, &to_aunify[0], false, true).to_string(),
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::antiunify::antiunify;
    use crate::ast::build::Builder;
    use crate::ast::render::render;

    fn append_run(b: &mut Builder, values: &[i64]) -> Vec<Vec<NodeId>> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let line = i as u32 + 1;
                let obj = b.name(line, "a");
                let method = b.attribute(line, obj, "append");
                let arg = b.int(line, v);
                let call = b.call(line, method, vec![arg]);
                vec![b.expr_stmt(line, call)]
            })
            .collect()
    }

    #[test]
    fn test_arithmetic_progression_becomes_range() {
        let mut b = Builder::new();
        let runs = append_run(&mut b, &[1, 2, 3]);
        let tree = b.into_tree();
        let aunified = antiunify(&tree, &runs);

        let fixed = fixed_by_loop(&tree, &aunified, &runs, &CheckerConfig::default()).unwrap();
        assert_eq!(fixed.kind, DiagnosticKind::SimilarToLoop);
        assert_eq!(fixed.args, vec!["3".to_string(), "1".to_string()]);

        let mut out = Builder::new();
        let range = range_node(
            &mut out,
            &[
                SubValue::Value(crate::ast::Value::Int(1)),
                SubValue::Value(crate::ast::Value::Int(2)),
                SubValue::Value(crate::ast::Value::Int(3)),
            ],
        )
        .unwrap();
        let out_tree = out.into_tree();
        assert_eq!(render(&out_tree, range), "range(1, 4)");
    }

    #[test]
    fn test_range_argument_trimming() {
        let seq = |values: &[i64]| {
            values
                .iter()
                .map(|&v| SubValue::Value(crate::ast::Value::Int(v)))
                .collect::<Vec<_>>()
        };

        let mut b = Builder::new();
        let from_zero = range_node(&mut b, &seq(&[0, 1, 2])).unwrap();
        let stepped = range_node(&mut b, &seq(&[0, 2, 4])).unwrap();
        let tree = b.into_tree();
        assert_eq!(render(&tree, from_zero), "range(3)");
        assert_eq!(render(&tree, stepped), "range(0, 5, 2)");

        let mut b = Builder::new();
        assert!(range_node(&mut b, &seq(&[1, 2, 4])).is_none());
    }

    #[test]
    fn test_non_integers_fall_back_to_tuple() {
        let mut b = Builder::new();
        let runs: Vec<Vec<NodeId>> = ["red", "green", "blue"]
            .iter()
            .enumerate()
            .map(|(i, color)| {
                let line = i as u32 + 1;
                let arg = b.str(line, *color);
                let call = b.call_name(line, "paint", vec![arg]);
                vec![b.expr_stmt(line, call)]
            })
            .collect();
        let tree = b.into_tree();
        let aunified = antiunify(&tree, &runs);

        let fixed = fixed_by_loop(&tree, &aunified, &runs, &CheckerConfig::default()).unwrap();
        // for sub_0 in ('red', 'green', 'blue'): paint(sub_0)
        // loop + target + tuple of three + callee + name + arg
        assert!(fixed.tokens > 0);
        assert_eq!(fixed.statements, 2);
    }

    #[test]
    fn test_too_small_run_rejected() {
        let mut b = Builder::new();
        let runs = append_run(&mut b, &[1, 2]);
        let tree = b.into_tree();
        let aunified = antiunify(&tree, &runs);
        // two repetitions of one statement never earn a loop
        assert!(fixed_by_loop(&tree, &aunified, &runs, &CheckerConfig::default()).is_none());
    }

    #[test]
    fn test_called_variable_rejected() {
        let mut b = Builder::new();
        let runs: Vec<Vec<NodeId>> = ["setup", "run", "teardown"]
            .iter()
            .enumerate()
            .map(|(i, func)| {
                let line = i as u32 + 1;
                let call = b.call_name(line, *func, vec![]);
                vec![b.expr_stmt(line, call)]
            })
            .collect();
        let tree = b.into_tree();
        let aunified = antiunify(&tree, &runs);
        assert!(aunified.called_avar());
        assert!(fixed_by_loop(&tree, &aunified, &runs, &CheckerConfig::default()).is_none());
    }
}
