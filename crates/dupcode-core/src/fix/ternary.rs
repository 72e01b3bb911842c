//! Rewrite identical-up-to-values branches as nested conditional
//! expressions.

use crate::antiunify::Aunified;
use crate::ast::build::Builder;
use crate::ast::render::render;
use crate::ast::{NodeId, Tree};
use crate::config::CheckerConfig;
use crate::diagnostics::DiagnosticKind;
use crate::matchers::{is_bool_const, negate};
use crate::metrics::{statement_count_seq, token_count_seq};

use super::{materialize_sub, Fixed};

/// Applicable only to chains of at most two tests, and only when no
/// variable sits inside a binary-operator expression.
pub fn fixed_by_ternary(
    src: &Tree,
    aunified: &Aunified,
    tests: &[NodeId],
    config: &CheckerConfig,
) -> Option<Fixed> {
    if !config.suggest_ternary {
        return None;
    }
    if tests.len() > 2 {
        return None;
    }
    if aunified.in_complex_expression() {
        return None;
    }

    let mut builder = Builder::new();
    let mut exprs = Vec::new();
    for avar in &aunified.avars {
        debug_assert_eq!(avar.subs.len(), tests.len() + 1);
        let mut expr = materialize_sub(&mut builder, src, avar.subs.last()?);
        for (&test, sub) in tests.iter().zip(&avar.subs).rev() {
            let body = materialize_sub(&mut builder, src, sub);
            expr = conditional(&mut builder, src, test, body, expr);
        }
        exprs.push(expr);
    }

    let built = builder.into_tree();
    let core_tokens = token_count_seq(&aunified.tree, &aunified.roots);
    let tokens =
        core_tokens - aunified.avars.len() as u32 + token_count_seq(&built, &exprs);
    let statements = statement_count_seq(&aunified.tree, &aunified.roots, false, true);

    Some(Fixed {
        kind: DiagnosticKind::IfToTernary,
        tokens,
        statements,
        args: Vec::new(),
    })
}

/// Build `body if test else orelse`, simplified where the branch
/// values make the conditional redundant: `True if c else False` is
/// `c`, `False if c else True` is its negation, equal branches are
/// the value itself.
fn conditional(
    builder: &mut Builder,
    src: &Tree,
    test: NodeId,
    body: NodeId,
    orelse: NodeId,
) -> NodeId {
    let tree = builder.tree();
    let plain = is_bool_const(tree, body, true) && is_bool_const(tree, orelse, false);
    let inverted = is_bool_const(tree, body, false) && is_bool_const(tree, orelse, true);
    let equal = render(tree, body) == render(tree, orelse);
    if plain {
        return builder.copy_from(src, test);
    }
    if inverted {
        return negate(builder, src, test);
    }
    if equal {
        return body;
    }
    let test_copy = builder.copy_from(src, test);
    builder.if_exp(0, test_copy, body, orelse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::antiunify::antiunify;
    use crate::ast::build::Builder;
    use crate::ast::CmpOp;

    /// `if x: return True else: return False` collapses to `return x`.
    #[test]
    fn test_bool_branches_simplify_to_test() {
        let mut b = Builder::new();
        let x = b.name(1, "x");
        let t = b.bool(2, true);
        let r1 = b.ret(2, Some(t));
        let f = b.bool(4, false);
        let r2 = b.ret(4, Some(f));
        let chain = b.if_else(1, x, vec![r1], vec![r2]);
        let tree = b.into_tree();

        let aunified = antiunify(&tree, &[vec![r1], vec![r2]]);
        let test = tree.if_test(chain);
        let fixed =
            fixed_by_ternary(&tree, &aunified, &[test], &CheckerConfig::default()).unwrap();

        // the rewrite is `return x`: two tokens
        assert_eq!(fixed.tokens, 2);
        assert_eq!(fixed.statements, 1);
        assert_eq!(fixed.kind, DiagnosticKind::IfToTernary);
    }

    #[test]
    fn test_inverted_bool_branches_negate_test() {
        let mut b = Builder::new();
        let x = b.name(1, "x");
        let zero = b.int(1, 0);
        let test = b.compare(1, x, vec![(CmpOp::Lt, zero)]);
        let f = b.bool(2, false);
        let r1 = b.ret(2, Some(f));
        let t = b.bool(4, true);
        let r2 = b.ret(4, Some(t));
        let _chain = b.if_else(1, test, vec![r1], vec![r2]);
        let tree = b.into_tree();

        let aunified = antiunify(&tree, &[vec![r1], vec![r2]]);
        let fixed =
            fixed_by_ternary(&tree, &aunified, &[test], &CheckerConfig::default()).unwrap();
        // `return x >= 0`: the return, the comparison and its two leaves
        assert_eq!(fixed.tokens, 4);
    }

    #[test]
    fn test_rejects_more_than_two_tests() {
        let mut b = Builder::new();
        let mk_ret = |b: &mut Builder, line: u32, v: i64| {
            let value = b.int(line, v);
            b.ret(line, Some(value))
        };
        let r1 = mk_ret(&mut b, 1, 1);
        let r2 = mk_ret(&mut b, 2, 2);
        let r3 = mk_ret(&mut b, 3, 3);
        let r4 = mk_ret(&mut b, 4, 4);
        let t1 = b.name(1, "a");
        let t2 = b.name(2, "b");
        let t3 = b.name(3, "c");
        let tree_builder_tests = [t1, t2, t3];
        let tree = b.into_tree();

        let aunified = antiunify(&tree, &[vec![r1], vec![r2], vec![r3], vec![r4]]);
        assert!(fixed_by_ternary(
            &tree,
            &aunified,
            &tree_builder_tests,
            &CheckerConfig::default()
        )
        .is_none());
    }

    #[test]
    fn test_rejects_avar_in_binop() {
        let mut b = Builder::new();
        // x = a + 1  vs  x = a + 2 (the varying constant sits in a BinOp)
        let mk = |b: &mut Builder, line: u32, v: i64| {
            let t = b.assign_name(line, "x");
            let a = b.name(line, "a");
            let c = b.int(line, v);
            let sum = b.binop(line, crate::ast::BinaryOp::Add, a, c);
            b.assign(line, vec![t], sum)
        };
        let s1 = mk(&mut b, 2, 1);
        let s2 = mk(&mut b, 4, 2);
        let test = b.name(1, "flag");
        let tree = b.into_tree();

        let aunified = antiunify(&tree, &[vec![s1], vec![s2]]);
        assert!(aunified.in_complex_expression());
        assert!(
            fixed_by_ternary(&tree, &aunified, &[test], &CheckerConfig::default()).is_none()
        );
    }
}
