//! Assign each divergent value to a variable inside the branches,
//! then share the generalized code below the conditional.

use crate::antiunify::Aunified;
use crate::ast::build::Builder;
use crate::ast::{NodeId, Tree};
use crate::config::CheckerConfig;
use crate::diagnostics::DiagnosticKind;
use crate::metrics::{statement_count, statement_count_seq, token_count, token_count_seq};

use super::{build_if_chain, dedup_avars, materialize_sub, Fixed};

/// Not applicable when a variable occupies a called position (the
/// caller filters that); each distinct substitution tuple becomes one
/// assignment per branch.
pub fn fixed_by_vars(
    src: &Tree,
    aunified: &Aunified,
    tests: &[NodeId],
    config: &CheckerConfig,
) -> Option<Fixed> {
    if !config.suggest_variables {
        return None;
    }

    let kept = dedup_avars(src, aunified);
    let mut builder = Builder::new();
    let mut bodies: Vec<Vec<NodeId>> = vec![Vec::new(); tests.len() + 1];
    for &index in &kept {
        let avar = &aunified.avars[index];
        for (branch, sub) in avar.subs.iter().enumerate() {
            let target = builder.assign_name(0, avar.name.clone());
            let value = materialize_sub(&mut builder, src, sub);
            let assign = builder.assign(0, vec![target], value);
            bodies[branch].push(assign);
        }
    }

    let test_copies = tests.iter().map(|&t| builder.copy_from(src, t)).collect();
    let root = build_if_chain(&mut builder, test_copies, bodies);
    let built = builder.into_tree();

    let tokens = token_count(&built, root) + token_count_seq(&aunified.tree, &aunified.roots);
    let statements = statement_count(&built, root, false, true)
        + statement_count_seq(&aunified.tree, &aunified.roots, false, true);

    Some(Fixed {
        kind: DiagnosticKind::IfToVariables,
        tokens,
        statements,
        args: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::antiunify::antiunify;
    use crate::ast::build::Builder;

    #[test]
    fn test_distinct_tuples_get_one_assignment_each() {
        let mut b = Builder::new();
        // log(1, "a"); log(1, "a")  vs  log(2, "b"); log(2, "b")
        // two variables, but each tuple repeats, so one assignment per
        // branch per distinct tuple
        let mk = |b: &mut Builder, line: u32, n: i64, s: &str| {
            let stmt1 = {
                let num = b.int(line, n);
                let text = b.str(line, s);
                let call = b.call_name(line, "log", vec![num, text]);
                b.expr_stmt(line, call)
            };
            let stmt2 = {
                let num = b.int(line + 1, n);
                let text = b.str(line + 1, s);
                let call = b.call_name(line + 1, "log", vec![num, text]);
                b.expr_stmt(line + 1, call)
            };
            vec![stmt1, stmt2]
        };
        let run1 = mk(&mut b, 2, 1, "a");
        let run2 = mk(&mut b, 5, 2, "b");
        let test = b.name(1, "flag");
        let tree = b.into_tree();

        let aunified = antiunify(&tree, &[run1, run2]);
        // dedup collapses the repeated (1, 2) and ("a", "b") tuples
        assert_eq!(dedup_avars(&tree, &aunified).len(), 2);

        let fixed =
            fixed_by_vars(&tree, &aunified, &[test], &CheckerConfig::default()).unwrap();
        // if-chain: 1 if + 1 else + 2 assigns per branch; core: 2 stmts
        assert_eq!(fixed.statements, 2 + 4 + 2);
    }
}
