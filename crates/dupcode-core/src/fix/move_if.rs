//! Move a conditional inside the block that contains the divergence,
//! so only the minimal differing region stays branched.

use crate::antiunify::{Aunified, SubValue};
use crate::ast::build::Builder;
use crate::ast::{NodeId, NodeKind, Tree};
use crate::config::CheckerConfig;
use crate::diagnostics::DiagnosticKind;
use crate::metrics::{statement_count_seq, token_count, token_count_seq};

use super::{build_if_chain, Fixed};

/// Child indices that belong to a statement's header (condition,
/// iterable, signature); a conditional may only be pushed into nodes
/// whose header is untouched by any variable.
fn header_children(tree: &Tree, id: NodeId) -> Vec<NodeId> {
    let children = tree.children(id);
    match tree.kind(id) {
        NodeKind::For => vec![children[0], children[1]],
        NodeKind::While => vec![children[0]],
        NodeKind::FunctionDef => vec![children[0]],
        NodeKind::ExceptHandler => vec![children[0], children[1]],
        NodeKind::With => children[..children.len() - 1].to_vec(),
        NodeKind::Try => Vec::new(),
        _ => Vec::new(),
    }
}

fn is_headerless_kind(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::For
            | NodeKind::While
            | NodeKind::FunctionDef
            | NodeKind::ExceptHandler
            | NodeKind::Try
            | NodeKind::With
    )
}

fn can_move_into(aunified: &Aunified, id: NodeId) -> bool {
    is_headerless_kind(aunified.tree.kind(id))
        && !header_children(&aunified.tree, id)
            .iter()
            .any(|&header| aunified.subtree_has_avar(header))
}

/// Applicable when the divergent region sits in a headerless
/// position; the caller additionally guards against test variables
/// being reassigned between branches.
pub fn fixed_by_moving_if(
    src: &Tree,
    aunified: &Aunified,
    tests: &[NodeId],
    config: &CheckerConfig,
) -> Option<Fixed> {
    if !config.suggest_into_block {
        return None;
    }
    if aunified.roots.len() == 1 && !can_move_into(aunified, aunified.roots[0]) {
        return None;
    }

    let mut builder = Builder::new();
    let rebuilt = rebuild_region(&mut builder, src, aunified, tests, &aunified.roots);
    let built = builder.into_tree();

    let sub_tokens: u32 = aunified
        .avars
        .iter()
        .flat_map(|avar| &avar.subs)
        .map(|sub| match sub {
            SubValue::Node(id) => token_count(src, *id),
            SubValue::Seq(ids) => token_count_seq(src, ids),
            _ => 0,
        })
        .sum();
    let tokens = token_count_seq(&built, &rebuilt) + sub_tokens;
    let statements = statement_count_seq(&built, &rebuilt, true, false);

    Some(Fixed {
        kind: DiagnosticKind::IfIntoBlock,
        tokens,
        statements,
        args: Vec::new(),
    })
}

/// Relocate the conditional to wrap only the span of statements that
/// contain variables, descending into a lone movable statement.
fn rebuild_region(
    builder: &mut Builder,
    src: &Tree,
    aunified: &Aunified,
    tests: &[NodeId],
    stmts: &[NodeId],
) -> Vec<NodeId> {
    if stmts.is_empty() {
        return Vec::new();
    }

    let touched: Vec<usize> = stmts
        .iter()
        .enumerate()
        .filter(|(_, &stmt)| aunified.subtree_has_avar(stmt))
        .map(|(i, _)| i)
        .collect();
    let (first, last) = match (touched.first(), touched.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => {
            return stmts
                .iter()
                .map(|&stmt| builder.copy_from(&aunified.tree, stmt))
                .collect();
        }
    };

    let middle = if first == last && can_move_into(aunified, stmts[first]) {
        rebuild_node(builder, src, aunified, tests, stmts[first])
    } else {
        let region = &stmts[first..=last];
        let bodies: Vec<Vec<NodeId>> = (0..=tests.len())
            .map(|_| {
                region
                    .iter()
                    .map(|&stmt| builder.copy_from(&aunified.tree, stmt))
                    .collect()
            })
            .collect();
        let test_copies = tests.iter().map(|&t| builder.copy_from(src, t)).collect();
        build_if_chain(builder, test_copies, bodies)
    };

    let mut result: Vec<NodeId> = stmts[..first]
        .iter()
        .map(|&stmt| builder.copy_from(&aunified.tree, stmt))
        .collect();
    result.push(middle);
    result.extend(
        stmts[last + 1..]
            .iter()
            .map(|&stmt| builder.copy_from(&aunified.tree, stmt)),
    );
    result
}

fn rebuild_node(
    builder: &mut Builder,
    src: &Tree,
    aunified: &Aunified,
    tests: &[NodeId],
    id: NodeId,
) -> NodeId {
    if !aunified.subtree_has_avar(id) {
        return builder.copy_from(&aunified.tree, id);
    }
    let node = aunified.tree.node(id).clone();
    let header: Vec<NodeId> = header_children(&aunified.tree, id);
    let children: Vec<NodeId> = node
        .children
        .iter()
        .map(|&child| {
            if header.contains(&child) {
                builder.copy_from(&aunified.tree, child)
            } else {
                match aunified.tree.kind(child) {
                    NodeKind::Block => {
                        let stmts = aunified.tree.block_statements(child).to_vec();
                        let rebuilt = rebuild_region(builder, src, aunified, tests, &stmts);
                        builder.block(rebuilt)
                    }
                    NodeKind::ExceptHandler => rebuild_node(builder, src, aunified, tests, child),
                    _ => builder.copy_from(&aunified.tree, child),
                }
            }
        })
        .collect();
    builder.push(node.kind, node.value, node.ops, children, node.span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::antiunify::antiunify;
    use crate::ast::build::Builder;

    /// Branch bodies that are loops differing only deep inside the
    /// loop body: the if can move into the loop.
    fn loop_bodies() -> (Tree, NodeId, NodeId, NodeId) {
        let mut b = Builder::new();
        let mk = |b: &mut Builder, line: u32, func: &str| {
            let target = b.assign_name(line, "i");
            let items = b.name(line, "items");
            let i = b.name(line + 1, "i");
            let call = b.call_name(line + 1, func, vec![i]);
            let inner = b.expr_stmt(line + 1, call);
            b.for_stmt(line, target, items, vec![inner], vec![])
        };
        let loop1 = mk(&mut b, 2, "first");
        let loop2 = mk(&mut b, 5, "second");
        let test = b.name(1, "flag");
        (b.into_tree(), loop1, loop2, test)
    }

    #[test]
    fn test_if_moves_into_loop_body() {
        let (tree, loop1, loop2, test) = loop_bodies();
        let aunified = antiunify(&tree, &[vec![loop1], vec![loop2]]);
        // the callee differs, which is a called position, but moving
        // the if is still structurally possible
        let fixed =
            fixed_by_moving_if(&tree, &aunified, &[test], &CheckerConfig::default()).unwrap();
        assert_eq!(fixed.kind, DiagnosticKind::IfIntoBlock);
        assert!(fixed.tokens > 0);
    }

    #[test]
    fn test_rejected_when_header_diverges() {
        let mut b = Builder::new();
        let mk = |b: &mut Builder, line: u32, iter_name: &str| {
            let target = b.assign_name(line, "i");
            let items = b.name(line, iter_name);
            let i = b.name(line + 1, "i");
            let call = b.call_name(line + 1, "handle", vec![i]);
            let stmt = b.expr_stmt(line + 1, call);
            b.for_stmt(line, target, items, vec![stmt], vec![])
        };
        let loop1 = mk(&mut b, 2, "xs");
        let loop2 = mk(&mut b, 5, "ys");
        let test = b.name(1, "flag");
        let tree = b.into_tree();

        let aunified = antiunify(&tree, &[vec![loop1], vec![loop2]]);
        assert!(
            fixed_by_moving_if(&tree, &aunified, &[test], &CheckerConfig::default()).is_none()
        );
    }

    #[test]
    fn test_plain_statements_get_wrapped() {
        let mut b = Builder::new();
        // shared head, one differing middle statement, shared tail
        let mk = |b: &mut Builder, line: u32, v: i64| {
            let t1 = b.assign_name(line, "a");
            let one = b.int(line, 1);
            let head = b.assign(line, vec![t1], one);
            let t2 = b.assign_name(line + 1, "c");
            let value = b.int(line + 1, v);
            let mid = b.assign(line + 1, vec![t2], value);
            let a = b.name(line + 2, "a");
            let call = b.call_name(line + 2, "emit", vec![a]);
            let tail = b.expr_stmt(line + 2, call);
            vec![head, mid, tail]
        };
        let run1 = mk(&mut b, 2, 10);
        let run2 = mk(&mut b, 6, 20);
        let test = b.name(1, "flag");
        let tree = b.into_tree();

        let aunified = antiunify(&tree, &[run1, run2]);
        let fixed =
            fixed_by_moving_if(&tree, &aunified, &[test], &CheckerConfig::default()).unwrap();
        // head + wrapped if + tail: the two shared statements appear
        // once, the differing one appears once per branch
        assert_eq!(fixed.statements, 2 + 1 + 1 + 1 + 1);
    }
}
