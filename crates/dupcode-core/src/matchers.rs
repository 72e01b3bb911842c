//! Tree comparators used for duplicate-candidate filtering: exact
//! equality over canonical renderings, and logical-negation detection
//! between boolean/comparison expressions.

use crate::ast::build::Builder;
use crate::ast::render::render;
use crate::ast::{
    BinaryOp, BoolOpKind, CmpOp, NodeId, NodeKind, OpKind, Tree, UnaryOpKind, Value, ValueSlot,
};

/// Two nodes are identical iff their canonical renderings are equal.
pub fn are_identical(tree: &Tree, a: NodeId, b: NodeId) -> bool {
    render(tree, a) == render(tree, b)
}

pub fn are_identical_seqs(tree: &Tree, a: &[NodeId], b: &[NodeId]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(&x, &y)| are_identical(tree, x, y))
}

pub fn negated_cmp(op: CmpOp) -> CmpOp {
    match op {
        CmpOp::Eq => CmpOp::NotEq,
        CmpOp::NotEq => CmpOp::Eq,
        CmpOp::Lt => CmpOp::GtE,
        CmpOp::LtE => CmpOp::Gt,
        CmpOp::Gt => CmpOp::LtE,
        CmpOp::GtE => CmpOp::Lt,
        CmpOp::Is => CmpOp::IsNot,
        CmpOp::IsNot => CmpOp::Is,
        CmpOp::In => CmpOp::NotIn,
        CmpOp::NotIn => CmpOp::In,
    }
}

pub fn negated_bool(op: BoolOpKind) -> BoolOpKind {
    match op {
        BoolOpKind::And => BoolOpKind::Or,
        BoolOpKind::Or => BoolOpKind::And,
    }
}

fn strip_nots(tree: &Tree, mut id: NodeId, mut negated: bool) -> (NodeId, bool) {
    while tree.kind(id) == NodeKind::UnaryOp
        && tree.op(id) == Some(OpKind::Unary(UnaryOpKind::Not))
    {
        negated = !negated;
        id = tree.children(id)[0];
    }
    (id, negated)
}

/// Best-effort constant folding to a small integer; used by the
/// parity special case.
fn const_int(tree: &Tree, id: NodeId) -> Option<i64> {
    match tree.kind(id) {
        NodeKind::Const => match tree.value(id)?.as_value()? {
            Value::Int(n) => Some(*n),
            _ => None,
        },
        NodeKind::UnaryOp => {
            let operand = const_int(tree, tree.children(id)[0])?;
            match tree.op(id)? {
                OpKind::Unary(UnaryOpKind::Neg) => Some(-operand),
                OpKind::Unary(UnaryOpKind::Pos) => Some(operand),
                OpKind::Unary(UnaryOpKind::Invert) => Some(!operand),
                _ => None,
            }
        }
        NodeKind::BinOp => {
            let left = const_int(tree, tree.children(id)[0])?;
            let right = const_int(tree, tree.children(id)[1])?;
            match tree.op(id)? {
                OpKind::Binary(BinaryOp::Add) => left.checked_add(right),
                OpKind::Binary(BinaryOp::Sub) => left.checked_sub(right),
                OpKind::Binary(BinaryOp::Mul) => left.checked_mul(right),
                OpKind::Binary(BinaryOp::FloorDiv) if right != 0 => Some(left.div_euclid(right)),
                OpKind::Binary(BinaryOp::Mod) if right != 0 => Some(left.rem_euclid(right)),
                _ => None,
            }
        }
        _ => None,
    }
}

fn is_mod_two(tree: &Tree, id: NodeId) -> bool {
    tree.kind(id) == NodeKind::BinOp
        && tree.op(id) == Some(OpKind::Binary(BinaryOp::Mod))
        && const_int(tree, tree.children(id)[1]) == Some(2)
}

fn is_eq_mod_two(tree: &Tree, id: NodeId) -> bool {
    if tree.kind(id) != NodeKind::Compare || tree.ops(id).len() != 1 {
        return false;
    }
    let op = match tree.op(id) {
        Some(OpKind::Cmp(op)) => op,
        _ => return false,
    };
    if !matches!(op, CmpOp::Eq | CmpOp::NotEq) {
        return false;
    }
    let left = tree.children(id)[0];
    let right = tree.children(id)[1];
    is_mod_two(tree, left) != is_mod_two(tree, right)
}

fn mod_two_negation(tree: &Tree, lt: NodeId, rt: NodeId) -> bool {
    if !is_eq_mod_two(tree, lt) || !is_eq_mod_two(tree, rt) {
        return false;
    }
    let split = |id: NodeId| {
        let left = tree.children(id)[0];
        let right = tree.children(id)[1];
        if is_mod_two(tree, left) {
            (left, right)
        } else {
            (right, left)
        }
    };
    let (lt_mod, lt_val) = split(lt);
    let (rt_mod, rt_val) = split(rt);

    are_identical(tree, tree.children(lt_mod)[0], tree.children(rt_mod)[0])
        && !are_identical(tree, lt_val, rt_val)
}

fn cmp_ops(tree: &Tree, id: NodeId) -> Vec<CmpOp> {
    tree.ops(id)
        .iter()
        .filter_map(|slot| match slot.as_op() {
            Some(OpKind::Cmp(op)) => Some(op),
            _ => None,
        })
        .collect()
}

/// Whether `lt` is the logical negation of `rt`.
///
/// `negated_rt` flips the question: when set, the check becomes
/// "are these equivalent" (a negation applied on top of `rt` has
/// already been accounted for by the caller). Handles `not`-stripping
/// on both sides, comparator inversion, De Morgan expansion across
/// boolean operators, and the `x % 2 == 0` / `x % 2 != 0` parity
/// pattern.
pub fn is_negation(tree: &Tree, lt: NodeId, rt: NodeId, negated_rt: bool) -> bool {
    let (lt, negated_rt) = strip_nots(tree, lt, negated_rt);
    let (rt, negated_rt) = strip_nots(tree, rt, negated_rt);

    if tree.kind(lt) != tree.kind(rt) {
        return false;
    }

    match tree.kind(lt) {
        NodeKind::BoolOp => {
            let lt_values = tree.children(lt);
            let rt_values = tree.children(rt);
            let (lt_op, rt_op) = match (tree.op(lt), tree.op(rt)) {
                (Some(OpKind::Bool(a)), Some(OpKind::Bool(b))) => (a, b),
                _ => return false,
            };
            if lt_values.len() == rt_values.len()
                && ((negated_rt && lt_op == rt_op)
                    || (!negated_rt && negated_bool(lt_op) == rt_op))
            {
                lt_values
                    .iter()
                    .zip(rt_values)
                    .all(|(&a, &b)| is_negation(tree, a, b, negated_rt))
            } else {
                false
            }
        }
        NodeKind::Compare => {
            let lt_ops = cmp_ops(tree, lt);
            let rt_ops = cmp_ops(tree, rt);
            if lt_ops.len() != rt_ops.len() {
                return false;
            }
            let lt_values = tree.children(lt);
            let rt_values = tree.children(rt);

            let all_values_negations = |negated: bool| {
                lt_values
                    .iter()
                    .zip(rt_values)
                    .all(|(&a, &b)| is_negation(tree, a, b, negated))
            };

            if negated_rt && lt_ops == rt_ops {
                return all_values_negations(negated_rt);
            }
            if !negated_rt
                && lt_ops
                    .iter()
                    .zip(&rt_ops)
                    .all(|(&a, &b)| negated_cmp(a) == b)
            {
                return all_values_negations(!negated_rt);
            }
            if !negated_rt && mod_two_negation(tree, lt, rt) {
                return true;
            }
            false
        }
        _ => negated_rt && are_identical(tree, lt, rt),
    }
}

/// Build the negation of `test` into `builder`: invert a single
/// comparison, unwrap a `not`, or wrap everything else in one.
pub fn negate(builder: &mut Builder, src: &Tree, test: NodeId) -> NodeId {
    if src.kind(test) == NodeKind::Compare && src.ops(test).len() == 1 {
        if let Some(OpKind::Cmp(op)) = src.op(test) {
            let left = builder.copy_from(src, src.children(test)[0]);
            let right = builder.copy_from(src, src.children(test)[1]);
            let line = src.span(test).start_line;
            return builder.compare(line, left, vec![(negated_cmp(op), right)]);
        }
    }
    if src.kind(test) == NodeKind::UnaryOp
        && src.op(test) == Some(OpKind::Unary(UnaryOpKind::Not))
    {
        return builder.copy_from(src, src.children(test)[0]);
    }
    let copy = builder.copy_from(src, test);
    builder.unaryop(src.span(test).start_line, UnaryOpKind::Not, copy)
}

/// A node whose payload is the `True`/`False` literal.
pub fn is_bool_const(tree: &Tree, id: NodeId, expected: bool) -> bool {
    tree.kind(id) == NodeKind::Const
        && matches!(
            tree.value(id).and_then(ValueSlot::as_value),
            Some(Value::Bool(b)) if *b == expected
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::Builder;

    fn simple_cmp(b: &mut Builder, name: &str, op: CmpOp, value: i64) -> NodeId {
        let left = b.name(1, name);
        let right = b.int(1, value);
        b.compare(1, left, vec![(op, right)])
    }

    #[test]
    fn test_comparator_inversion() {
        let mut b = Builder::new();
        let lt = simple_cmp(&mut b, "x", CmpOp::Lt, 0);
        let ge = simple_cmp(&mut b, "x", CmpOp::GtE, 0);
        let gt = simple_cmp(&mut b, "x", CmpOp::Gt, 0);
        let tree = b.into_tree();
        assert!(is_negation(&tree, lt, ge, false));
        assert!(!is_negation(&tree, lt, gt, false));
    }

    #[test]
    fn test_not_stripping() {
        let mut b = Builder::new();
        let x = b.name(1, "x");
        let zero = b.int(1, 0);
        let cmp = b.compare(1, x, vec![(CmpOp::Eq, zero)]);
        let negated = b.unaryop(1, UnaryOpKind::Not, cmp);
        let same = simple_cmp(&mut b, "x", CmpOp::Eq, 0);
        let tree = b.into_tree();
        assert!(is_negation(&tree, negated, same, false));
        assert!(!is_negation(&tree, negated, same, true));
    }

    #[test]
    fn test_de_morgan() {
        let mut b = Builder::new();
        // a < 1 and b < 2  vs  a >= 1 or b >= 2
        let c1 = simple_cmp(&mut b, "a", CmpOp::Lt, 1);
        let c2 = simple_cmp(&mut b, "b", CmpOp::Lt, 2);
        let conj = b.boolop(1, BoolOpKind::And, vec![c1, c2]);
        let n1 = simple_cmp(&mut b, "a", CmpOp::GtE, 1);
        let n2 = simple_cmp(&mut b, "b", CmpOp::GtE, 2);
        let disj = b.boolop(1, BoolOpKind::Or, vec![n1, n2]);
        let tree = b.into_tree();
        assert!(is_negation(&tree, conj, disj, false));
    }

    #[test]
    fn test_parity_negation() {
        let mut b = Builder::new();
        let build_parity = |b: &mut Builder, op: CmpOp, rhs: i64| {
            let n = b.name(1, "n");
            let two = b.int(1, 2);
            let modulo = b.binop(1, BinaryOp::Mod, n, two);
            let value = b.int(1, rhs);
            b.compare(1, modulo, vec![(op, value)])
        };
        let even = build_parity(&mut b, CmpOp::Eq, 0);
        let odd = build_parity(&mut b, CmpOp::Eq, 1);
        let not_even = build_parity(&mut b, CmpOp::NotEq, 0);
        let tree = b.into_tree();
        assert!(is_negation(&tree, even, odd, false));
        assert!(is_negation(&tree, even, not_even, false));
        assert!(!is_negation(&tree, even, even, false));
    }

    #[test]
    fn test_negate_builder_inverts_compare() {
        let mut b = Builder::new();
        let test = simple_cmp(&mut b, "x", CmpOp::Lt, 10);
        let tree = b.into_tree();

        let mut out = Builder::new();
        let negated = negate(&mut out, &tree, test);
        let out_tree = out.into_tree();
        assert_eq!(render(&out_tree, negated), "x >= 10");
    }

    #[test]
    fn test_negate_builder_unwraps_not() {
        let mut b = Builder::new();
        let flag = b.name(1, "flag");
        let not_flag = b.unaryop(1, UnaryOpKind::Not, flag);
        let tree = b.into_tree();

        let mut out = Builder::new();
        let negated = negate(&mut out, &tree, not_flag);
        let out_tree = out.into_tree();
        assert_eq!(render(&out_tree, negated), "flag");
    }

    #[test]
    fn test_identical_sequences() {
        let mut b = Builder::new();
        let s1 = {
            let x = b.assign_name(1, "x");
            let v = b.int(1, 1);
            b.assign(1, vec![x], v)
        };
        let s2 = {
            let x = b.assign_name(5, "x");
            let v = b.int(5, 1);
            b.assign(5, vec![x], v)
        };
        let s3 = {
            let x = b.assign_name(6, "y");
            let v = b.int(6, 1);
            b.assign(6, vec![x], v)
        };
        let tree = b.into_tree();
        assert!(are_identical(&tree, s1, s2));
        assert!(!are_identical(&tree, s1, s3));
        assert!(are_identical_seqs(&tree, &[s1, s2], &[s2, s1]));
        assert!(!are_identical_seqs(&tree, &[s1], &[s3]));
    }
}
