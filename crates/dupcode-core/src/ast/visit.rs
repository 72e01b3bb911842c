//! Visitor over tree nodes, dispatched by kind tag.
//!
//! Hooks default to [`walk`], so an implementation only overrides the
//! kinds it cares about. Expression kinds share one hook; the
//! detectors that need finer distinctions match on the kind inside it.

use super::{NodeId, NodeKind, Tree};

pub trait Visitor {
    fn visit(&mut self, tree: &Tree, id: NodeId)
    where
        Self: Sized,
    {
        dispatch(self, tree, id);
    }

    fn visit_module(&mut self, tree: &Tree, id: NodeId) {
        walk(self, tree, id);
    }

    fn visit_if(&mut self, tree: &Tree, id: NodeId) {
        walk(self, tree, id);
    }

    fn visit_while(&mut self, tree: &Tree, id: NodeId) {
        walk(self, tree, id);
    }

    fn visit_for(&mut self, tree: &Tree, id: NodeId) {
        walk(self, tree, id);
    }

    fn visit_with(&mut self, tree: &Tree, id: NodeId) {
        walk(self, tree, id);
    }

    fn visit_try(&mut self, tree: &Tree, id: NodeId) {
        walk(self, tree, id);
    }

    fn visit_function_def(&mut self, tree: &Tree, id: NodeId) {
        walk(self, tree, id);
    }

    fn visit_class_def(&mut self, tree: &Tree, id: NodeId) {
        walk(self, tree, id);
    }

    fn visit_assert(&mut self, tree: &Tree, id: NodeId) {
        walk(self, tree, id);
    }

    /// Called for every expression-level kind.
    fn visit_expression(&mut self, tree: &Tree, id: NodeId) {
        walk(self, tree, id);
    }

    fn visit_other(&mut self, tree: &Tree, id: NodeId) {
        walk(self, tree, id);
    }
}

/// Recurse into all children via the dispatcher.
pub fn walk<V: Visitor + ?Sized>(visitor: &mut V, tree: &Tree, id: NodeId) {
    for &child in tree.children(id) {
        dispatch(visitor, tree, child);
    }
}

pub fn dispatch<V: Visitor + ?Sized>(visitor: &mut V, tree: &Tree, id: NodeId) {
    match tree.kind(id) {
        NodeKind::Module => visitor.visit_module(tree, id),
        NodeKind::If => visitor.visit_if(tree, id),
        NodeKind::While => visitor.visit_while(tree, id),
        NodeKind::For => visitor.visit_for(tree, id),
        NodeKind::With => visitor.visit_with(tree, id),
        NodeKind::Try => visitor.visit_try(tree, id),
        NodeKind::FunctionDef => visitor.visit_function_def(tree, id),
        NodeKind::ClassDef => visitor.visit_class_def(tree, id),
        NodeKind::Assert => visitor.visit_assert(tree, id),
        NodeKind::Name
        | NodeKind::AssignName
        | NodeKind::Attribute
        | NodeKind::AssignAttr
        | NodeKind::Subscript
        | NodeKind::Const
        | NodeKind::BinOp
        | NodeKind::BoolOp
        | NodeKind::UnaryOp
        | NodeKind::Compare
        | NodeKind::Call
        | NodeKind::Keyword
        | NodeKind::Starred
        | NodeKind::TupleExpr
        | NodeKind::ListExpr
        | NodeKind::SetExpr
        | NodeKind::DictExpr
        | NodeKind::IfExp
        | NodeKind::Lambda
        | NodeKind::FString
        | NodeKind::ListComp
        | NodeKind::SetComp
        | NodeKind::DictComp
        | NodeKind::GeneratorExp => visitor.visit_expression(tree, id),
        _ => visitor.visit_other(tree, id),
    }
}

#[cfg(test)]
mod tests {
    use super::super::build::Builder;
    use super::*;

    struct KindCounter {
        ifs: usize,
        expressions: usize,
    }

    impl Visitor for KindCounter {
        fn visit_if(&mut self, tree: &Tree, id: NodeId) {
            self.ifs += 1;
            walk(self, tree, id);
        }

        fn visit_expression(&mut self, tree: &Tree, id: NodeId) {
            self.expressions += 1;
            walk(self, tree, id);
        }
    }

    #[test]
    fn test_dispatch_reaches_nested_nodes() {
        let mut b = Builder::new();
        let flag = b.name(1, "flag");
        let x = b.name(2, "x");
        let one = b.int(2, 1);
        let call = b.call(2, x, vec![one]);
        let stmt = b.expr_stmt(2, call);
        let inner_flag = b.name(3, "other");
        let inner_pass = b.pass(4);
        let inner_if = b.if_stmt(3, inner_flag, vec![inner_pass]);
        let outer = b.if_stmt(1, flag, vec![stmt, inner_if]);
        let (tree, module) = b.module(vec![outer]);

        let mut counter = KindCounter {
            ifs: 0,
            expressions: 0,
        };
        counter.visit(&tree, module);
        assert_eq!(counter.ifs, 2);
        // flag, x, 1, call, other
        assert_eq!(counter.expressions, 5);
    }
}
