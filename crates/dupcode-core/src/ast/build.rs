//! Construction of immutable trees.
//!
//! Parsed input trees and the synthetic trees built by the fix
//! synthesizers both go through [`Builder`]; a node is never mutated
//! after allocation. Expression constructors take the source line
//! they sit on; compound statements derive their span from the
//! header line and their children.

use crate::span::Span;
use super::{
    AvarId, BinaryOp, BoolOpKind, CmpOp, Node, NodeId, NodeKind, OpKind, OpSlot, Tree, UnaryOpKind,
    Value, ValueSlot,
};

#[derive(Debug, Default)]
pub struct Builder {
    tree: Tree,
}

impl Builder {
    pub fn new() -> Self {
        Builder { tree: Tree::new() }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }

    /// Low-level node allocation; the typed constructors below are
    /// preferred wherever they fit.
    pub fn push(
        &mut self,
        kind: NodeKind,
        value: Option<ValueSlot>,
        ops: Vec<OpSlot>,
        children: Vec<NodeId>,
        span: Span,
    ) -> NodeId {
        self.tree.alloc(Node {
            kind,
            value,
            ops,
            children,
            parent: None,
            span,
        })
    }

    fn span_over(&self, line: u32, children: &[NodeId]) -> Span {
        children
            .iter()
            .map(|&c| self.tree.span(c))
            .fold(Span::line(line), |acc, s| acc.merge(s))
    }

    fn expr(
        &mut self,
        kind: NodeKind,
        value: Option<ValueSlot>,
        ops: Vec<OpSlot>,
        children: Vec<NodeId>,
        line: u32,
    ) -> NodeId {
        let span = self.span_over(line, &children);
        self.push(kind, value, ops, children, span)
    }

    /// Deep copy of a subtree from another tree, spans preserved.
    pub fn copy_from(&mut self, src: &Tree, id: NodeId) -> NodeId {
        let node = src.node(id);
        let children = node
            .children
            .clone()
            .into_iter()
            .map(|c| self.copy_from(src, c))
            .collect();
        self.push(
            node.kind,
            node.value.clone(),
            node.ops.clone(),
            children,
            node.span,
        )
    }

    // Structural helpers

    pub fn block(&mut self, statements: Vec<NodeId>) -> NodeId {
        let span = match statements.first() {
            Some(&first) => self.span_over(self.tree.span(first).start_line, &statements),
            None => Span::default(),
        };
        self.push(NodeKind::Block, None, Vec::new(), statements, span)
    }

    pub fn empty(&mut self) -> NodeId {
        self.push(NodeKind::Empty, None, Vec::new(), Vec::new(), Span::default())
    }

    pub fn avar(&mut self, id: AvarId, span: Span) -> NodeId {
        self.push(
            NodeKind::AunifyVar,
            Some(ValueSlot::Var(id)),
            Vec::new(),
            Vec::new(),
            span,
        )
    }

    // Expressions

    pub fn name(&mut self, line: u32, name: impl Into<String>) -> NodeId {
        self.expr(
            NodeKind::Name,
            Some(ValueSlot::Value(Value::Ident(name.into()))),
            Vec::new(),
            Vec::new(),
            line,
        )
    }

    pub fn assign_name(&mut self, line: u32, name: impl Into<String>) -> NodeId {
        self.expr(
            NodeKind::AssignName,
            Some(ValueSlot::Value(Value::Ident(name.into()))),
            Vec::new(),
            Vec::new(),
            line,
        )
    }

    pub fn constant(&mut self, line: u32, value: Value) -> NodeId {
        self.expr(
            NodeKind::Const,
            Some(ValueSlot::Value(value)),
            Vec::new(),
            Vec::new(),
            line,
        )
    }

    pub fn int(&mut self, line: u32, value: i64) -> NodeId {
        self.constant(line, Value::Int(value))
    }

    pub fn float(&mut self, line: u32, value: f64) -> NodeId {
        self.constant(line, Value::Float(value))
    }

    pub fn str(&mut self, line: u32, value: impl Into<String>) -> NodeId {
        self.constant(line, Value::Str(value.into()))
    }

    pub fn bool(&mut self, line: u32, value: bool) -> NodeId {
        self.constant(line, Value::Bool(value))
    }

    pub fn none(&mut self, line: u32) -> NodeId {
        self.constant(line, Value::None)
    }

    pub fn attribute(&mut self, line: u32, object: NodeId, attr: impl Into<String>) -> NodeId {
        self.expr(
            NodeKind::Attribute,
            Some(ValueSlot::Value(Value::Ident(attr.into()))),
            Vec::new(),
            vec![object],
            line,
        )
    }

    pub fn assign_attr(&mut self, line: u32, object: NodeId, attr: impl Into<String>) -> NodeId {
        self.expr(
            NodeKind::AssignAttr,
            Some(ValueSlot::Value(Value::Ident(attr.into()))),
            Vec::new(),
            vec![object],
            line,
        )
    }

    pub fn subscript(&mut self, line: u32, object: NodeId, index: NodeId) -> NodeId {
        self.expr(NodeKind::Subscript, None, Vec::new(), vec![object, index], line)
    }

    pub fn binop(&mut self, line: u32, op: BinaryOp, left: NodeId, right: NodeId) -> NodeId {
        self.expr(
            NodeKind::BinOp,
            None,
            vec![OpSlot::Op(OpKind::Binary(op))],
            vec![left, right],
            line,
        )
    }

    pub fn boolop(&mut self, line: u32, op: BoolOpKind, operands: Vec<NodeId>) -> NodeId {
        self.expr(
            NodeKind::BoolOp,
            None,
            vec![OpSlot::Op(OpKind::Bool(op))],
            operands,
            line,
        )
    }

    pub fn unaryop(&mut self, line: u32, op: UnaryOpKind, operand: NodeId) -> NodeId {
        self.expr(
            NodeKind::UnaryOp,
            None,
            vec![OpSlot::Op(OpKind::Unary(op))],
            vec![operand],
            line,
        )
    }

    pub fn compare(&mut self, line: u32, left: NodeId, ops: Vec<(CmpOp, NodeId)>) -> NodeId {
        let mut children = vec![left];
        let mut slots = Vec::new();
        for (op, operand) in ops {
            slots.push(OpSlot::Op(OpKind::Cmp(op)));
            children.push(operand);
        }
        self.expr(NodeKind::Compare, None, slots, children, line)
    }

    pub fn call(&mut self, line: u32, func: NodeId, args: Vec<NodeId>) -> NodeId {
        let mut children = vec![func];
        children.extend(args);
        self.expr(NodeKind::Call, None, Vec::new(), children, line)
    }

    pub fn call_name(&mut self, line: u32, func: impl Into<String>, args: Vec<NodeId>) -> NodeId {
        let func = self.name(line, func);
        self.call(line, func, args)
    }

    pub fn keyword(&mut self, line: u32, name: impl Into<String>, value: NodeId) -> NodeId {
        self.expr(
            NodeKind::Keyword,
            Some(ValueSlot::Value(Value::Ident(name.into()))),
            Vec::new(),
            vec![value],
            line,
        )
    }

    pub fn starred(&mut self, line: u32, value: NodeId) -> NodeId {
        self.expr(NodeKind::Starred, None, Vec::new(), vec![value], line)
    }

    pub fn tuple_expr(&mut self, line: u32, elements: Vec<NodeId>) -> NodeId {
        self.expr(NodeKind::TupleExpr, None, Vec::new(), elements, line)
    }

    pub fn list_expr(&mut self, line: u32, elements: Vec<NodeId>) -> NodeId {
        self.expr(NodeKind::ListExpr, None, Vec::new(), elements, line)
    }

    pub fn set_expr(&mut self, line: u32, elements: Vec<NodeId>) -> NodeId {
        self.expr(NodeKind::SetExpr, None, Vec::new(), elements, line)
    }

    pub fn dict_expr(&mut self, line: u32, pairs: Vec<(NodeId, NodeId)>) -> NodeId {
        let mut children = Vec::with_capacity(pairs.len() * 2);
        for (key, value) in pairs {
            children.push(key);
            children.push(value);
        }
        self.expr(NodeKind::DictExpr, None, Vec::new(), children, line)
    }

    pub fn if_exp(&mut self, line: u32, test: NodeId, body: NodeId, orelse: NodeId) -> NodeId {
        self.expr(NodeKind::IfExp, None, Vec::new(), vec![test, body, orelse], line)
    }

    pub fn lambda(&mut self, line: u32, params: Vec<&str>, body: NodeId) -> NodeId {
        let params = self.parameters(line, params);
        self.expr(NodeKind::Lambda, None, Vec::new(), vec![params, body], line)
    }

    pub fn fstring(&mut self, line: u32, parts: Vec<NodeId>) -> NodeId {
        self.expr(NodeKind::FString, None, Vec::new(), parts, line)
    }

    pub fn comprehension(
        &mut self,
        line: u32,
        target: NodeId,
        iter: NodeId,
        conditions: Vec<NodeId>,
    ) -> NodeId {
        let mut children = vec![target, iter];
        children.extend(conditions);
        self.expr(NodeKind::Comprehension, None, Vec::new(), children, line)
    }

    pub fn list_comp(&mut self, line: u32, element: NodeId, generators: Vec<NodeId>) -> NodeId {
        let mut children = vec![element];
        children.extend(generators);
        self.expr(NodeKind::ListComp, None, Vec::new(), children, line)
    }

    pub fn parameters(&mut self, line: u32, names: Vec<&str>) -> NodeId {
        let params = names
            .into_iter()
            .map(|n| self.assign_name(line, n))
            .collect();
        self.expr(NodeKind::Parameters, None, Vec::new(), params, line)
    }

    // Statements

    pub fn pass(&mut self, line: u32) -> NodeId {
        self.expr(NodeKind::Pass, None, Vec::new(), Vec::new(), line)
    }

    pub fn break_stmt(&mut self, line: u32) -> NodeId {
        self.expr(NodeKind::Break, None, Vec::new(), Vec::new(), line)
    }

    pub fn continue_stmt(&mut self, line: u32) -> NodeId {
        self.expr(NodeKind::Continue, None, Vec::new(), Vec::new(), line)
    }

    pub fn ret(&mut self, line: u32, value: Option<NodeId>) -> NodeId {
        let children = value.into_iter().collect();
        self.expr(NodeKind::Return, None, Vec::new(), children, line)
    }

    pub fn assert_stmt(&mut self, line: u32, test: NodeId) -> NodeId {
        self.expr(NodeKind::Assert, None, Vec::new(), vec![test], line)
    }

    pub fn import(&mut self, line: u32, module: impl Into<String>) -> NodeId {
        self.expr(
            NodeKind::Import,
            Some(ValueSlot::Value(Value::Ident(module.into()))),
            Vec::new(),
            Vec::new(),
            line,
        )
    }

    pub fn import_from(&mut self, line: u32, module: impl Into<String>) -> NodeId {
        self.expr(
            NodeKind::ImportFrom,
            Some(ValueSlot::Value(Value::Ident(module.into()))),
            Vec::new(),
            Vec::new(),
            line,
        )
    }

    pub fn assign(&mut self, line: u32, targets: Vec<NodeId>, value: NodeId) -> NodeId {
        let mut children = targets;
        children.push(value);
        self.expr(NodeKind::Assign, None, Vec::new(), children, line)
    }

    pub fn aug_assign(&mut self, line: u32, op: BinaryOp, target: NodeId, value: NodeId) -> NodeId {
        self.expr(
            NodeKind::AugAssign,
            None,
            vec![OpSlot::Op(OpKind::Binary(op))],
            vec![target, value],
            line,
        )
    }

    pub fn ann_assign(
        &mut self,
        line: u32,
        target: NodeId,
        annotation: NodeId,
        value: Option<NodeId>,
    ) -> NodeId {
        let value = match value {
            Some(v) => v,
            None => self.empty(),
        };
        self.expr(
            NodeKind::AnnAssign,
            None,
            Vec::new(),
            vec![target, annotation, value],
            line,
        )
    }

    pub fn expr_stmt(&mut self, line: u32, expr: NodeId) -> NodeId {
        self.expr(NodeKind::ExprStmt, None, Vec::new(), vec![expr], line)
    }

    /// If with neither elif nor else.
    pub fn if_stmt(&mut self, line: u32, test: NodeId, body: Vec<NodeId>) -> NodeId {
        let orelse = self.empty();
        self.if_full(line, test, body, orelse)
    }

    /// If with a plain else block.
    pub fn if_else(
        &mut self,
        line: u32,
        test: NodeId,
        body: Vec<NodeId>,
        orelse: Vec<NodeId>,
    ) -> NodeId {
        let orelse = self.block(orelse);
        self.if_full(line, test, body, orelse)
    }

    /// If with an explicit else-slot: an `If` (elif), a `Block`
    /// (else) or `Empty`.
    pub fn if_full(&mut self, line: u32, test: NodeId, body: Vec<NodeId>, orelse: NodeId) -> NodeId {
        let body = self.block(body);
        self.expr(NodeKind::If, None, Vec::new(), vec![test, body, orelse], line)
    }

    pub fn while_stmt(
        &mut self,
        line: u32,
        test: NodeId,
        body: Vec<NodeId>,
        orelse: Vec<NodeId>,
    ) -> NodeId {
        let body = self.block(body);
        let orelse = self.block(orelse);
        self.expr(NodeKind::While, None, Vec::new(), vec![test, body, orelse], line)
    }

    pub fn for_stmt(
        &mut self,
        line: u32,
        target: NodeId,
        iter: NodeId,
        body: Vec<NodeId>,
        orelse: Vec<NodeId>,
    ) -> NodeId {
        let body = self.block(body);
        let orelse = self.block(orelse);
        self.expr(
            NodeKind::For,
            None,
            Vec::new(),
            vec![target, iter, body, orelse],
            line,
        )
    }

    pub fn with_item(&mut self, line: u32, context: NodeId, vars: Option<NodeId>) -> NodeId {
        let vars = match vars {
            Some(v) => v,
            None => self.empty(),
        };
        self.expr(NodeKind::WithItem, None, Vec::new(), vec![context, vars], line)
    }

    pub fn with_stmt(&mut self, line: u32, items: Vec<NodeId>, body: Vec<NodeId>) -> NodeId {
        let mut children = items;
        children.push(self.block(body));
        self.expr(NodeKind::With, None, Vec::new(), children, line)
    }

    pub fn except_handler(
        &mut self,
        line: u32,
        exc_type: Option<NodeId>,
        name: Option<&str>,
        body: Vec<NodeId>,
    ) -> NodeId {
        let exc_type = match exc_type {
            Some(t) => t,
            None => self.empty(),
        };
        let name = match name {
            Some(n) => self.assign_name(line, n),
            None => self.empty(),
        };
        let body = self.block(body);
        self.expr(
            NodeKind::ExceptHandler,
            None,
            Vec::new(),
            vec![exc_type, name, body],
            line,
        )
    }

    pub fn try_stmt(
        &mut self,
        line: u32,
        body: Vec<NodeId>,
        handlers: Vec<NodeId>,
        orelse: Vec<NodeId>,
        finalbody: Vec<NodeId>,
    ) -> NodeId {
        let mut children = vec![self.block(body)];
        children.extend(handlers);
        children.push(self.block(orelse));
        children.push(self.block(finalbody));
        self.expr(NodeKind::Try, None, Vec::new(), children, line)
    }

    pub fn func_def(
        &mut self,
        line: u32,
        name: impl Into<String>,
        params: Vec<&str>,
        body: Vec<NodeId>,
    ) -> NodeId {
        let params = self.parameters(line, params);
        let body = self.block(body);
        self.expr(
            NodeKind::FunctionDef,
            Some(ValueSlot::Value(Value::Ident(name.into()))),
            Vec::new(),
            vec![params, body],
            line,
        )
    }

    pub fn class_def(&mut self, line: u32, name: impl Into<String>, body: Vec<NodeId>) -> NodeId {
        let body = self.block(body);
        self.expr(
            NodeKind::ClassDef,
            Some(ValueSlot::Value(Value::Ident(name.into()))),
            Vec::new(),
            vec![body],
            line,
        )
    }

    /// Finish the tree with a module root.
    pub fn module(mut self, statements: Vec<NodeId>) -> (Tree, NodeId) {
        let span = self.span_over(1, &statements);
        let module = self.push(NodeKind::Module, None, Vec::new(), statements, span);
        (self.tree, module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_enclose_children() {
        let mut b = Builder::new();
        let test = b.name(1, "flag");
        let v = b.int(2, 1);
        let target = b.assign_name(2, "x");
        let body_stmt = b.assign(2, vec![target], v);
        let stmt = b.if_stmt(1, test, vec![body_stmt]);
        let (tree, module) = b.module(vec![stmt]);

        assert!(tree.span(stmt).contains(tree.span(body_stmt)));
        assert!(tree.span(module).contains(tree.span(stmt)));
        assert_eq!(tree.span(stmt).start_line, 1);
        assert_eq!(tree.span(stmt).end_line, 2);
    }

    #[test]
    fn test_copy_from_preserves_structure() {
        let mut b = Builder::new();
        let left = b.name(1, "a");
        let right = b.int(1, 2);
        let sum = b.binop(1, BinaryOp::Add, left, right);
        let (src, _) = b.module(vec![]);

        let mut other = Builder::new();
        let copy = other.copy_from(&src, sum);
        let dst = other.into_tree();
        assert_eq!(dst.kind(copy), NodeKind::BinOp);
        assert_eq!(dst.op(copy), Some(OpKind::Binary(BinaryOp::Add)));
        assert_eq!(dst.children(copy).len(), 2);
        assert_eq!(dst.ident(dst.children(copy)[0]), Some("a"));
    }
}
