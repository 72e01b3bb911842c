//! Uniform labeled ordered tree over the statement and expression
//! forms the duplication detectors consume.
//!
//! Nodes carry a closed kind tag, optional scalar payload (literal
//! value or identifier), operator payload slots, ordered children and
//! a source span. Child layouts are fixed per kind:
//!
//! ```text
//! Module        [stmt..]
//! FunctionDef   name payload, [Parameters, Block]
//! ClassDef      name payload, [Block]
//! If            [test, Block, orelse]     orelse: If (elif) | Block (else) | Empty
//! While         [test, Block, Block]      body, else
//! For           [target, iter, Block, Block]
//! With          [WithItem.., Block]
//! WithItem      [context, vars | Empty]
//! Try           [Block, ExceptHandler.., Block, Block]   body, handlers, else, finally
//! ExceptHandler [type | Empty, AssignName | Empty, Block]
//! Return        [expr..]                  zero or one value
//! Assert        [test] or [test, msg]
//! Assign        [target.., value]         value last
//! AugAssign     op payload, [target, value]
//! AnnAssign     [target, annotation, value | Empty]
//! ExprStmt      [expr]
//! Attribute     attr payload, [object]    likewise AssignAttr
//! Subscript     [object, index]
//! BinOp/UnaryOp op payload, operands as children
//! BoolOp        op payload, [operand..]
//! Compare       op payloads (one per comparison), [left, operand..]
//! Call          [callee, arg.., Keyword..]
//! Keyword       name payload, [value]
//! DictExpr      [key, value, key, value, ..]
//! IfExp         [test, body, orelse]
//! Lambda        [Parameters, body]
//! ListComp etc. [elt.., Comprehension..]
//! Comprehension [target, iter, cond..]
//! ```
//!
//! `Block` groups statement sequences so every position keeps fixed
//! arity; `Empty` fills absent optional slots; `AunifyVar` appears
//! only in generalized cores produced by antiunification.

pub mod build;
pub mod render;
pub mod visit;

use id_arena::{Arena, Id};

use crate::span::Span;

pub type NodeId = Id<Node>;

/// Index into the antiunification variable table of an [`crate::antiunify::Aunified`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AvarId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Module,
    FunctionDef,
    ClassDef,
    If,
    While,
    For,
    With,
    WithItem,
    Try,
    ExceptHandler,
    Return,
    Break,
    Continue,
    Pass,
    Assert,
    Import,
    ImportFrom,
    Assign,
    AugAssign,
    AnnAssign,
    ExprStmt,
    Name,
    AssignName,
    Attribute,
    AssignAttr,
    Subscript,
    Const,
    BinOp,
    BoolOp,
    UnaryOp,
    Compare,
    Call,
    Keyword,
    Starred,
    TupleExpr,
    ListExpr,
    SetExpr,
    DictExpr,
    IfExp,
    Lambda,
    Parameters,
    FString,
    ListComp,
    SetComp,
    DictComp,
    GeneratorExp,
    Comprehension,
    Block,
    Empty,
    AunifyVar,
}

impl NodeKind {
    /// Statement-level node kinds (as opposed to expressions and
    /// structural helpers).
    pub fn is_statement(self) -> bool {
        matches!(
            self,
            NodeKind::FunctionDef
                | NodeKind::ClassDef
                | NodeKind::If
                | NodeKind::While
                | NodeKind::For
                | NodeKind::With
                | NodeKind::Try
                | NodeKind::Return
                | NodeKind::Break
                | NodeKind::Continue
                | NodeKind::Pass
                | NodeKind::Assert
                | NodeKind::Import
                | NodeKind::ImportFrom
                | NodeKind::Assign
                | NodeKind::AugAssign
                | NodeKind::AnnAssign
                | NodeKind::ExprStmt
        )
    }

    /// Kinds that bind a target (assignments, loops, comprehensions).
    pub fn is_assign_like(self) -> bool {
        matches!(
            self,
            NodeKind::Assign
                | NodeKind::AugAssign
                | NodeKind::AnnAssign
                | NodeKind::For
                | NodeKind::Comprehension
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    MatMul,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::MatMul => "@",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOpKind {
    Not,
    Neg,
    Pos,
    Invert,
}

impl UnaryOpKind {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOpKind::Not => "not",
            UnaryOpKind::Neg => "-",
            UnaryOpKind::Pos => "+",
            UnaryOpKind::Invert => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOpKind {
    And,
    Or,
}

impl BoolOpKind {
    pub fn symbol(self) -> &'static str {
        match self {
            BoolOpKind::And => "and",
            BoolOpKind::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
            CmpOp::Is => "is",
            CmpOp::IsNot => "is not",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
        }
    }
}

/// Unified operator payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Binary(BinaryOp),
    Unary(UnaryOpKind),
    Bool(BoolOpKind),
    Cmp(CmpOp),
}

impl OpKind {
    pub fn symbol(self) -> &'static str {
        match self {
            OpKind::Binary(op) => op.symbol(),
            OpKind::Unary(op) => op.symbol(),
            OpKind::Bool(op) => op.symbol(),
            OpKind::Cmp(op) => op.symbol(),
        }
    }
}

/// Scalar payload: literal value or identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
    Ident(String),
}

impl Value {
    pub fn ident(name: impl Into<String>) -> Self {
        Value::Ident(name.into())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Value::Ident(name) => Some(name),
            _ => None,
        }
    }
}

/// Scalar payload slot: concrete in parsed trees, possibly a variable
/// in generalized cores.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSlot {
    Value(Value),
    Var(AvarId),
}

impl ValueSlot {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ValueSlot::Value(value) => Some(value),
            ValueSlot::Var(_) => None,
        }
    }

    pub fn as_var(&self) -> Option<AvarId> {
        match self {
            ValueSlot::Var(id) => Some(*id),
            ValueSlot::Value(_) => None,
        }
    }
}

/// Operator payload slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpSlot {
    Op(OpKind),
    Var(AvarId),
}

impl OpSlot {
    pub fn as_op(&self) -> Option<OpKind> {
        match self {
            OpSlot::Op(op) => Some(*op),
            OpSlot::Var(_) => None,
        }
    }

    pub fn as_var(&self) -> Option<AvarId> {
        match self {
            OpSlot::Var(id) => Some(*id),
            OpSlot::Op(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub value: Option<ValueSlot>,
    pub ops: Vec<OpSlot>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub span: Span,
}

/// Arena-backed node store. Trees are immutable once built; use
/// [`build::Builder`] to construct one.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    arena: Arena<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Tree::default()
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        let children = node.children.clone();
        let id = self.arena.alloc(node);
        for child in children {
            self.arena[child].parent = Some(id);
        }
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.arena[id]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.arena[id].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.arena[id].span
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.arena[id].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent
    }

    pub fn value(&self, id: NodeId) -> Option<&ValueSlot> {
        self.arena[id].value.as_ref()
    }

    pub fn ops(&self, id: NodeId) -> &[OpSlot] {
        &self.arena[id].ops
    }

    /// Concrete identifier payload, if any.
    pub fn ident(&self, id: NodeId) -> Option<&str> {
        self.value(id)?.as_value()?.as_ident()
    }

    /// Concrete single operator payload, if any.
    pub fn op(&self, id: NodeId) -> Option<OpKind> {
        self.ops(id).first()?.as_op()
    }

    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            current: self.parent(id),
        }
    }

    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    fn sibling_at_offset(&self, id: NodeId, offset: isize) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&s| s == id)?;
        let target = pos as isize + offset;
        if target < 0 {
            return None;
        }
        siblings.get(target as usize).copied()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.sibling_at_offset(id, 1)
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.sibling_at_offset(id, -1)
    }

    /// Statements of a `Block` node (empty slice for `Empty`).
    pub fn block_statements(&self, id: NodeId) -> &[NodeId] {
        match self.kind(id) {
            NodeKind::Block => self.children(id),
            _ => &[],
        }
    }

    // If-statement accessors; callers must pass an `If` node.

    pub fn if_test(&self, id: NodeId) -> NodeId {
        debug_assert_eq!(self.kind(id), NodeKind::If);
        self.children(id)[0]
    }

    pub fn if_body(&self, id: NodeId) -> &[NodeId] {
        debug_assert_eq!(self.kind(id), NodeKind::If);
        self.block_statements(self.children(id)[1])
    }

    pub fn if_orelse(&self, id: NodeId) -> NodeId {
        debug_assert_eq!(self.kind(id), NodeKind::If);
        self.children(id)[2]
    }

    /// The if's else-slot holds an elif chain.
    pub fn has_elif_block(&self, id: NodeId) -> bool {
        self.kind(self.if_orelse(id)) == NodeKind::If
    }

    /// True when the node carries a plain (non-elif) else clause.
    pub fn has_else_block(&self, id: NodeId) -> bool {
        match self.kind(id) {
            NodeKind::If => {
                let orelse = self.if_orelse(id);
                self.kind(orelse) == NodeKind::Block && !self.children(orelse).is_empty()
            }
            NodeKind::While => !self.children(self.children(id)[2]).is_empty(),
            NodeKind::For => !self.children(self.children(id)[3]).is_empty(),
            NodeKind::IfExp => true,
            _ => false,
        }
    }

    /// Whether `id` is the elif branch of its parent if.
    pub fn is_parents_elif(&self, id: NodeId) -> bool {
        match self.parent(id) {
            Some(parent) => {
                self.kind(parent) == NodeKind::If
                    && self.kind(id) == NodeKind::If
                    && self.if_orelse(parent) == id
            }
            None => false,
        }
    }

    /// The `if __name__ == "__main__":` script entry-point guard.
    pub fn is_main_block(&self, id: NodeId) -> bool {
        if self.kind(id) != NodeKind::If {
            return false;
        }
        let test = self.if_test(id);
        if self.kind(test) != NodeKind::Compare || self.ops(test).len() != 1 {
            return false;
        }
        if self.ops(test)[0].as_op() != Some(OpKind::Cmp(CmpOp::Eq)) {
            return false;
        }
        let operands = self.children(test);
        if operands.len() != 2 {
            return false;
        }
        let left_is_name = self.kind(operands[0]) == NodeKind::Name
            && self.ident(operands[0]) == Some("__name__");
        let right_is_main = self.kind(operands[1]) == NodeKind::Const
            && matches!(
                self.value(operands[1]).and_then(ValueSlot::as_value),
                Some(Value::Str(s)) if s == "__main__"
            );
        left_is_name && right_is_main
    }

    /// A bare string expression statement (docstring-style comment).
    pub fn is_block_comment(&self, id: NodeId) -> bool {
        if self.kind(id) != NodeKind::ExprStmt {
            return false;
        }
        let inner = self.children(id)[0];
        self.kind(inner) == NodeKind::Const
            && matches!(
                self.value(inner).and_then(ValueSlot::as_value),
                Some(Value::Str(_))
            )
    }
}

pub struct Ancestors<'a> {
    tree: &'a Tree,
    current: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.current?;
        self.current = self.tree.parent(id);
        Some(id)
    }
}
