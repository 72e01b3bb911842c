//! Canonical textual rendering of tree nodes.
//!
//! The exact-equality matcher compares renderings, so this module
//! defines what "identical code" means: rendering is deterministic,
//! position-insensitive and normalizes formatting (one statement per
//! line, four-space indentation, minimal parentheses).

use super::{NodeId, NodeKind, OpSlot, Tree, Value, ValueSlot};

/// Render a single node.
pub fn render(tree: &Tree, id: NodeId) -> String {
    let mut r = Renderer::new(tree);
    r.node(id, 0);
    r.out
}

/// Render a statement sequence, one statement per line.
pub fn render_seq(tree: &Tree, ids: &[NodeId]) -> String {
    let mut r = Renderer::new(tree);
    for (i, &id) in ids.iter().enumerate() {
        if i > 0 {
            r.out.push('\n');
        }
        r.node(id, 0);
    }
    r.out
}

pub fn render_value(value: &Value) -> String {
    match value {
        Value::Int(n) => n.to_string(),
        Value::Float(x) => format!("{:?}", x),
        Value::Str(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::None => "None".to_string(),
        Value::Ident(name) => name.clone(),
    }
}

struct Renderer<'t> {
    tree: &'t Tree,
    out: String,
}

impl<'t> Renderer<'t> {
    fn new(tree: &'t Tree) -> Self {
        Renderer {
            tree,
            out: String::new(),
        }
    }

    fn indent(&mut self, level: usize) {
        for _ in 0..level {
            self.out.push_str("    ");
        }
    }

    fn value_slot(&mut self, slot: &ValueSlot) {
        match slot {
            ValueSlot::Value(value) => self.out.push_str(&render_value(value)),
            ValueSlot::Var(id) => self.out.push_str(&format!("sub_{}", id.0)),
        }
    }

    fn op_slot(&mut self, slot: &OpSlot) {
        match slot {
            OpSlot::Op(op) => self.out.push_str(op.symbol()),
            OpSlot::Var(id) => self.out.push_str(&format!("sub_{}", id.0)),
        }
    }

    fn payload(&mut self, id: NodeId) {
        let slot = self.tree.value(id).cloned();
        match slot {
            Some(slot) => self.value_slot(&slot),
            None => {}
        }
    }

    /// Expressions that read ambiguously without parentheses when
    /// nested inside another operator.
    fn needs_parens(&self, id: NodeId) -> bool {
        matches!(
            self.tree.kind(id),
            NodeKind::BinOp
                | NodeKind::BoolOp
                | NodeKind::Compare
                | NodeKind::IfExp
                | NodeKind::Lambda
        )
    }

    fn operand(&mut self, id: NodeId) {
        if self.needs_parens(id) {
            self.out.push('(');
            self.node(id, 0);
            self.out.push(')');
        } else {
            self.node(id, 0);
        }
    }

    fn comma_separated(&mut self, ids: &[NodeId]) {
        for (i, &id) in ids.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.node(id, 0);
        }
    }

    fn body(&mut self, block: NodeId, level: usize) {
        let stmts = self.tree.block_statements(block).to_vec();
        if stmts.is_empty() {
            self.indent(level + 1);
            self.out.push_str("pass");
            return;
        }
        for (i, stmt) in stmts.iter().enumerate() {
            if i > 0 {
                self.out.push('\n');
            }
            self.indent(level + 1);
            self.node(*stmt, level + 1);
        }
    }

    fn if_chain(&mut self, id: NodeId, keyword: &str, level: usize) {
        self.out.push_str(keyword);
        self.out.push(' ');
        self.node(self.tree.if_test(id), 0);
        self.out.push_str(":\n");
        self.body(self.tree.children(id)[1], level);
        let orelse = self.tree.if_orelse(id);
        match self.tree.kind(orelse) {
            NodeKind::If => {
                self.out.push('\n');
                self.indent(level);
                self.if_chain(orelse, "elif", level);
            }
            NodeKind::Block if !self.tree.children(orelse).is_empty() => {
                self.out.push('\n');
                self.indent(level);
                self.out.push_str("else:\n");
                self.body(orelse, level);
            }
            _ => {}
        }
    }

    fn node(&mut self, id: NodeId, level: usize) {
        let children = self.tree.children(id).to_vec();
        match self.tree.kind(id) {
            NodeKind::Module | NodeKind::Block => {
                for (i, stmt) in children.iter().enumerate() {
                    if i > 0 {
                        self.out.push('\n');
                    }
                    self.indent(level);
                    self.node(*stmt, level);
                }
            }
            NodeKind::Empty => {}
            NodeKind::AunifyVar => self.payload(id),
            NodeKind::FunctionDef => {
                self.out.push_str("def ");
                self.payload(id);
                self.out.push('(');
                self.node(children[0], 0);
                self.out.push_str("):\n");
                self.body(children[1], level);
            }
            NodeKind::ClassDef => {
                self.out.push_str("class ");
                self.payload(id);
                self.out.push_str(":\n");
                self.body(children[0], level);
            }
            NodeKind::If => self.if_chain(id, "if", level),
            NodeKind::While => {
                self.out.push_str("while ");
                self.node(children[0], 0);
                self.out.push_str(":\n");
                self.body(children[1], level);
                if !self.tree.children(children[2]).is_empty() {
                    self.out.push('\n');
                    self.indent(level);
                    self.out.push_str("else:\n");
                    self.body(children[2], level);
                }
            }
            NodeKind::For => {
                self.out.push_str("for ");
                self.node(children[0], 0);
                self.out.push_str(" in ");
                self.node(children[1], 0);
                self.out.push_str(":\n");
                self.body(children[2], level);
                if !self.tree.children(children[3]).is_empty() {
                    self.out.push('\n');
                    self.indent(level);
                    self.out.push_str("else:\n");
                    self.body(children[3], level);
                }
            }
            NodeKind::With => {
                self.out.push_str("with ");
                let items = &children[..children.len() - 1];
                self.comma_separated(items);
                self.out.push_str(":\n");
                self.body(children[children.len() - 1], level);
            }
            NodeKind::WithItem => {
                self.node(children[0], 0);
                if self.tree.kind(children[1]) != NodeKind::Empty {
                    self.out.push_str(" as ");
                    self.node(children[1], 0);
                }
            }
            NodeKind::Try => {
                self.out.push_str("try:\n");
                self.body(children[0], level);
                for &handler in &children[1..children.len() - 2] {
                    self.out.push('\n');
                    self.indent(level);
                    self.node(handler, level);
                }
                let orelse = children[children.len() - 2];
                if !self.tree.children(orelse).is_empty() {
                    self.out.push('\n');
                    self.indent(level);
                    self.out.push_str("else:\n");
                    self.body(orelse, level);
                }
                let finalbody = children[children.len() - 1];
                if !self.tree.children(finalbody).is_empty() {
                    self.out.push('\n');
                    self.indent(level);
                    self.out.push_str("finally:\n");
                    self.body(finalbody, level);
                }
            }
            NodeKind::ExceptHandler => {
                self.out.push_str("except");
                if self.tree.kind(children[0]) != NodeKind::Empty {
                    self.out.push(' ');
                    self.node(children[0], 0);
                }
                if self.tree.kind(children[1]) != NodeKind::Empty {
                    self.out.push_str(" as ");
                    self.node(children[1], 0);
                }
                self.out.push_str(":\n");
                self.body(children[2], level);
            }
            NodeKind::Return => {
                self.out.push_str("return");
                if !children.is_empty() {
                    self.out.push(' ');
                    self.comma_separated(&children);
                }
            }
            NodeKind::Break => self.out.push_str("break"),
            NodeKind::Continue => self.out.push_str("continue"),
            NodeKind::Pass => self.out.push_str("pass"),
            NodeKind::Assert => {
                self.out.push_str("assert ");
                self.comma_separated(&children);
            }
            NodeKind::Import => {
                self.out.push_str("import ");
                self.payload(id);
            }
            NodeKind::ImportFrom => {
                self.out.push_str("from ");
                self.payload(id);
            }
            NodeKind::Assign => {
                for &target in &children[..children.len() - 1] {
                    self.node(target, 0);
                    self.out.push_str(" = ");
                }
                self.node(children[children.len() - 1], 0);
            }
            NodeKind::AugAssign => {
                self.node(children[0], 0);
                self.out.push(' ');
                let slot = self.tree.ops(id)[0];
                self.op_slot(&slot);
                self.out.push_str("= ");
                self.node(children[1], 0);
            }
            NodeKind::AnnAssign => {
                self.node(children[0], 0);
                self.out.push_str(": ");
                self.node(children[1], 0);
                if self.tree.kind(children[2]) != NodeKind::Empty {
                    self.out.push_str(" = ");
                    self.node(children[2], 0);
                }
            }
            NodeKind::ExprStmt => self.node(children[0], 0),
            NodeKind::Name | NodeKind::AssignName => self.payload(id),
            NodeKind::Attribute | NodeKind::AssignAttr => {
                self.operand(children[0]);
                self.out.push('.');
                self.payload(id);
            }
            NodeKind::Subscript => {
                self.operand(children[0]);
                self.out.push('[');
                self.node(children[1], 0);
                self.out.push(']');
            }
            NodeKind::Const => self.payload(id),
            NodeKind::BinOp => {
                self.operand(children[0]);
                self.out.push(' ');
                let slot = self.tree.ops(id)[0];
                self.op_slot(&slot);
                self.out.push(' ');
                self.operand(children[1]);
            }
            NodeKind::BoolOp => {
                let slot = self.tree.ops(id)[0];
                for (i, &operand) in children.iter().enumerate() {
                    if i > 0 {
                        self.out.push(' ');
                        self.op_slot(&slot);
                        self.out.push(' ');
                    }
                    self.operand(operand);
                }
            }
            NodeKind::UnaryOp => {
                let slot = self.tree.ops(id)[0];
                self.op_slot(&slot);
                if matches!(slot, OpSlot::Op(op) if op.symbol() == "not") {
                    self.out.push(' ');
                }
                self.operand(children[0]);
            }
            NodeKind::Compare => {
                self.operand(children[0]);
                let slots = self.tree.ops(id).to_vec();
                for (slot, &operand) in slots.iter().zip(&children[1..]) {
                    self.out.push(' ');
                    self.op_slot(slot);
                    self.out.push(' ');
                    self.operand(operand);
                }
            }
            NodeKind::Call => {
                self.operand(children[0]);
                self.out.push('(');
                self.comma_separated(&children[1..]);
                self.out.push(')');
            }
            NodeKind::Keyword => {
                self.payload(id);
                self.out.push('=');
                self.node(children[0], 0);
            }
            NodeKind::Starred => {
                self.out.push('*');
                self.node(children[0], 0);
            }
            NodeKind::TupleExpr => {
                self.out.push('(');
                self.comma_separated(&children);
                if children.len() == 1 {
                    self.out.push(',');
                }
                self.out.push(')');
            }
            NodeKind::ListExpr => {
                self.out.push('[');
                self.comma_separated(&children);
                self.out.push(']');
            }
            NodeKind::SetExpr => {
                self.out.push('{');
                self.comma_separated(&children);
                self.out.push('}');
            }
            NodeKind::DictExpr => {
                self.out.push('{');
                for (i, pair) in children.chunks(2).enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.node(pair[0], 0);
                    self.out.push_str(": ");
                    self.node(pair[1], 0);
                }
                self.out.push('}');
            }
            NodeKind::IfExp => {
                self.operand(children[1]);
                self.out.push_str(" if ");
                self.operand(children[0]);
                self.out.push_str(" else ");
                self.operand(children[2]);
            }
            NodeKind::Lambda => {
                self.out.push_str("lambda ");
                self.node(children[0], 0);
                self.out.push_str(": ");
                self.node(children[1], 0);
            }
            NodeKind::Parameters => self.comma_separated(&children),
            NodeKind::FString => {
                self.out.push_str("f\"");
                for &part in &children {
                    if self.tree.kind(part) == NodeKind::Const {
                        if let Some(ValueSlot::Value(Value::Str(s))) = self.tree.value(part) {
                            self.out.push_str(&s.clone());
                            continue;
                        }
                    }
                    self.out.push('{');
                    self.node(part, 0);
                    self.out.push('}');
                }
                self.out.push('"');
            }
            NodeKind::ListComp => {
                self.out.push('[');
                self.comp_body(&children, 1);
                self.out.push(']');
            }
            NodeKind::SetComp => {
                self.out.push('{');
                self.comp_body(&children, 1);
                self.out.push('}');
            }
            NodeKind::GeneratorExp => {
                self.out.push('(');
                self.comp_body(&children, 1);
                self.out.push(')');
            }
            NodeKind::DictComp => {
                self.out.push('{');
                self.node(children[0], 0);
                self.out.push_str(": ");
                self.node(children[1], 0);
                for &generator in &children[2..] {
                    self.out.push(' ');
                    self.node(generator, 0);
                }
                self.out.push('}');
            }
            NodeKind::Comprehension => {
                self.out.push_str("for ");
                self.node(children[0], 0);
                self.out.push_str(" in ");
                self.operand(children[1]);
                for &cond in &children[2..] {
                    self.out.push_str(" if ");
                    self.operand(cond);
                }
            }
        }
    }

    fn comp_body(&mut self, children: &[NodeId], generators_from: usize) {
        self.node(children[0], 0);
        for &generator in &children[generators_from..] {
            self.out.push(' ');
            self.node(generator, 0);
        }
    }
}
