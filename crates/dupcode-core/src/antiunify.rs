//! Antiunification: the most specific common generalization of two or
//! more same-role subtrees, together with the substitutions that
//! specialize it back to each input.
//!
//! The generalized core lives in its own synthetic tree. Positions
//! where the inputs diverge become antiunification variables: payload
//! slots (`ValueSlot::Var`/`OpSlot::Var`) when only a scalar differs,
//! whole `AunifyVar` nodes when shape diverges. Shape divergence
//! (kind or child-count mismatch) marks the variable, and marked
//! variables make the enclosing detection abort, since a substitution
//! cannot have variable arity.

use indexmap::IndexMap;

use crate::ast::build::Builder;
use crate::ast::render::{render, render_value};
use crate::ast::{AvarId, NodeId, NodeKind, OpKind, OpSlot, Tree, Value, ValueSlot};
use crate::span::Span;

/// One per-input substituted value of an antiunification variable.
#[derive(Debug, Clone)]
pub enum SubValue {
    /// A whole subtree in the source tree.
    Node(NodeId),
    /// A sequence of sibling subtrees (only for sequence-length
    /// mismatches at the top level).
    Seq(Vec<NodeId>),
    /// A scalar payload.
    Value(Value),
    /// An operator payload.
    Op(OpKind),
}

impl SubValue {
    pub fn render_key(&self, src: &Tree) -> String {
        match self {
            SubValue::Node(id) => render(src, *id),
            SubValue::Seq(ids) => ids
                .iter()
                .map(|&id| render(src, id))
                .collect::<Vec<_>>()
                .join("\n"),
            SubValue::Value(value) => render_value(value),
            SubValue::Op(op) => op.symbol().to_string(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SubValue::Value(Value::Int(n)) => Some(*n),
            _ => None,
        }
    }
}

/// A position where the inputs diverge.
#[derive(Debug, Clone)]
pub struct AunifyVar {
    /// Synthetic identifier, stable across one antiunification run;
    /// marked with a `-` when the variable covers a shape mismatch.
    pub name: String,
    /// One substituted value per input, parallel-indexed.
    pub subs: Vec<SubValue>,
    /// Core-tree nodes holding this variable (several after dedup).
    pub owners: Vec<NodeId>,
    /// Kind or arity divergence below this position.
    pub mismatch: bool,
}

/// Result of one antiunification call: the generalized core (a
/// synthetic tree plus its root sequence) and the variable table.
#[derive(Debug, Clone)]
pub struct Aunified {
    pub tree: Tree,
    pub roots: Vec<NodeId>,
    pub avars: Vec<AunifyVar>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Role {
    Subtree,
    Value,
    Op,
}

struct Aunifier<'t> {
    src: &'t Tree,
    builder: Builder,
    avars: Vec<AunifyVar>,
    dedup: IndexMap<(Role, Vec<String>), AvarId>,
}

/// Compute the generalization of `inputs`, each an equal-role
/// statement run (wrap single nodes in a one-element slice). At least
/// two inputs are required.
pub fn antiunify(src: &Tree, inputs: &[Vec<NodeId>]) -> Aunified {
    debug_assert!(inputs.len() >= 2);
    let mut aunifier = Aunifier {
        src,
        builder: Builder::new(),
        avars: Vec::new(),
        dedup: IndexMap::new(),
    };
    let roots = aunifier.sequences(inputs);
    Aunified {
        tree: aunifier.builder.into_tree(),
        roots,
        avars: aunifier.avars,
    }
}

/// Single-node-per-input convenience form.
pub fn antiunify_nodes(src: &Tree, inputs: &[NodeId]) -> Aunified {
    let wrapped: Vec<Vec<NodeId>> = inputs.iter().map(|&id| vec![id]).collect();
    antiunify(src, &wrapped)
}

impl Aunifier<'_> {
    fn fresh(&mut self, role: Role, subs: Vec<SubValue>, mismatch: bool) -> AvarId {
        let key = (
            role,
            subs.iter().map(|s| s.render_key(self.src)).collect::<Vec<_>>(),
        );
        if let Some(&existing) = self.dedup.get(&key) {
            return existing;
        }
        let id = AvarId(self.avars.len());
        let name = if mismatch {
            format!("sub_{}-mismatch", id.0)
        } else {
            format!("sub_{}", id.0)
        };
        self.avars.push(AunifyVar {
            name,
            subs,
            owners: Vec::new(),
            mismatch,
        });
        self.dedup.insert(key, id);
        id
    }

    fn sequences(&mut self, inputs: &[Vec<NodeId>]) -> Vec<NodeId> {
        let len = inputs[0].len();
        if inputs.iter().any(|seq| seq.len() != len) {
            let subs = inputs
                .iter()
                .map(|seq| SubValue::Seq(seq.clone()))
                .collect();
            let id = self.fresh(Role::Subtree, subs, true);
            let span = inputs[0]
                .first()
                .map(|&n| self.src.span(n))
                .unwrap_or_default();
            let node = self.builder.avar(id, span);
            self.avars[id.0].owners.push(node);
            return vec![node];
        }
        (0..len)
            .map(|i| {
                let position: Vec<NodeId> = inputs.iter().map(|seq| seq[i]).collect();
                self.nodes(&position)
            })
            .collect()
    }

    fn subtree_avar(&mut self, inputs: &[NodeId]) -> NodeId {
        let subs = inputs.iter().map(|&id| SubValue::Node(id)).collect();
        let id = self.fresh(Role::Subtree, subs, true);
        let node = self.builder.avar(id, self.src.span(inputs[0]));
        self.avars[id.0].owners.push(node);
        node
    }

    fn concrete_value(&self, id: NodeId) -> Option<Value> {
        self.src.value(id).and_then(ValueSlot::as_value).cloned()
    }

    fn nodes(&mut self, inputs: &[NodeId]) -> NodeId {
        let first = inputs[0];
        let kind = self.src.kind(first);
        let child_count = self.src.children(first).len();
        let ops_count = self.src.ops(first).len();
        let has_value = self.concrete_value(first).is_some();

        let shape_matches = inputs.iter().all(|&id| {
            self.src.kind(id) == kind
                && self.src.children(id).len() == child_count
                && self.src.ops(id).len() == ops_count
                && self.concrete_value(id).is_some() == has_value
        });
        if !shape_matches {
            return self.subtree_avar(inputs);
        }

        let mut pending: Vec<AvarId> = Vec::new();

        let ops: Vec<OpSlot> = (0..ops_count)
            .map(|slot| {
                let first_op = self.src.ops(first)[slot].as_op();
                let all_equal = inputs
                    .iter()
                    .all(|&id| self.src.ops(id)[slot].as_op() == first_op);
                match (first_op, all_equal) {
                    (Some(op), true) => OpSlot::Op(op),
                    _ => {
                        let subs = inputs
                            .iter()
                            .map(|&id| match self.src.ops(id)[slot].as_op() {
                                Some(op) => SubValue::Op(op),
                                None => SubValue::Node(id),
                            })
                            .collect();
                        let id = self.fresh(Role::Op, subs, false);
                        pending.push(id);
                        OpSlot::Var(id)
                    }
                }
            })
            .collect();

        let value: Option<ValueSlot> = if has_value {
            let first_value = self.concrete_value(first);
            let all_equal = inputs
                .iter()
                .all(|&id| self.concrete_value(id) == first_value);
            if all_equal {
                first_value.map(ValueSlot::Value)
            } else {
                let subs = inputs
                    .iter()
                    .map(|&id| match self.concrete_value(id) {
                        Some(value) => SubValue::Value(value),
                        None => SubValue::Node(id),
                    })
                    .collect();
                let id = self.fresh(Role::Value, subs, false);
                pending.push(id);
                Some(ValueSlot::Var(id))
            }
        } else {
            None
        };

        let children: Vec<NodeId> = (0..child_count)
            .map(|i| {
                let position: Vec<NodeId> =
                    inputs.iter().map(|&id| self.src.children(id)[i]).collect();
                self.nodes(&position)
            })
            .collect();

        let node = self
            .builder
            .push(kind, value, ops, children, self.src.span(first));
        for id in pending {
            self.avars[id.0].owners.push(node);
        }
        node
    }
}

impl Aunified {
    /// Any variable covering a kind or arity mismatch.
    pub fn has_mismatch(&self) -> bool {
        self.avars.iter().any(|avar| avar.mismatch)
    }

    /// The node a variable is attached to, unwrapping the scalar
    /// carriers (`Const`/`Name`/the `AunifyVar` placeholder itself).
    pub fn attachment_parents(&self, avar: &AunifyVar) -> Vec<NodeId> {
        avar.owners
            .iter()
            .filter_map(|&owner| {
                match self.tree.kind(owner) {
                    NodeKind::AunifyVar | NodeKind::Const | NodeKind::Name => {
                        self.tree.parent(owner)
                    }
                    _ => Some(owner),
                }
            })
            .collect()
    }

    /// A variable sits in an assignment-target name position.
    /// Substituting the left-hand side of an assignment is
    /// structurally valid but almost never the intended
    /// generalization, so callers reject these.
    pub fn assigns_to_avar(&self) -> bool {
        self.avars.iter().any(|avar| {
            avar.owners.iter().any(|&owner| {
                matches!(
                    self.tree.kind(owner),
                    NodeKind::AssignName | NodeKind::AssignAttr
                )
            })
        })
    }

    /// A variable occupies a "called" position: an operator slot, an
    /// attribute name, or any enclosing node used as a call target.
    pub fn called_avar(&self) -> bool {
        for (index, avar) in self.avars.iter().enumerate() {
            for &owner in &avar.owners {
                let in_op_slot = self
                    .tree
                    .ops(owner)
                    .iter()
                    .any(|slot| slot.as_var() == Some(AvarId(index)));
                if in_op_slot {
                    return true;
                }
                if matches!(self.tree.kind(owner), NodeKind::Attribute | NodeKind::AssignAttr)
                    && self.tree.value(owner).and_then(ValueSlot::as_var) == Some(AvarId(index))
                {
                    return true;
                }
                let mut node = owner;
                while let Some(parent) = self.tree.parent(node) {
                    if self.tree.kind(parent) == NodeKind::Call
                        && self.tree.children(parent)[0] == node
                    {
                        return true;
                    }
                    node = parent;
                }
            }
        }
        false
    }

    /// A variable's attachment parent is a binary-operator
    /// expression; the ternary synthesizer refuses those.
    pub fn in_complex_expression(&self) -> bool {
        self.avars.iter().any(|avar| {
            self.attachment_parents(avar)
                .iter()
                .any(|&parent| self.tree.kind(parent) == NodeKind::BinOp)
        })
    }

    /// Whether the core subtree rooted at `id` contains any variable.
    pub fn subtree_has_avar(&self, id: NodeId) -> bool {
        if self.tree.kind(id) == NodeKind::AunifyVar {
            return true;
        }
        if matches!(self.tree.value(id), Some(ValueSlot::Var(_))) {
            return true;
        }
        if self.tree.ops(id).iter().any(|slot| slot.as_var().is_some()) {
            return true;
        }
        self.tree
            .children(id)
            .iter()
            .any(|&child| self.subtree_has_avar(child))
    }

    /// Rebuild input `index` by substituting every variable's
    /// `subs[index]` back into the core. Returns the reconstructed
    /// statement sequence in a fresh tree.
    pub fn reify(&self, src: &Tree, index: usize) -> (Tree, Vec<NodeId>) {
        let mut builder = Builder::new();
        let roots = self
            .roots
            .iter()
            .flat_map(|&root| self.reify_node(src, &mut builder, root, index))
            .collect();
        (builder.into_tree(), roots)
    }

    fn reify_node(
        &self,
        src: &Tree,
        builder: &mut Builder,
        id: NodeId,
        index: usize,
    ) -> Vec<NodeId> {
        let node = self.tree.node(id);
        if node.kind == NodeKind::AunifyVar {
            let avar_id = node
                .value
                .as_ref()
                .and_then(ValueSlot::as_var)
                .expect("AunifyVar node carries its variable id");
            return match &self.avars[avar_id.0].subs[index] {
                SubValue::Node(n) => vec![builder.copy_from(src, *n)],
                SubValue::Seq(ns) => ns.iter().map(|&n| builder.copy_from(src, n)).collect(),
                SubValue::Value(value) => vec![builder.constant(0, value.clone())],
                SubValue::Op(_) => Vec::new(),
            };
        }

        let value = node.value.clone().map(|slot| match slot {
            ValueSlot::Value(value) => ValueSlot::Value(value),
            ValueSlot::Var(avar_id) => match &self.avars[avar_id.0].subs[index] {
                SubValue::Value(value) => ValueSlot::Value(value.clone()),
                other => ValueSlot::Value(Value::Ident(other.render_key(src))),
            },
        });
        let ops = node
            .ops
            .iter()
            .map(|slot| match slot {
                OpSlot::Op(op) => OpSlot::Op(*op),
                OpSlot::Var(avar_id) => match &self.avars[avar_id.0].subs[index] {
                    SubValue::Op(op) => OpSlot::Op(*op),
                    _ => *slot,
                },
            })
            .collect();
        let children = node
            .children
            .clone()
            .into_iter()
            .flat_map(|child| self.reify_node(src, builder, child, index))
            .collect();
        vec![builder.push(node.kind, value, ops, children, node.span)]
    }
}
