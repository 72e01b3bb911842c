//! Syntactic variable analysis: which names a region reads, writes,
//! needs from outside, or leaks to code after it. Stands in for a
//! full reaching-definitions pass; every approximation here only ever
//! withholds a suggestion, it never widens one.

use indexmap::IndexSet;
use rustc_hash::FxHashSet;

use crate::ast::{NodeId, NodeKind, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Read,
    Write,
}

fn collect_events(tree: &Tree, id: NodeId, store: bool, events: &mut Vec<(String, Event)>) {
    let children = tree.children(id);
    match tree.kind(id) {
        NodeKind::Name => {
            if let Some(name) = tree.ident(id) {
                let event = if store { Event::Write } else { Event::Read };
                events.push((name.to_string(), event));
            }
        }
        NodeKind::AssignName => {
            if let Some(name) = tree.ident(id) {
                events.push((name.to_string(), Event::Write));
            }
        }
        NodeKind::AssignAttr => {
            // x.attr = v reads and mutates x
            collect_events(tree, children[0], false, events);
            if let Some(name) = base_name(tree, children[0]) {
                events.push((name, Event::Write));
            }
        }
        NodeKind::Assign => {
            let (targets, value) = children.split_at(children.len() - 1);
            collect_events(tree, value[0], false, events);
            for &target in targets {
                collect_events(tree, target, true, events);
            }
        }
        NodeKind::AugAssign => {
            collect_events(tree, children[1], false, events);
            // the target is read before being rewritten
            if let Some(name) = target_name(tree, children[0]) {
                events.push((name.clone(), Event::Read));
                events.push((name, Event::Write));
            } else {
                collect_events(tree, children[0], true, events);
            }
        }
        NodeKind::AnnAssign => {
            collect_events(tree, children[1], false, events);
            if tree.kind(children[2]) != NodeKind::Empty {
                collect_events(tree, children[2], false, events);
            }
            collect_events(tree, children[0], true, events);
        }
        NodeKind::For => {
            collect_events(tree, children[1], false, events);
            collect_events(tree, children[0], true, events);
            collect_events(tree, children[2], false, events);
            collect_events(tree, children[3], false, events);
        }
        NodeKind::Comprehension => {
            collect_events(tree, children[1], false, events);
            collect_events(tree, children[0], true, events);
            for &cond in &children[2..] {
                collect_events(tree, cond, false, events);
            }
        }
        NodeKind::WithItem => {
            collect_events(tree, children[0], false, events);
            if tree.kind(children[1]) != NodeKind::Empty {
                collect_events(tree, children[1], true, events);
            }
        }
        NodeKind::FunctionDef | NodeKind::ClassDef => {
            if let Some(name) = tree.ident(id) {
                events.push((name.to_string(), Event::Write));
            }
            for &child in children {
                collect_events(tree, child, false, events);
            }
        }
        NodeKind::Subscript if store => {
            // xs[i] = v reads xs and i, and mutates xs
            collect_events(tree, children[0], false, events);
            collect_events(tree, children[1], false, events);
            if let Some(name) = base_name(tree, children[0]) {
                events.push((name, Event::Write));
            }
        }
        NodeKind::TupleExpr | NodeKind::ListExpr | NodeKind::Starred if store => {
            for &child in children {
                collect_events(tree, child, store, events);
            }
        }
        _ => {
            for &child in children {
                collect_events(tree, child, false, events);
            }
        }
    }
}

/// The name at the root of an attribute/subscript chain.
fn base_name(tree: &Tree, mut id: NodeId) -> Option<String> {
    loop {
        match tree.kind(id) {
            NodeKind::Name | NodeKind::AssignName => return tree.ident(id).map(str::to_string),
            NodeKind::Attribute | NodeKind::AssignAttr | NodeKind::Subscript => {
                id = tree.children(id)[0];
            }
            _ => return None,
        }
    }
}

fn target_name(tree: &Tree, id: NodeId) -> Option<String> {
    match tree.kind(id) {
        NodeKind::AssignName | NodeKind::Name => tree.ident(id).map(str::to_string),
        _ => None,
    }
}

fn events_of(tree: &Tree, region: &[NodeId]) -> Vec<(String, Event)> {
    let mut events = Vec::new();
    for &id in region {
        collect_events(tree, id, false, &mut events);
    }
    events
}

/// Names a region needs defined before it: read at some point with no
/// region-local write preceding that read. Ordered by first use.
pub fn free_vars(tree: &Tree, region: &[NodeId]) -> Vec<String> {
    let mut written: FxHashSet<String> = FxHashSet::default();
    let mut free: IndexSet<String> = IndexSet::new();
    for (name, event) in events_of(tree, region) {
        match event {
            Event::Read => {
                if !written.contains(&name) {
                    free.insert(name);
                }
            }
            Event::Write => {
                written.insert(name);
            }
        }
    }
    free.into_iter().collect()
}

pub fn vars_read(tree: &Tree, region: &[NodeId]) -> IndexSet<String> {
    events_of(tree, region)
        .into_iter()
        .filter(|(_, e)| *e == Event::Read)
        .map(|(n, _)| n)
        .collect()
}

pub fn vars_written(tree: &Tree, region: &[NodeId]) -> IndexSet<String> {
    events_of(tree, region)
        .into_iter()
        .filter(|(_, e)| *e == Event::Write)
        .map(|(n, _)| n)
        .collect()
}

/// Names written inside the region and read by statements following
/// it (the region's last statement's following siblings, at every
/// enclosing level). These would have to be returned from an
/// extracted helper.
pub fn vars_used_after(tree: &Tree, region: &[NodeId]) -> Vec<String> {
    let written = vars_written(tree, region);
    if written.is_empty() {
        return Vec::new();
    }

    let mut read_after: IndexSet<String> = IndexSet::new();
    let last = match region.last() {
        Some(&last) => last,
        None => return Vec::new(),
    };
    let mut node = last;
    loop {
        let mut sibling = tree.next_sibling(node);
        while let Some(s) = sibling {
            read_after.extend(vars_read(tree, &[s]));
            sibling = tree.next_sibling(s);
        }
        match tree.parent(node) {
            Some(parent) => node = parent,
            None => break,
        }
    }

    written
        .into_iter()
        .filter(|name| read_after.contains(name))
        .collect()
}

/// Control-flow statements a region cannot keep once extracted:
/// returns not swallowed by a nested def, breaks/continues not
/// swallowed by a nested loop.
pub fn control_statements(tree: &Tree, region: &[NodeId]) -> usize {
    fn count(tree: &Tree, id: NodeId, in_def: bool, in_loop: bool) -> usize {
        match tree.kind(id) {
            NodeKind::Return if !in_def => 1,
            NodeKind::Break | NodeKind::Continue if !in_loop => 1,
            NodeKind::FunctionDef => tree
                .children(id)
                .iter()
                .map(|&c| count(tree, c, true, in_loop))
                .sum(),
            NodeKind::For | NodeKind::While => tree
                .children(id)
                .iter()
                .map(|&c| count(tree, c, in_def, true))
                .sum(),
            _ => tree
                .children(id)
                .iter()
                .map(|&c| count(tree, c, in_def, in_loop))
                .sum(),
        }
    }
    region
        .iter()
        .map(|&id| count(tree, id, false, false))
        .sum()
}

/// Whether any name read by the chain's tests is written by a branch
/// body. When it is, hoisting or inlining the tests would change
/// which value they see.
pub fn test_vars_change(tree: &Tree, tests: &[NodeId], bodies: &[Vec<NodeId>]) -> bool {
    let read_in_tests = vars_read(tree, tests);
    if read_in_tests.is_empty() {
        return false;
    }
    bodies.iter().any(|body| {
        vars_written(tree, body)
            .iter()
            .any(|name| read_in_tests.contains(name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::Builder;
    use crate::ast::BinaryOp;

    #[test]
    fn test_free_vars_orders_by_first_use() {
        let mut b = Builder::new();
        // y = a + b ; z = y + c
        let s1 = {
            let t = b.assign_name(1, "y");
            let a = b.name(1, "a");
            let bb = b.name(1, "b");
            let sum = b.binop(1, BinaryOp::Add, a, bb);
            b.assign(1, vec![t], sum)
        };
        let s2 = {
            let t = b.assign_name(2, "z");
            let y = b.name(2, "y");
            let c = b.name(2, "c");
            let sum = b.binop(2, BinaryOp::Add, y, c);
            b.assign(2, vec![t], sum)
        };
        let tree = b.into_tree();
        assert_eq!(free_vars(&tree, &[s1, s2]), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_aug_assign_target_is_free() {
        let mut b = Builder::new();
        let t = b.assign_name(1, "total");
        let one = b.int(1, 1);
        let stmt = b.aug_assign(1, BinaryOp::Add, t, one);
        let tree = b.into_tree();
        assert_eq!(free_vars(&tree, &[stmt]), vec!["total"]);
    }

    #[test]
    fn test_vars_used_after() {
        let mut b = Builder::new();
        let s1 = {
            let t = b.assign_name(1, "x");
            let v = b.int(1, 1);
            b.assign(1, vec![t], v)
        };
        let s2 = {
            let t = b.assign_name(2, "y");
            let v = b.int(2, 2);
            b.assign(2, vec![t], v)
        };
        let s3 = {
            let x = b.name(3, "x");
            let call = b.call_name(3, "print", vec![x]);
            b.expr_stmt(3, call)
        };
        let (tree, _module) = b.module(vec![s1, s2, s3]);
        // x is read after the region, y is not
        assert_eq!(vars_used_after(&tree, &[s1, s2]), vec!["x"]);
    }

    #[test]
    fn test_control_statements() {
        let mut b = Builder::new();
        let ret = b.ret(2, None);
        let flag = b.name(1, "flag");
        let guarded = b.if_stmt(1, flag, vec![ret]);
        let brk = b.break_stmt(4);
        let cond = b.name(3, "cond");
        let looped = b.while_stmt(3, cond, vec![brk], vec![]);
        let inner_ret = b.ret(6, None);
        let nested = b.func_def(5, "helper", vec![], vec![inner_ret]);
        let tree = b.into_tree();

        // the return escapes, the break is captured by its loop, the
        // nested function swallows its own return
        assert_eq!(control_statements(&tree, &[guarded]), 1);
        assert_eq!(control_statements(&tree, &[looped]), 0);
        assert_eq!(control_statements(&tree, &[nested]), 0);
    }

    #[test]
    fn test_test_vars_change() {
        let mut b = Builder::new();
        let test = b.name(1, "x");
        let body = {
            let t = b.assign_name(2, "x");
            let v = b.int(2, 0);
            vec![b.assign(2, vec![t], v)]
        };
        let other_body = {
            let t = b.assign_name(4, "y");
            let v = b.int(4, 0);
            vec![b.assign(4, vec![t], v)]
        };
        let tree = b.into_tree();
        assert!(test_vars_change(&tree, &[test], &[body.clone()]));
        assert!(!test_vars_change(&tree, &[test], &[other_body]));
    }
}
