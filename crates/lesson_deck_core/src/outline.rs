//! crates/lesson_deck_core/src/outline.rs
//!
//! The teaching outline: a recursive title/children tree for the API surface,
//! and a flat list of rows (parent reference + sibling index) for storage.
//! Both conversions walk the tree with an explicit stack, so depth is bounded
//! only by memory.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// One node of the outline tree. Child order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub title: String,
    #[serde(default)]
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    pub fn leaf(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(title: impl Into<String>, children: Vec<OutlineNode>) -> Self {
        Self {
            title: title.into(),
            children,
        }
    }

    /// Total number of nodes, this one included.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

/// A single outline node in its stored form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineRow {
    pub id: Uuid,
    /// `None` for the root.
    pub parent_id: Option<Uuid>,
    pub title: String,
    /// Position among siblings, starting at zero.
    pub order_index: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutlineError {
    #[error("outline has no nodes")]
    Empty,
    #[error("outline has no root node")]
    NoRoot,
    #[error("outline has {0} root nodes, expected exactly one")]
    MultipleRoots(usize),
    #[error("outline node {0} appears more than once")]
    DuplicateId(Uuid),
    #[error("{0} outline nodes are not reachable from the root")]
    Unreachable(usize),
}

/// Converts a tree into rows in pre-order. Every call assigns fresh row ids.
pub fn flatten(root: &OutlineNode) -> Vec<OutlineRow> {
    let mut rows = Vec::with_capacity(root.node_count());
    let mut stack: Vec<(&OutlineNode, Option<Uuid>, i32)> = vec![(root, None, 0)];

    while let Some((node, parent_id, order_index)) = stack.pop() {
        let id = Uuid::new_v4();
        rows.push(OutlineRow {
            id,
            parent_id,
            title: node.title.clone(),
            order_index,
        });
        for (index, child) in node.children.iter().enumerate().rev() {
            stack.push((child, Some(id), index as i32));
        }
    }

    rows
}

/// Rebuilds the tree from rows in any order. Siblings are ordered by
/// `order_index`; ties keep their input order.
pub fn assemble(rows: &[OutlineRow]) -> Result<OutlineNode, OutlineError> {
    if rows.is_empty() {
        return Err(OutlineError::Empty);
    }

    let mut seen = HashSet::with_capacity(rows.len());
    for row in rows {
        if !seen.insert(row.id) {
            return Err(OutlineError::DuplicateId(row.id));
        }
    }

    let mut children: HashMap<Option<Uuid>, Vec<&OutlineRow>> = HashMap::new();
    for row in rows {
        children.entry(row.parent_id).or_default().push(row);
    }
    for siblings in children.values_mut() {
        siblings.sort_by_key(|row| row.order_index);
    }

    let root = match children.remove(&None) {
        None => return Err(OutlineError::NoRoot),
        Some(roots) if roots.len() > 1 => return Err(OutlineError::MultipleRoots(roots.len())),
        Some(roots) => roots[0],
    };

    // Pre-order walk from the root; anything not visited is orphaned or part of a cycle.
    let mut order = Vec::with_capacity(rows.len());
    let mut stack = vec![root];
    while let Some(row) = stack.pop() {
        order.push(row);
        if let Some(kids) = children.get(&Some(row.id)) {
            stack.extend(kids.iter().rev());
        }
    }
    if order.len() != rows.len() {
        return Err(OutlineError::Unreachable(rows.len() - order.len()));
    }

    // Reverse pre-order visits every child before its parent.
    let mut built: HashMap<Uuid, OutlineNode> = HashMap::with_capacity(rows.len());
    for row in order.into_iter().rev() {
        let kids = children
            .get(&Some(row.id))
            .map(|kids| kids.iter().filter_map(|kid| built.remove(&kid.id)).collect())
            .unwrap_or_default();
        built.insert(row.id, OutlineNode::with_children(row.title.clone(), kids));
    }

    built.remove(&root.id).ok_or(OutlineError::NoRoot)
}
