//! Structural transform over a [`ProcedureTree`].
//!
//! [`walk`] produces a [`MirrorTree`] with exactly the input's keys and
//! nesting. Each procedure becomes whatever the [`TreeVisitor`] makes of it,
//! and each namespace is walked again with the visitor returned by
//! [`TreeVisitor::enter_namespace`]. No visitor callback depends on traversal
//! order.

use crate::{DottedPath, Node, Procedure, ProcedureTree};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

pub trait TreeVisitor: Sized {
    type Leaf;

    fn visit_procedure(&self, key: &str, procedure: &Arc<dyn Procedure>) -> Self::Leaf;

    /// Visitor used for the namespace stored under `key`.
    fn enter_namespace(&self, key: &str) -> Self;
}

pub fn walk<V: TreeVisitor>(tree: Option<&ProcedureTree>, visitor: &V) -> MirrorTree<V::Leaf> {
    let Some(tree) = tree else {
        return MirrorTree::default();
    };

    let entries = tree
        .iter()
        .map(|(key, node)| {
            let mirrored = match node {
                Node::Procedure(procedure) => Mirror::Leaf(visitor.visit_procedure(key, procedure)),
                Node::Namespace(nested) => {
                    Mirror::Namespace(walk(Some(nested), &visitor.enter_namespace(key)))
                }
            };
            (key.to_string(), mirrored)
        })
        .collect();

    MirrorTree { entries }
}

pub enum Mirror<L> {
    Leaf(L),
    Namespace(MirrorTree<L>),
}

impl<L> Mirror<L> {
    pub fn as_leaf(&self) -> Option<&L> {
        match self {
            Mirror::Leaf(leaf) => Some(leaf),
            Mirror::Namespace(_) => None,
        }
    }

    pub fn as_namespace(&self) -> Option<&MirrorTree<L>> {
        match self {
            Mirror::Leaf(_) => None,
            Mirror::Namespace(tree) => Some(tree),
        }
    }
}

impl<L: fmt::Debug> fmt::Debug for Mirror<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mirror::Leaf(leaf) => f.debug_tuple("Leaf").field(leaf).finish(),
            Mirror::Namespace(tree) => f.debug_tuple("Namespace").field(tree).finish(),
        }
    }
}

/// Output of [`walk`]: same keys, same nesting as the walked tree.
pub struct MirrorTree<L> {
    entries: IndexMap<String, Mirror<L>>,
}

impl<L> Default for MirrorTree<L> {
    fn default() -> Self {
        MirrorTree {
            entries: IndexMap::new(),
        }
    }
}

impl<L> MirrorTree<L> {
    pub fn get(&self, key: &str) -> Option<&Mirror<L>> {
        self.entries.get(key)
    }

    pub fn leaf(&self, key: &str) -> Option<&L> {
        self.get(key).and_then(Mirror::as_leaf)
    }

    pub fn namespace(&self, key: &str) -> Option<&MirrorTree<L>> {
        self.get(key).and_then(Mirror::as_namespace)
    }

    pub fn lookup(&self, path: &str) -> Option<&Mirror<L>> {
        let mut segments = path.split(crate::path::SEPARATOR);
        let mut entry = self.get(segments.next()?)?;
        for segment in segments {
            entry = entry.as_namespace()?.get(segment)?;
        }
        Some(entry)
    }

    pub fn leaf_at(&self, path: &str) -> Option<&L> {
        self.lookup(path).and_then(Mirror::as_leaf)
    }

    /// Every leaf with its full dotted path, depth first in key order.
    pub fn leaves(&self) -> Vec<(DottedPath, &L)> {
        let mut out = Vec::new();
        self.collect_leaves(None, &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, parent: Option<&DottedPath>, out: &mut Vec<(DottedPath, &'a L)>) {
        for (key, entry) in &self.entries {
            let path = DottedPath::join(parent, key);
            match entry {
                Mirror::Leaf(leaf) => out.push((path, leaf)),
                Mirror::Namespace(tree) => tree.collect_leaves(Some(&path), out),
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Mirror<L>)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<L: fmt::Debug> fmt::Debug for MirrorTree<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}
