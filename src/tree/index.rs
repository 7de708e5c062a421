//! Immutable postorder-indexed view of a tree.
//!
//! Node ids are assigned by postorder rank, which gives the structure its
//! two load-bearing properties: iterating ids `0..n` visits children
//! before parents (so accumulation sweeps need no traversal machinery),
//! and the descendants of node `k` occupy the contiguous id range
//! `k + 1 - subtree_size(k) ..= k`. The root is always `n - 1`.

use crate::error::{Result, UniFracError};
use crate::tree::Tree;
use std::collections::HashMap;
use std::ops::RangeInclusive;

/// Identifier of a node in an [`IndexedTree`]: its postorder rank.
pub type NodeId = usize;

/// A tree frozen into postorder id space.
///
/// Built once from a [`Tree`] and never mutated; every per-node attribute
/// is a flat vector indexed by [`NodeId`].
#[derive(Debug, Clone)]
pub struct IndexedTree {
    names: Vec<Option<String>>,
    lengths: Vec<f64>,
    parents: Vec<Option<NodeId>>,
    children: Vec<Vec<NodeId>>,
    subtree_sizes: Vec<usize>,
    name_to_id: HashMap<String, NodeId>,
}

impl IndexedTree {
    /// Index a tree by postorder rank.
    ///
    /// When a name occurs on several nodes, the smallest id (first
    /// postorder occurrence) wins the name lookup; the other nodes keep
    /// their names but are not reachable through [`id_of`](Self::id_of).
    pub fn from_tree(tree: &Tree) -> Result<IndexedTree> {
        if tree.is_empty() {
            return Err(UniFracError::EmptyData("cannot index an empty tree".to_string()));
        }
        let order = tree.postorder();
        let n = order.len();
        let mut rank = vec![0; n];
        for (id, &arena) in order.iter().enumerate() {
            rank[arena] = id;
        }
        let mut names = Vec::with_capacity(n);
        let mut lengths = Vec::with_capacity(n);
        let mut parents = Vec::with_capacity(n);
        let mut children = Vec::with_capacity(n);
        let mut subtree_sizes = vec![1usize; n];
        let mut name_to_id = HashMap::new();
        for (id, &arena) in order.iter().enumerate() {
            names.push(tree.name(arena).map(String::from));
            lengths.push(tree.length(arena));
            parents.push(tree.parent(arena).map(|p| rank[p]));
            let kids: Vec<NodeId> = tree.children(arena).iter().map(|&c| rank[c]).collect();
            for &kid in &kids {
                subtree_sizes[id] += subtree_sizes[kid];
            }
            children.push(kids);
            if let Some(name) = tree.name(arena) {
                name_to_id.entry(name.to_string()).or_insert(id);
            }
        }
        Ok(IndexedTree {
            names,
            lengths,
            parents,
            children,
            subtree_sizes,
            name_to_id,
        })
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    /// Id of the root, always `node_count() - 1`.
    pub fn root(&self) -> NodeId {
        self.names.len() - 1
    }

    /// Name of a node, if it has one.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.names[id].as_deref()
    }

    /// Branch length from a node to its parent. Unused for the root.
    pub fn length(&self, id: NodeId) -> f64 {
        self.lengths[id]
    }

    /// Parent id, `None` for the root. Parents always have larger ids.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents[id]
    }

    /// Child ids. Children always have smaller ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.children[id]
    }

    /// True if the node has no children.
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.children[id].is_empty()
    }

    /// Number of nodes in the subtree rooted at `id`, including `id`.
    pub fn subtree_size(&self, id: NodeId) -> usize {
        self.subtree_sizes[id]
    }

    /// Ids of all nodes in the subtree rooted at `id`, including `id`.
    /// Contiguous by construction.
    pub fn subtree_range(&self, id: NodeId) -> RangeInclusive<NodeId> {
        (id + 1 - self.subtree_sizes[id])..=id
    }

    /// Resolve a name to its id, taking the first postorder occurrence
    /// for duplicated names.
    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.name_to_id.get(name).copied()
    }

    /// Resolve a list of names to ids.
    ///
    /// Fails with `InvalidTipSet` listing the names absent from the tree
    /// in sorted order, so a caller sees every problem at once.
    pub fn ids_for_names(&self, names: &[String]) -> Result<Vec<NodeId>> {
        let mut ids = Vec::with_capacity(names.len());
        let mut missing: Vec<&str> = Vec::new();
        for name in names {
            match self.id_of(name) {
                Some(id) => ids.push(id),
                None => missing.push(name),
            }
        }
        if !missing.is_empty() {
            missing.sort_unstable();
            missing.dedup();
            return Err(UniFracError::InvalidTipSet(missing.join(", ")));
        }
        Ok(ids)
    }

    /// Sum of branch lengths over all non-root edges.
    pub fn total_branch_length(&self) -> f64 {
        self.lengths[..self.root()].iter().sum()
    }

    /// Sum of branch lengths on the path from a node up to the root.
    pub fn distance_to_root(&self, id: NodeId) -> f64 {
        let mut distance = 0.0;
        let mut cur = id;
        while let Some(parent) = self.parents[cur] {
            distance += self.lengths[cur];
            cur = parent;
        }
        distance
    }
}
