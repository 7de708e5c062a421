//! Arena-backed rooted tree with named nodes and branch lengths.
//!
//! Nodes live in flat vectors indexed by insertion order; parent and child
//! links are plain indices. All traversals are iterative, so arbitrarily
//! deep trees cannot overflow the call stack.

use crate::error::{Result, UniFracError};
use std::collections::HashSet;

/// A rooted phylogenetic tree.
///
/// Branch lengths are stored per node and describe the edge to the node's
/// parent; the root's length is unused. Names are optional and may appear
/// on internal nodes as well as tips.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    names: Vec<Option<String>>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    lengths: Vec<f64>,
    root: usize,
}

impl Tree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Tree::default()
    }

    /// Append a node and return its arena index.
    ///
    /// A node added with `parent: None` becomes the root. Children keep
    /// the order in which they were added.
    pub fn add_node(&mut self, name: Option<String>, length: f64, parent: Option<usize>) -> usize {
        let id = self.names.len();
        self.names.push(name);
        self.parents.push(parent);
        self.children.push(Vec::new());
        self.lengths.push(length);
        match parent {
            Some(p) => self.children[p].push(id),
            None => self.root = id,
        }
        id
    }

    /// Replace a node's name. Used while parsing, where an internal
    /// node's label only appears after its children.
    pub(crate) fn set_name(&mut self, node: usize, name: Option<String>) {
        self.names[node] = name;
    }

    /// Replace a node's branch length.
    pub(crate) fn set_length(&mut self, node: usize, length: f64) {
        self.lengths[node] = length;
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Arena index of the root. Meaningful only for non-empty trees.
    pub fn root(&self) -> usize {
        self.root
    }

    /// Name of a node, if it has one.
    pub fn name(&self, node: usize) -> Option<&str> {
        self.names[node].as_deref()
    }

    /// Branch length from a node to its parent.
    pub fn length(&self, node: usize) -> f64 {
        self.lengths[node]
    }

    /// Parent arena index, `None` for the root.
    pub fn parent(&self, node: usize) -> Option<usize> {
        self.parents[node]
    }

    /// Child arena indices in insertion order.
    pub fn children(&self, node: usize) -> &[usize] {
        &self.children[node]
    }

    /// True if the node has no children.
    pub fn is_leaf(&self, node: usize) -> bool {
        self.children[node].is_empty()
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_leaf(i)).count()
    }

    /// Sum of branch lengths over all non-root nodes.
    pub fn total_branch_length(&self) -> f64 {
        (0..self.len())
            .filter(|&i| i != self.root)
            .map(|i| self.lengths[i])
            .sum()
    }

    /// Arena indices in postorder: children before parents, root last.
    pub fn postorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.len());
        if self.is_empty() {
            return order;
        }
        let mut stack = vec![(self.root, 0usize)];
        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let cursor = frame.1;
            if cursor < self.children[node].len() {
                frame.1 += 1;
                stack.push((self.children[node][cursor], 0));
            } else {
                stack.pop();
                order.push(node);
            }
        }
        order
    }

    /// Restrict the tree to the named nodes and their ancestors.
    ///
    /// Every listed name must occur in the tree; missing names fail with
    /// `InvalidTipSet` listing them in sorted order. Subtrees containing
    /// no listed name are dropped. Surviving nodes keep their names,
    /// branch lengths, and child order; unary paths are not collapsed, so
    /// internal structure above the retained nodes is preserved exactly.
    pub fn restrict(&self, names: &[String]) -> Result<Tree> {
        if names.is_empty() {
            return Err(UniFracError::EmptyData(
                "no identifiers to restrict the tree to".to_string(),
            ));
        }
        let wanted: HashSet<&str> = names.iter().map(|s| s.as_str()).collect();
        let mut found: HashSet<&str> = HashSet::new();
        let mut keep = vec![false; self.len()];
        for i in 0..self.len() {
            if let Some(name) = self.name(i) {
                if wanted.contains(name) {
                    keep[i] = true;
                    found.insert(name);
                }
            }
        }
        if found.len() != wanted.len() {
            let mut missing: Vec<&str> = wanted.difference(&found).copied().collect();
            missing.sort_unstable();
            return Err(UniFracError::InvalidTipSet(missing.join(", ")));
        }
        // Walk rootward from every named node; stop at the first ancestor
        // that is already marked.
        for i in 0..self.len() {
            if !keep[i] {
                continue;
            }
            let mut cur = i;
            while let Some(parent) = self.parents[cur] {
                if keep[parent] {
                    break;
                }
                keep[parent] = true;
                cur = parent;
            }
        }
        // Rebuild in preorder so every parent is remapped before its
        // children; reversing the child pushes preserves child order.
        let mut remap = vec![usize::MAX; self.len()];
        let mut out = Tree::new();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            let parent = self.parents[node].map(|p| remap[p]);
            remap[node] = out.add_node(self.names[node].clone(), self.lengths[node], parent);
            for &child in self.children[node].iter().rev() {
                if keep[child] {
                    stack.push(child);
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// ((A:1,B:2)E:3,(C:4,D:5)F:6)R;
    fn create_test_tree() -> Tree {
        let mut tree = Tree::new();
        let r = tree.add_node(Some("R".to_string()), 0.0, None);
        let e = tree.add_node(Some("E".to_string()), 3.0, Some(r));
        tree.add_node(Some("A".to_string()), 1.0, Some(e));
        tree.add_node(Some("B".to_string()), 2.0, Some(e));
        let f = tree.add_node(Some("F".to_string()), 6.0, Some(r));
        tree.add_node(Some("C".to_string()), 4.0, Some(f));
        tree.add_node(Some("D".to_string()), 5.0, Some(f));
        tree
    }

    #[test]
    fn test_add_node_links() {
        let tree = create_test_tree();
        assert_eq!(tree.len(), 7);
        assert_eq!(tree.root(), 0);
        assert_eq!(tree.leaf_count(), 4);
        assert_eq!(tree.children(0), &[1, 4]);
        assert_eq!(tree.parent(2), Some(1));
        assert!(tree.is_leaf(2));
        assert!(!tree.is_leaf(1));
    }

    #[test]
    fn test_postorder_children_first() {
        let tree = create_test_tree();
        let order = tree.postorder();
        assert_eq!(order.len(), tree.len());
        assert_eq!(*order.last().unwrap(), tree.root());
        let position: Vec<usize> = {
            let mut pos = vec![0; tree.len()];
            for (rank, &node) in order.iter().enumerate() {
                pos[node] = rank;
            }
            pos
        };
        for node in 0..tree.len() {
            if let Some(parent) = tree.parent(node) {
                assert!(position[node] < position[parent]);
            }
        }
        // Left subtree before right subtree.
        let names: Vec<&str> = order.iter().map(|&i| tree.name(i).unwrap()).collect();
        assert_eq!(names, vec!["A", "B", "E", "C", "D", "F", "R"]);
    }

    #[test]
    fn test_total_branch_length_excludes_root() {
        let tree = create_test_tree();
        assert_relative_eq!(tree.total_branch_length(), 21.0);
    }

    #[test]
    fn test_restrict_drops_unreferenced_subtree() {
        let tree = create_test_tree();
        let restricted = tree
            .restrict(&["A".to_string(), "B".to_string()])
            .unwrap();
        // R, E, A, B survive; F's subtree is gone.
        assert_eq!(restricted.len(), 4);
        assert_relative_eq!(restricted.total_branch_length(), 6.0);
        let names: Vec<&str> = restricted
            .postorder()
            .iter()
            .map(|&i| restricted.name(i).unwrap())
            .collect();
        assert_eq!(names, vec!["A", "B", "E", "R"]);
    }

    #[test]
    fn test_restrict_keeps_internal_name() {
        let tree = create_test_tree();
        // Naming an internal node keeps it even though its leaves go.
        let restricted = tree
            .restrict(&["F".to_string(), "A".to_string()])
            .unwrap();
        let names: Vec<&str> = restricted
            .postorder()
            .iter()
            .map(|&i| restricted.name(i).unwrap())
            .collect();
        assert_eq!(names, vec!["A", "E", "F", "R"]);
        // F survives as a leaf; its branch length is intact.
        assert_relative_eq!(restricted.total_branch_length(), 10.0);
    }

    #[test]
    fn test_restrict_preserves_unary_path() {
        // (((A:1)B:2)C:3)R; restricting to A keeps the whole chain.
        let mut tree = Tree::new();
        let r = tree.add_node(Some("R".to_string()), 0.0, None);
        let c = tree.add_node(Some("C".to_string()), 3.0, Some(r));
        let b = tree.add_node(Some("B".to_string()), 2.0, Some(c));
        tree.add_node(Some("A".to_string()), 1.0, Some(b));
        let restricted = tree.restrict(&["A".to_string()]).unwrap();
        assert_eq!(restricted.len(), 4);
        assert_relative_eq!(restricted.total_branch_length(), 6.0);
    }

    #[test]
    fn test_restrict_missing_names_sorted() {
        let tree = create_test_tree();
        let err = tree
            .restrict(&["Z".to_string(), "A".to_string(), "Q".to_string()])
            .unwrap_err();
        match err {
            UniFracError::InvalidTipSet(missing) => assert_eq!(missing, "Q, Z"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_restrict_empty_is_error() {
        let tree = create_test_tree();
        assert!(matches!(
            tree.restrict(&[]),
            Err(UniFracError::EmptyData(_))
        ));
    }
}
