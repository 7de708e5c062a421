//! Clade profiling: where a node sits in the tree and how wide the
//! clade below it spreads.

use crate::data::CladeProfile;
use crate::error::{Result, UniFracError};
use crate::tree::{IndexedTree, NodeId};

/// Profile the clade rooted at a node.
///
/// `clade_width` is the largest tip-to-tip path length within the clade,
/// found in one ascending sweep over the clade's contiguous id range:
/// every node keeps the depth of its deepest descendant tip, and each
/// multi-child node offers its top two child depths (child edge included)
/// as a width candidate. A tip clade has width zero and names itself as
/// both divergent tips; ties keep the first candidate encountered.
///
/// Tips without a name are labeled by their id.
pub fn profile_clade(indexed: &IndexedTree, node: NodeId) -> Result<CladeProfile> {
    if node >= indexed.node_count() {
        return Err(UniFracError::InvalidParameter(format!(
            "node id {} out of range for a tree of {} nodes",
            node,
            indexed.node_count()
        )));
    }

    let range = indexed.subtree_range(node);
    let offset = *range.start();
    let size = indexed.subtree_size(node);
    // Deepest-tip distance and which tip realizes it, per clade node.
    let mut depth = vec![0.0_f64; size];
    let mut deep_tip: Vec<NodeId> = vec![node; size];
    let mut best: Option<(f64, NodeId, NodeId)> = None;

    for id in range {
        let local = id - offset;
        if indexed.is_leaf(id) {
            deep_tip[local] = id;
            continue;
        }
        let mut top1: Option<(f64, NodeId)> = None;
        let mut top2: Option<(f64, NodeId)> = None;
        for &child in indexed.children(id) {
            let child_local = child - offset;
            let via = depth[child_local] + indexed.length(child);
            let tip = deep_tip[child_local];
            match top1 {
                Some((d1, _)) if via <= d1 => match top2 {
                    Some((d2, _)) if via <= d2 => {}
                    _ => top2 = Some((via, tip)),
                },
                _ => {
                    top2 = top1;
                    top1 = Some((via, tip));
                }
            }
        }
        if let Some((d1, t1)) = top1 {
            depth[local] = d1;
            deep_tip[local] = t1;
            if let Some((d2, t2)) = top2 {
                let width = d1 + d2;
                let better = match best {
                    Some((best_width, _, _)) => width > best_width,
                    None => true,
                };
                if better {
                    best = Some((width, t1, t2));
                }
            }
        }
    }

    let (clade_width, tip_a, tip_b) = match best {
        Some((width, t1, t2)) => (width, t1, t2),
        // Single tip below (or the node itself is a tip).
        None => (0.0, deep_tip[node - offset], deep_tip[node - offset]),
    };

    Ok(CladeProfile {
        node_address: node,
        distance_to_root: indexed.distance_to_root(node),
        clade_width,
        maximally_divergent_tips: (tip_label(indexed, tip_a), tip_label(indexed, tip_b)),
    })
}

fn tip_label(indexed: &IndexedTree, id: NodeId) -> String {
    match indexed.name(id) {
        Some(name) => name.to_string(),
        None => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::parse_newick;
    use approx::assert_relative_eq;

    fn indexed(newick: &str) -> IndexedTree {
        IndexedTree::from_tree(&parse_newick(newick).unwrap()).unwrap()
    }

    #[test]
    fn test_internal_clade() {
        let tree = indexed("((1:0.1,2:0.1)5:0.2,(3:0.1,4:0.1)6:0.2)root;");
        let node = tree.id_of("6").unwrap();
        let profile = profile_clade(&tree, node).unwrap();
        assert_eq!(profile.node_address, 5);
        assert_relative_eq!(profile.distance_to_root, 0.2, epsilon = 1e-12);
        assert_relative_eq!(profile.clade_width, 0.2, epsilon = 1e-12);
        assert_eq!(
            profile.maximally_divergent_tips,
            ("3".to_string(), "4".to_string())
        );
    }

    #[test]
    fn test_root_clade_spans_both_sides() {
        let tree = indexed("((1:0.1,2:0.1)5:0.2,(3:0.1,4:0.1)6:0.2)root;");
        let profile = profile_clade(&tree, tree.root()).unwrap();
        assert_relative_eq!(profile.distance_to_root, 0.0, epsilon = 1e-12);
        assert_relative_eq!(profile.clade_width, 0.6, epsilon = 1e-12);
        assert_eq!(
            profile.maximally_divergent_tips,
            ("1".to_string(), "3".to_string())
        );
    }

    #[test]
    fn test_tip_profiles_to_itself() {
        let tree = indexed("((1:0.1,2:0.1)5:0.2,(3:0.1,4:0.1)6:0.2)root;");
        let node = tree.id_of("2").unwrap();
        let profile = profile_clade(&tree, node).unwrap();
        assert_relative_eq!(profile.distance_to_root, 0.3, epsilon = 1e-12);
        assert_relative_eq!(profile.clade_width, 0.0);
        assert_eq!(
            profile.maximally_divergent_tips,
            ("2".to_string(), "2".to_string())
        );
    }

    #[test]
    fn test_unary_chain_has_zero_width() {
        let tree = indexed("(((A:1)B:2)C:3)R;");
        let node = tree.id_of("C").unwrap();
        let profile = profile_clade(&tree, node).unwrap();
        assert_relative_eq!(profile.clade_width, 0.0);
        assert_eq!(
            profile.maximally_divergent_tips,
            ("A".to_string(), "A".to_string())
        );
        assert_relative_eq!(profile.distance_to_root, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_width_found_below_uneven_clade() {
        // Deepest pair lives under x, not at the profiled node y.
        let tree = indexed("(((a:3,b:4)x:0.1,c:0.2)y:1,d:1)r;");
        let node = tree.id_of("y").unwrap();
        let profile = profile_clade(&tree, node).unwrap();
        assert_relative_eq!(profile.clade_width, 7.0, epsilon = 1e-12);
        assert_eq!(
            profile.maximally_divergent_tips,
            ("b".to_string(), "a".to_string())
        );
    }

    #[test]
    fn test_unnamed_tip_labeled_by_id() {
        let tree = indexed("(A:2,):1;");
        let profile = profile_clade(&tree, tree.root()).unwrap();
        assert_relative_eq!(profile.clade_width, 2.0, epsilon = 1e-12);
        assert_eq!(
            profile.maximally_divergent_tips,
            ("A".to_string(), "1".to_string())
        );
    }

    #[test]
    fn test_out_of_range_node() {
        let tree = indexed("(A:1,B:2)r;");
        assert!(matches!(
            profile_clade(&tree, 10),
            Err(UniFracError::InvalidParameter(_))
        ));
    }
}
