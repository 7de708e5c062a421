//! Earth-mover kernel for UniFrac distances.
//!
//! On a tree metric the optimal transport plan is forced: mass below an
//! edge that is not matched below it must cross that edge, so the
//! distance is the sum over non-root edges of branch length times the
//! absolute net mass imbalance in the subtree under the edge. One
//! postorder sweep computes every imbalance, which also yields the
//! signed per-edge decomposition for free.

use crate::data::EmdResult;
use crate::error::{Result, UniFracError};
use crate::tree::{IndexedTree, NodeId};
use nalgebra::DVector;
use std::collections::BTreeMap;

/// Run the earth-mover pass for one pair of mass vectors.
///
/// `feature_ids[k]` is the node carrying mass `u[k]` / `v[k]`; ids may
/// address internal nodes as well as tips, and repeated ids accumulate.
/// The vectors are used as given; apply
/// [`normalize_pair`](crate::normalize::normalize_pair) first to compute
/// a particular UniFrac variant.
///
/// The sweep iterates ids in ascending order, which is postorder: each
/// node's net mass is moved into its parent's slot, the edge records
/// `length * net` when the net is nonzero, and `length * |net|` joins
/// the distance. The root absorbs any residual (zero for equal-mass
/// inputs) and contributes no edge.
pub fn emd_single_pair(
    indexed: &IndexedTree,
    feature_ids: &[NodeId],
    u: &DVector<f64>,
    v: &DVector<f64>,
) -> Result<EmdResult> {
    if u.len() != v.len() {
        return Err(UniFracError::DimensionMismatch {
            expected: u.len(),
            actual: v.len(),
        });
    }
    if feature_ids.len() != u.len() {
        return Err(UniFracError::DimensionMismatch {
            expected: feature_ids.len(),
            actual: u.len(),
        });
    }
    let n = indexed.node_count();
    for &id in feature_ids {
        if id >= n {
            return Err(UniFracError::InvalidParameter(format!(
                "node id {} out of range for a tree of {} nodes",
                id, n
            )));
        }
    }

    let mut partial_sums = vec![0.0_f64; n];
    for (k, &id) in feature_ids.iter().enumerate() {
        partial_sums[id] += u[k] - v[k];
    }

    let mut distance = 0.0;
    let mut differential_abundance = BTreeMap::new();
    for id in 0..indexed.root() {
        let val = partial_sums[id];
        if let Some(parent) = indexed.parent(id) {
            partial_sums[parent] += val;
        }
        let length = indexed.length(id);
        if val != 0.0 {
            differential_abundance.insert(id, length * val);
        }
        distance += length * val.abs();
    }

    Ok(EmdResult {
        distance,
        differential_abundance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::parse_newick;
    use approx::assert_relative_eq;

    fn indexed(newick: &str) -> IndexedTree {
        IndexedTree::from_tree(&parse_newick(newick).unwrap()).unwrap()
    }

    fn placed_ids(indexed: &IndexedTree, names: &[&str]) -> Vec<NodeId> {
        let owned: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        indexed.ids_for_names(&owned).unwrap()
    }

    /// Net subtree masses recomputed directly from the seeds, for
    /// checking the sweep against the definition.
    fn subtree_nets(indexed: &IndexedTree, ids: &[NodeId], u: &DVector<f64>, v: &DVector<f64>) -> Vec<f64> {
        let mut seeds = vec![0.0; indexed.node_count()];
        for (k, &id) in ids.iter().enumerate() {
            seeds[id] += u[k] - v[k];
        }
        (0..indexed.node_count())
            .map(|id| indexed.subtree_range(id).map(|j| seeds[j]).sum())
            .collect()
    }

    #[test]
    fn test_weighted_distance_with_internal_mass() {
        let tree = indexed("((1:0.1,2:0.1)5:0.2,(3:0.1,4:0.1)6:0.2)root;");
        let ids = placed_ids(&tree, &["1", "2", "3", "4", "6"]);
        let u = DVector::from_vec(vec![0.0, 0.5, 0.5, 0.0, 0.0]);
        let v = DVector::from_vec(vec![1.0 / 3.0, 0.0, 0.0, 1.0 / 3.0, 1.0 / 3.0]);
        let result = emd_single_pair(&tree, &ids, &u, &v).unwrap();
        assert_relative_eq!(result.distance, 0.2333333, epsilon = 1e-6);

        let map = &result.differential_abundance;
        assert_eq!(map.len(), 6);
        assert_relative_eq!(map[&0], -0.1 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(map[&1], 0.05, epsilon = 1e-12);
        assert_relative_eq!(map[&2], 0.2 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(map[&3], 0.05, epsilon = 1e-12);
        assert_relative_eq!(map[&4], -0.1 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(map[&5], -0.2 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_weighted_distance_disjoint_halves() {
        let tree = indexed("((1:0.2,2:0.1)5:0.3,(3:0.1,4:0.2)6:0.3)root;");
        let ids = placed_ids(&tree, &["1", "2", "3", "4"]);
        let u = DVector::from_vec(vec![0.25, 0.25, 0.25, 0.25]);
        let v = DVector::from_vec(vec![0.5, 0.5, 0.0, 0.0]);
        let result = emd_single_pair(&tree, &ids, &u, &v).unwrap();
        assert_relative_eq!(result.distance, 0.45, epsilon = 1e-6);
    }

    #[test]
    fn test_presence_masses_author_tree() {
        // Raw presence masses with unequal totals; the root absorbs the
        // surplus and the distance counts only non-root edges.
        let tree = indexed("(B:0.1,C:0.2)root;");
        let ids = placed_ids(&tree, &["B", "C"]);
        let u = DVector::from_vec(vec![1.0, 1.0]);
        let v = DVector::from_vec(vec![1.0, 0.0]);
        let result = emd_single_pair(&tree, &ids, &u, &v).unwrap();
        assert_relative_eq!(result.distance, 0.2, epsilon = 1e-12);
        assert_eq!(result.differential_abundance.len(), 1);
        assert_relative_eq!(result.differential_abundance[&1], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_identical_vectors_give_zero() {
        let tree = indexed("((1:0.1,2:0.1)5:0.2,(3:0.1,4:0.1)6:0.2)root;");
        let ids = placed_ids(&tree, &["1", "2", "3", "4"]);
        let u = DVector::from_vec(vec![0.25, 0.25, 0.25, 0.25]);
        let result = emd_single_pair(&tree, &ids, &u, &u).unwrap();
        assert_relative_eq!(result.distance, 0.0);
        assert!(result.differential_abundance.is_empty());
    }

    #[test]
    fn test_swapping_inputs_negates_entries() {
        let tree = indexed("((1:0.1,2:0.1)5:0.2,(3:0.1,4:0.1)6:0.2)root;");
        let ids = placed_ids(&tree, &["1", "2", "3", "4", "6"]);
        let u = DVector::from_vec(vec![0.0, 0.5, 0.5, 0.0, 0.0]);
        let v = DVector::from_vec(vec![1.0 / 3.0, 0.0, 0.0, 1.0 / 3.0, 1.0 / 3.0]);
        let forward = emd_single_pair(&tree, &ids, &u, &v).unwrap();
        let backward = emd_single_pair(&tree, &ids, &v, &u).unwrap();
        assert_relative_eq!(forward.distance, backward.distance, epsilon = 1e-12);
        assert_eq!(
            forward.differential_abundance.len(),
            backward.differential_abundance.len()
        );
        for (id, value) in &forward.differential_abundance {
            assert_relative_eq!(
                backward.differential_abundance[id],
                -value,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_sweep_matches_subtree_definition() {
        let tree = indexed("(((a:0.7,b:0.1)x:0.4,c:0.9)y:0.2,(d:0.3,e:0.8)z:0.6)r;");
        let ids = placed_ids(&tree, &["a", "b", "c", "d", "e"]);
        let u = DVector::from_vec(vec![0.1, 0.0, 0.4, 0.3, 0.2]);
        let v = DVector::from_vec(vec![0.0, 0.5, 0.1, 0.0, 0.4]);
        let result = emd_single_pair(&tree, &ids, &u, &v).unwrap();

        let nets = subtree_nets(&tree, &ids, &u, &v);
        let mut expected_distance = 0.0;
        for id in 0..tree.root() {
            expected_distance += tree.length(id) * nets[id].abs();
            match result.differential_abundance.get(&id) {
                Some(&value) => {
                    assert_relative_eq!(value, tree.length(id) * nets[id], epsilon = 1e-12)
                }
                None => assert_relative_eq!(nets[id], 0.0, epsilon = 1e-12),
            }
        }
        assert_relative_eq!(result.distance, expected_distance, epsilon = 1e-12);
        // Equal total mass, so the root absorbs nothing.
        assert_relative_eq!(nets[tree.root()], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_repeated_ids_accumulate() {
        let tree = indexed("(B:0.1,C:0.2)root;");
        let b = tree.id_of("B").unwrap();
        let ids = vec![b, b];
        let u = DVector::from_vec(vec![0.25, 0.75]);
        let v = DVector::from_vec(vec![0.0, 0.0]);
        let result = emd_single_pair(&tree, &ids, &u, &v).unwrap();
        assert_relative_eq!(result.distance, 0.1, epsilon = 1e-12);
        assert_relative_eq!(result.differential_abundance[&b], 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_dimension_mismatches() {
        let tree = indexed("(B:0.1,C:0.2)root;");
        let ids = placed_ids(&tree, &["B", "C"]);
        let short = DVector::from_vec(vec![1.0]);
        let full = DVector::from_vec(vec![1.0, 0.0]);
        assert!(matches!(
            emd_single_pair(&tree, &ids, &short, &full),
            Err(UniFracError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            emd_single_pair(&tree, &ids[..1], &full, &full),
            Err(UniFracError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_out_of_range_id() {
        let tree = indexed("(B:0.1,C:0.2)root;");
        let ids = vec![99];
        let u = DVector::from_vec(vec![1.0]);
        assert!(matches!(
            emd_single_pair(&tree, &ids, &u, &u),
            Err(UniFracError::InvalidParameter(_))
        ));
    }
}
