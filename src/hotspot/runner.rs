//! Orchestration: from raw inputs to distances and hotspot profiles.
//!
//! Every entry point runs the same pipeline: resolve tagged inputs,
//! restrict the tree to the referenced features (failing fast on ids the
//! tree does not know), freeze it into postorder id space, normalize the
//! abundances for the requested metric, run the earth-mover pass, and
//! optionally profile the winning edge. All validation happens before
//! any traversal.

use crate::data::{EmdResult, FeatureTable, HotspotProfile, HotspotResultSet, PairHotspot};
use crate::emd::emd_single_pair;
use crate::error::{Result, UniFracError};
use crate::hotspot::clade::profile_clade;
use crate::hotspot::select::select_hotspot;
use crate::normalize::{normalize_pair, Metric};
use crate::source::Source;
use crate::tree::{IndexedTree, NodeId, Tree};
use nalgebra::DVector;
use rayon::prelude::*;
use std::collections::HashMap;

/// Reusable per-batch state: the restricted, postorder-indexed tree and
/// the node placement of every feature.
struct PairContext {
    indexed: IndexedTree,
    feature_ids: Vec<NodeId>,
    total_branch_length: f64,
}

impl PairContext {
    /// Restrict the tree to the referenced features and index it.
    fn build(tree: &Tree, otu_ids: &[String]) -> Result<Self> {
        let restricted = tree.restrict(otu_ids)?;
        let indexed = IndexedTree::from_tree(&restricted)?;
        let feature_ids = indexed.ids_for_names(otu_ids)?;
        let total_branch_length = indexed.total_branch_length();
        Ok(Self {
            indexed,
            feature_ids,
            total_branch_length,
        })
    }

    /// Normalize one pair of raw abundance vectors and run the
    /// earth-mover pass.
    fn run_pair(&self, u: &DVector<f64>, v: &DVector<f64>, metric: Metric) -> Result<EmdResult> {
        let (nu, nv) = normalize_pair(u, v, metric, Some(self.total_branch_length))?;
        emd_single_pair(&self.indexed, &self.feature_ids, &nu, &nv)
    }

    /// Select and profile the hotspot edge of a decomposition, `None`
    /// when the samples are indistinguishable under the tree metric.
    fn profile(&self, emd: &EmdResult) -> Result<Option<HotspotProfile>> {
        let node = match select_hotspot(&emd.differential_abundance) {
            Some(node) => node,
            None => return Ok(None),
        };
        let clade = profile_clade(&self.indexed, node)?;
        let value = emd
            .differential_abundance
            .get(&node)
            .copied()
            .unwrap_or(0.0);
        let name = self.indexed.name(node).map(String::from);
        Ok(Some(HotspotProfile::new(clade, name, value)))
    }
}

fn single_pair(
    u_counts: &[f64],
    v_counts: &[f64],
    otu_ids: &[String],
    tree: Source<Tree>,
    metric: Metric,
) -> Result<(PairContext, EmdResult)> {
    if u_counts.len() != v_counts.len() {
        return Err(UniFracError::DimensionMismatch {
            expected: u_counts.len(),
            actual: v_counts.len(),
        });
    }
    if otu_ids.len() != u_counts.len() {
        return Err(UniFracError::DimensionMismatch {
            expected: otu_ids.len(),
            actual: u_counts.len(),
        });
    }
    let tree = Tree::from_source(tree)?;
    let context = PairContext::build(&tree, otu_ids)?;
    let u = DVector::from_column_slice(u_counts);
    let v = DVector::from_column_slice(v_counts);
    let emd = context.run_pair(&u, &v, metric)?;
    Ok((context, emd))
}

/// UniFrac distance and per-edge decomposition for one pair of samples.
///
/// `otu_ids[k]` names the tree node carrying `u_counts[k]` and
/// `v_counts[k]`; internal node names are valid targets. The tree is
/// restricted to the referenced names first, so ids unknown to the tree
/// fail with `InvalidTipSet` before any computation.
pub fn emd_unifrac(
    u_counts: &[f64],
    v_counts: &[f64],
    otu_ids: &[String],
    tree: Source<Tree>,
    metric: Metric,
) -> Result<EmdResult> {
    let (_, emd) = single_pair(u_counts, v_counts, otu_ids, tree, metric)?;
    Ok(emd)
}

/// Hotspot profile for one pair of samples.
///
/// Returns `None` when the pair is indistinguishable under the tree
/// metric (no edge carries net mass), the batch API's NA outcome.
pub fn hotspot(
    u_counts: &[f64],
    v_counts: &[f64],
    otu_ids: &[String],
    tree: Source<Tree>,
    metric: Metric,
) -> Result<Option<HotspotProfile>> {
    let (context, emd) = single_pair(u_counts, v_counts, otu_ids, tree, metric)?;
    context.profile(&emd)
}

/// Hotspot profiles for a batch of sample pairs against one table and
/// one tree.
///
/// The tree is restricted and indexed once; the pairs then fan out in
/// parallel, and results land in input order. Any failing pair aborts
/// the batch: unknown samples surface as `SampleNotFound` before the
/// fan-out, and a sample with zero total abundance fails weighted
/// normalization with `DivisionUndefined`.
pub fn hotspot_pairs(
    table: Source<FeatureTable>,
    tree: Source<Tree>,
    pairs: &[(String, String)],
    metric: Metric,
) -> Result<HotspotResultSet> {
    let table = FeatureTable::from_source(table)?;
    let tree = Tree::from_source(tree)?;
    let context = PairContext::build(&tree, table.feature_ids())?;

    // Extract each referenced sample's dense column once.
    let mut columns: HashMap<&str, DVector<f64>> = HashMap::new();
    for (sample_1, sample_2) in pairs {
        for sample in [sample_1, sample_2] {
            if !columns.contains_key(sample.as_str()) {
                columns.insert(sample.as_str(), table.sample_vector(sample)?);
            }
        }
    }

    let results = pairs
        .par_iter()
        .map(|(sample_1, sample_2)| {
            let u = columns
                .get(sample_1.as_str())
                .ok_or_else(|| UniFracError::SampleNotFound(sample_1.clone()))?;
            let v = columns
                .get(sample_2.as_str())
                .ok_or_else(|| UniFracError::SampleNotFound(sample_2.clone()))?;
            let emd = context.run_pair(u, v, metric)?;
            let hotspot = context.profile(&emd)?;
            Ok(PairHotspot {
                sample_1: sample_1.clone(),
                sample_2: sample_2.clone(),
                distance: emd.distance,
                hotspot,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(HotspotResultSet::new(metric.name().to_string(), results))
}
