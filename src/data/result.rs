//! Result types for UniFrac distances and hotspot profiles.

use crate::error::Result;
use crate::tree::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Outcome of one earth-mover pass over a pair of mass vectors.
///
/// `distance` is the UniFrac distance. `differential_abundance` maps each
/// node id to the signed, branch-length-weighted net mass that crossed
/// the edge above it: positive entries mark clades elevated in the first
/// sample, negative in the second. Edges with zero net mass are absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmdResult {
    pub distance: f64,
    pub differential_abundance: BTreeMap<NodeId, f64>,
}

impl EmdResult {
    /// Entries sorted by decreasing magnitude; ties keep ascending id
    /// order, matching the selection rule.
    pub fn entries_by_magnitude(&self) -> Vec<(NodeId, f64)> {
        let mut entries: Vec<(NodeId, f64)> = self
            .differential_abundance
            .iter()
            .map(|(&id, &value)| (id, value))
            .collect();
        entries.sort_by(|a, b| {
            b.1.abs()
                .partial_cmp(&a.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        entries
    }
}

/// Shape of the clade hanging below a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CladeProfile {
    /// Postorder id of the clade's root node.
    pub node_address: NodeId,
    /// Branch length summed along the path to the tree root.
    pub distance_to_root: f64,
    /// Largest tip-to-tip distance within the clade.
    pub clade_width: f64,
    /// The two tips realizing `clade_width`; a tip clade names itself
    /// twice with width zero.
    pub maximally_divergent_tips: (String, String),
}

/// The edge with the most extreme differential abundance for one pair of
/// samples, merged with the profile of the clade below it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotspotProfile {
    /// Postorder id of the node below the hotspot edge.
    pub node_address: NodeId,
    /// Name of that node, when it has one.
    pub node_name: Option<String>,
    /// Signed branch-length-weighted net mass across the hotspot edge.
    pub differential_abundance: f64,
    /// Branch length summed along the path to the tree root.
    pub distance_to_root: f64,
    /// Largest tip-to-tip distance within the clade.
    pub clade_width: f64,
    /// The two tips realizing `clade_width`.
    pub maximally_divergent_tips: (String, String),
}

impl HotspotProfile {
    /// Merge a clade profile with the hotspot's identity and signed value.
    pub fn new(
        clade: CladeProfile,
        node_name: Option<String>,
        differential_abundance: f64,
    ) -> Self {
        Self {
            node_address: clade.node_address,
            node_name,
            differential_abundance,
            distance_to_root: clade.distance_to_root,
            clade_width: clade.clade_width,
            maximally_divergent_tips: clade.maximally_divergent_tips,
        }
    }
}

impl std::fmt::Display for HotspotProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.node_name {
            Some(name) => writeln!(f, "Hotspot node: {} (id {})", name, self.node_address)?,
            None => writeln!(f, "Hotspot node: id {}", self.node_address)?,
        }
        writeln!(f, "Differential abundance: {:.6}", self.differential_abundance)?;
        writeln!(f, "Distance to root: {:.6}", self.distance_to_root)?;
        writeln!(f, "Clade width: {:.6}", self.clade_width)?;
        writeln!(
            f,
            "Maximally divergent tips: {}, {}",
            self.maximally_divergent_tips.0, self.maximally_divergent_tips.1
        )?;
        Ok(())
    }
}

/// Result for one sample pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairHotspot {
    /// First sample identifier.
    pub sample_1: String,
    /// Second sample identifier.
    pub sample_2: String,
    /// UniFrac distance between the two samples.
    pub distance: f64,
    /// Hotspot profile, absent when the samples are indistinguishable
    /// under the tree metric.
    pub hotspot: Option<HotspotProfile>,
}

impl PairHotspot {
    /// Sample the hotspot clade is elevated in, by sign of the
    /// differential abundance.
    pub fn elevated_in(&self) -> Option<&str> {
        self.hotspot.as_ref().map(|h| {
            if h.differential_abundance > 0.0 {
                self.sample_1.as_str()
            } else {
                self.sample_2.as_str()
            }
        })
    }
}

/// Collection of pair results, in input pair order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotspotResultSet {
    /// Metric name used to generate these results.
    pub metric: String,
    /// Individual results for each sample pair.
    pub results: Vec<PairHotspot>,
}

impl HotspotResultSet {
    /// Create a new result set.
    pub fn new(metric: String, results: Vec<PairHotspot>) -> Self {
        Self { metric, results }
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Iterate over pair results.
    pub fn iter(&self) -> impl Iterator<Item = &PairHotspot> {
        self.results.iter()
    }

    /// Count outcomes and summarize the distance distribution.
    pub fn summary(&self) -> HotspotSummary {
        let with_hotspot = self.results.iter().filter(|r| r.hotspot.is_some()).count();
        let max_distance = self
            .results
            .iter()
            .map(|r| r.distance)
            .fold(0.0_f64, f64::max);
        let mean_distance = if self.results.is_empty() {
            0.0
        } else {
            self.results.iter().map(|r| r.distance).sum::<f64>() / self.results.len() as f64
        };
        HotspotSummary {
            total_pairs: self.len(),
            with_hotspot,
            without_hotspot: self.len() - with_hotspot,
            mean_distance,
            max_distance,
        }
    }

    /// Write results to a TSV file. Pairs without a hotspot carry NA in
    /// the profile columns.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        // Header
        writeln!(
            writer,
            "sample_1\tsample_2\tdistance\tnode_id\tnode_name\tdifferential_abundance\televated_in\tdistance_to_root\tclade_width\ttip_1\ttip_2"
        )?;

        // Data rows
        for r in &self.results {
            match &r.hotspot {
                Some(h) => writeln!(
                    writer,
                    "{}\t{}\t{:.6}\t{}\t{}\t{:.6}\t{}\t{:.6}\t{:.6}\t{}\t{}",
                    r.sample_1,
                    r.sample_2,
                    r.distance,
                    h.node_address,
                    h.node_name.as_deref().unwrap_or("NA"),
                    h.differential_abundance,
                    r.elevated_in().unwrap_or("NA"),
                    h.distance_to_root,
                    h.clade_width,
                    h.maximally_divergent_tips.0,
                    h.maximally_divergent_tips.1
                )?,
                None => writeln!(
                    writer,
                    "{}\t{}\t{:.6}\tNA\tNA\tNA\tNA\tNA\tNA\tNA\tNA",
                    r.sample_1, r.sample_2, r.distance
                )?,
            }
        }

        Ok(())
    }
}

/// Summary statistics for a result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotspotSummary {
    pub total_pairs: usize,
    pub with_hotspot: usize,
    pub without_hotspot: usize,
    pub mean_distance: f64,
    pub max_distance: f64,
}

impl std::fmt::Display for HotspotSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Pairs analyzed: {}", self.total_pairs)?;
        writeln!(f, "With hotspot:    {}", self.with_hotspot)?;
        writeln!(f, "Without hotspot: {}", self.without_hotspot)?;
        writeln!(f, "Mean distance: {:.6}", self.mean_distance)?;
        writeln!(f, "Max distance:  {:.6}", self.max_distance)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::fs;
    use tempfile::NamedTempFile;

    fn create_test_profile(value: f64) -> HotspotProfile {
        HotspotProfile::new(
            CladeProfile {
                node_address: 5,
                distance_to_root: 0.2,
                clade_width: 0.4,
                maximally_divergent_tips: ("3".to_string(), "4".to_string()),
            },
            Some("6".to_string()),
            value,
        )
    }

    #[test]
    fn test_entries_by_magnitude() {
        let mut map = BTreeMap::new();
        map.insert(0, -0.5);
        map.insert(1, 0.3);
        map.insert(2, 0.5);
        let result = EmdResult {
            distance: 1.3,
            differential_abundance: map,
        };
        let entries = result.entries_by_magnitude();
        // Tie between |−0.5| and |0.5| keeps ascending id order.
        assert_eq!(entries[0].0, 0);
        assert_eq!(entries[1].0, 2);
        assert_eq!(entries[2].0, 1);
    }

    #[test]
    fn test_elevated_in_follows_sign() {
        let positive = PairHotspot {
            sample_1: "T1".to_string(),
            sample_2: "T2".to_string(),
            distance: 0.1,
            hotspot: Some(create_test_profile(0.05)),
        };
        assert_eq!(positive.elevated_in(), Some("T1"));

        let negative = PairHotspot {
            hotspot: Some(create_test_profile(-0.05)),
            ..positive.clone()
        };
        assert_eq!(negative.elevated_in(), Some("T2"));

        let none = PairHotspot {
            hotspot: None,
            ..positive
        };
        assert_eq!(none.elevated_in(), None);
    }

    #[test]
    fn test_summary_counts() {
        let set = HotspotResultSet::new(
            "weighted".to_string(),
            vec![
                PairHotspot {
                    sample_1: "a".into(),
                    sample_2: "b".into(),
                    distance: 0.4,
                    hotspot: Some(create_test_profile(0.1)),
                },
                PairHotspot {
                    sample_1: "a".into(),
                    sample_2: "a".into(),
                    distance: 0.0,
                    hotspot: None,
                },
            ],
        );
        let summary = set.summary();
        assert_eq!(summary.total_pairs, 2);
        assert_eq!(summary.with_hotspot, 1);
        assert_eq!(summary.without_hotspot, 1);
        assert_relative_eq!(summary.mean_distance, 0.2);
        assert_relative_eq!(summary.max_distance, 0.4);
    }

    #[test]
    fn test_to_tsv_with_na_rows() {
        let set = HotspotResultSet::new(
            "weighted".to_string(),
            vec![
                PairHotspot {
                    sample_1: "a".into(),
                    sample_2: "b".into(),
                    distance: 0.233333,
                    hotspot: Some(create_test_profile(-0.033333)),
                },
                PairHotspot {
                    sample_1: "a".into(),
                    sample_2: "a".into(),
                    distance: 0.0,
                    hotspot: None,
                },
            ],
        );
        let temp_file = NamedTempFile::new().unwrap();
        set.to_tsv(temp_file.path()).unwrap();
        let text = fs::read_to_string(temp_file.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("sample_1\tsample_2\tdistance"));
        assert!(lines[1].contains("\t6\t"));
        assert!(lines[1].contains("\tb\t"));
        assert!(lines[2].ends_with("NA"));
    }

    #[test]
    fn test_json_roundtrip() {
        let set = HotspotResultSet::new(
            "unweighted".to_string(),
            vec![PairHotspot {
                sample_1: "a".into(),
                sample_2: "b".into(),
                distance: 0.5,
                hotspot: Some(create_test_profile(0.25)),
            }],
        );
        let json = serde_json::to_string(&set).unwrap();
        let back: HotspotResultSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back.metric, "unweighted");
        let hotspot = back.results[0].hotspot.as_ref().unwrap();
        assert_eq!(hotspot.node_address, 5);
        assert_relative_eq!(hotspot.differential_abundance, 0.25);
    }
}
