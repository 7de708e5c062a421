//! EMD-formulated UniFrac with hotspot profiling
//!
//! This library computes phylogenetic beta diversity between microbiome
//! samples through the earth-mover formulation of UniFrac: the distance
//! between two samples is the minimal work needed to move one sample's
//! mass into the other's along the tree. On a tree metric that optimum
//! has a closed form, so a single postorder sweep yields the distance
//! together with a signed per-edge decomposition telling which clades
//! moved the mass. The most extreme edge is the pair's "hotspot".
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **tree**: Arena tree, Newick I/O, and the postorder id index
//! - **data**: Feature tables (sparse abundance storage) and result records
//! - **source**: Tagged inputs that are paths or already-loaded values
//! - **normalize**: Metric selection and mass normalization
//! - **emd**: The earth-mover kernel (distance + decomposition)
//! - **hotspot**: Edge selection, clade profiling, and orchestration
//!
//! # Example
//!
//! ```
//! use unifrac_hotspot::prelude::*;
//!
//! let tree = parse_newick("((1:0.1,2:0.1)5:0.2,(3:0.1,4:0.1)6:0.2)root;").unwrap();
//! let otu_ids: Vec<String> = ["1", "2", "3", "4"].iter().map(|s| s.to_string()).collect();
//!
//! let profile = hotspot(
//!     &[0.0, 4.0, 4.0, 0.0],
//!     &[3.0, 0.0, 0.0, 3.0],
//!     &otu_ids,
//!     Source::loaded(tree),
//!     Metric::Weighted,
//! )
//! .unwrap()
//! .unwrap();
//!
//! println!(
//!     "hotspot at node {} ({} in the first sample)",
//!     profile.node_address,
//!     if profile.differential_abundance > 0.0 { "elevated" } else { "depleted" },
//! );
//! ```

pub mod data;
pub mod emd;
pub mod error;
pub mod hotspot;
pub mod normalize;
pub mod source;
pub mod tree;

pub use error::{Result, UniFracError};

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::data::{
        CladeProfile, EmdResult, FeatureTable, HotspotProfile, HotspotResultSet, HotspotSummary,
        PairHotspot,
    };
    pub use crate::emd::emd_single_pair;
    pub use crate::error::{Result, UniFracError};
    pub use crate::hotspot::{emd_unifrac, hotspot, hotspot_pairs, profile_clade, select_hotspot};
    pub use crate::normalize::{normalize_pair, Metric};
    pub use crate::source::Source;
    pub use crate::tree::{
        parse_newick, read_newick_file, write_newick, IndexedTree, NodeId, Tree,
    };
}
