//! Data structures for abundance tables and analysis results.

pub mod feature_table;
pub mod result;

pub use feature_table::FeatureTable;
pub use result::{
    CladeProfile, EmdResult, HotspotProfile, HotspotResultSet, HotspotSummary, PairHotspot,
};
