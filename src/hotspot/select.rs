//! Hotspot selection over a per-edge decomposition.

use crate::tree::NodeId;
use std::collections::BTreeMap;

/// Pick the edge with the most extreme differential abundance.
///
/// The map is scanned in ascending id order with a strict comparison, so
/// equal magnitudes resolve to the smallest node id. Zero-valued entries
/// (possible on zero-length branches) never win; when nothing is nonzero
/// there is no hotspot and the result is `None`.
pub fn select_hotspot(differential_abundance: &BTreeMap<NodeId, f64>) -> Option<NodeId> {
    let mut max_magnitude = 0.0;
    let mut hotspot = None;
    for (&id, &value) in differential_abundance {
        if value.abs() > max_magnitude {
            max_magnitude = value.abs();
            hotspot = Some(id);
        }
    }
    hotspot
}
