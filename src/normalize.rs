//! Mass normalization for the UniFrac metric family.
//!
//! The earth-mover formulation compares two mass distributions over the
//! tree, so each metric is a rule for turning raw abundances into masses.
//! Weighted UniFrac total-sum scales each sample to unit mass. Unweighted
//! UniFrac places equal mass on every present feature and divides by the
//! tree's total branch length up front, which makes the earth-mover total
//! equal the classical unweighted ratio without a second pass.

use crate::error::{Result, UniFracError};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// UniFrac metric variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// Abundance-weighted: mass proportional to relative abundance.
    Weighted,
    /// Presence/absence: equal mass on every present feature.
    Unweighted,
}

impl Metric {
    /// Get the descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Weighted => "weighted",
            Self::Unweighted => "unweighted",
        }
    }
}

impl FromStr for Metric {
    type Err = UniFracError;

    /// Accepts the short names and their `_unifrac`-suffixed aliases.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "weighted" | "weighted_unifrac" => Ok(Self::Weighted),
            "unweighted" | "unweighted_unifrac" => Ok(Self::Unweighted),
            other => Err(UniFracError::UnsupportedMetric(other.to_string())),
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalize a pair of raw abundance vectors into mass vectors.
///
/// Abundances are assumed non-negative; the table loader enforces this
/// for file inputs.
///
/// # Formula
/// * Weighted: `u_i / sum(u)` per vector. A vector with zero total mass
///   cannot be scaled and fails `DivisionUndefined`.
/// * Unweighted: `1[u_i > 0] / L` where `L` is `total_branch_length`.
///   `L` is required (`MissingParameter`) and must be nonzero
///   (`DivisionUndefined`); weighted normalization ignores it.
///
/// # Arguments
/// * `u`, `v` - Raw abundances over the same features, in the same order
/// * `metric` - Metric variant selecting the rule
/// * `total_branch_length` - Sum of the tree's non-root branch lengths,
///   only consulted for the unweighted metric
pub fn normalize_pair(
    u: &DVector<f64>,
    v: &DVector<f64>,
    metric: Metric,
    total_branch_length: Option<f64>,
) -> Result<(DVector<f64>, DVector<f64>)> {
    if u.len() != v.len() {
        return Err(UniFracError::DimensionMismatch {
            expected: u.len(),
            actual: v.len(),
        });
    }
    if u.is_empty() {
        return Err(UniFracError::EmptyData(
            "Cannot normalize empty abundance vectors".to_string(),
        ));
    }
    match metric {
        Metric::Weighted => Ok((tss(u, "first")?, tss(v, "second")?)),
        Metric::Unweighted => {
            let length = total_branch_length
                .ok_or(UniFracError::MissingParameter("total_branch_length"))?;
            if length == 0.0 {
                return Err(UniFracError::DivisionUndefined(
                    "total branch length is zero".to_string(),
                ));
            }
            Ok((presence(u, length), presence(v, length)))
        }
    }
}

/// Total-sum scale one vector to unit mass.
fn tss(weights: &DVector<f64>, which: &str) -> Result<DVector<f64>> {
    let total = weights.sum();
    if total == 0.0 {
        return Err(UniFracError::DivisionUndefined(format!(
            "{} vector has zero total abundance",
            which
        )));
    }
    Ok(weights.unscale(total))
}

/// Presence indicator scaled by the reciprocal total branch length.
fn presence(weights: &DVector<f64>, total_branch_length: f64) -> DVector<f64> {
    weights.map(|w| if w > 0.0 { 1.0 / total_branch_length } else { 0.0 })
}
