//! Feature table with sparse storage for microbiome abundance data.

use crate::error::{Result, UniFracError};
use crate::source::Source;
use nalgebra::DVector;
use rayon::prelude::*;
use sprs::{CsMat, TriMat};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A sparse abundance table across samples.
///
/// Rows represent features (taxa/genes), columns represent samples.
/// Uses CSR (Compressed Sparse Row) format; abundances are `f64` so both
/// raw counts and pre-normalized relative abundances fit. Values must be
/// finite and non-negative, which the TSV loader enforces.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    /// Sparse matrix in CSR format (features × samples)
    data: CsMat<f64>,
    /// Feature identifiers (row names)
    feature_ids: Vec<String>,
    /// Sample identifiers (column names)
    sample_ids: Vec<String>,
}

impl FeatureTable {
    /// Create a new FeatureTable from a sparse matrix and identifiers.
    pub fn new(
        data: CsMat<f64>,
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != feature_ids.len() {
            return Err(UniFracError::DimensionMismatch {
                expected: nrows,
                actual: feature_ids.len(),
            });
        }
        if ncols != sample_ids.len() {
            return Err(UniFracError::DimensionMismatch {
                expected: ncols,
                actual: sample_ids.len(),
            });
        }
        Ok(Self {
            data,
            feature_ids,
            sample_ids,
        })
    }

    /// Load a feature table from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with sample IDs (first column is feature ID header)
    /// - Subsequent rows: feature ID followed by abundances
    ///
    /// Feature and sample identifiers must be unique. Cells that do not
    /// parse as finite non-negative numbers are rejected with their row
    /// and column position. Missing trailing cells read as zero.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        // Parse header
        let header_line = lines
            .next()
            .ok_or_else(|| UniFracError::EmptyData("Empty TSV file".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').collect();
        if header.len() < 2 {
            return Err(UniFracError::EmptyData(
                "TSV must have at least one sample".to_string(),
            ));
        }
        let sample_ids: Vec<String> = header[1..].iter().map(|s| s.to_string()).collect();
        let n_samples = sample_ids.len();
        let mut seen_samples = HashSet::new();
        for sample_id in &sample_ids {
            if !seen_samples.insert(sample_id.as_str()) {
                return Err(UniFracError::InvalidParameter(format!(
                    "Duplicate sample id '{}' in header",
                    sample_id
                )));
            }
        }

        // Parse data rows into triplets for sparse matrix construction
        let mut triplets: Vec<(usize, usize, f64)> = Vec::new();
        let mut feature_ids: Vec<String> = Vec::new();
        let mut seen_features = HashSet::new();

        for line_result in lines {
            let line = line_result?;
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();

            let feature_id = fields[0].to_string();
            if !seen_features.insert(feature_id.clone()) {
                return Err(UniFracError::InvalidParameter(format!(
                    "Duplicate feature id '{}'",
                    feature_id
                )));
            }
            let row_idx = feature_ids.len();
            feature_ids.push(feature_id);

            for (col_idx, value_str) in fields[1..].iter().enumerate() {
                if col_idx >= n_samples {
                    break;
                }
                let value: f64 = value_str.trim().parse().map_err(|_| {
                    UniFracError::InvalidAbundance {
                        value: value_str.to_string(),
                        row: row_idx,
                        col: col_idx,
                    }
                })?;
                if !value.is_finite() || value < 0.0 {
                    return Err(UniFracError::InvalidAbundance {
                        value: value_str.to_string(),
                        row: row_idx,
                        col: col_idx,
                    });
                }
                if value > 0.0 {
                    triplets.push((row_idx, col_idx, value));
                }
            }
        }

        let n_features = feature_ids.len();
        if n_features == 0 {
            return Err(UniFracError::EmptyData("No features in TSV".to_string()));
        }

        // Build sparse matrix from triplets
        let mut tri_mat = TriMat::new((n_features, n_samples));
        for (row, col, val) in triplets {
            tri_mat.add_triplet(row, col, val);
        }
        let data: CsMat<f64> = tri_mat.to_csr();

        Self::new(data, feature_ids, sample_ids)
    }

    /// Resolve a tagged input into a table, loading TSV from a path.
    pub fn from_source(source: Source<FeatureTable>) -> Result<Self> {
        source.resolve_with("table", |path| FeatureTable::from_tsv(path))
    }

    /// Write the feature table to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        // Write header
        write!(writer, "feature_id")?;
        for sample_id in &self.sample_ids {
            write!(writer, "\t{}", sample_id)?;
        }
        writeln!(writer)?;

        // Write data rows
        for (row_idx, feature_id) in self.feature_ids.iter().enumerate() {
            write!(writer, "{}", feature_id)?;
            for col_idx in 0..self.n_samples() {
                let value = self.get(row_idx, col_idx);
                write!(writer, "\t{}", value)?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }

    /// Get the value at (row, col), returning 0.0 for missing entries.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data.get(row, col).copied().unwrap_or(0.0)
    }

    /// Number of features (rows).
    #[inline]
    pub fn n_features(&self) -> usize {
        self.data.rows()
    }

    /// Number of samples (columns).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.cols()
    }

    /// Total number of non-zero entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.data.nnz()
    }

    /// Feature identifiers.
    #[inline]
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Sample identifiers.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Column index of a sample id.
    pub fn sample_index(&self, sample_id: &str) -> Result<usize> {
        self.sample_ids
            .iter()
            .position(|s| s == sample_id)
            .ok_or_else(|| UniFracError::SampleNotFound(sample_id.to_string()))
    }

    /// Dense abundances of one column (sample), in feature row order.
    pub fn column(&self, col: usize) -> DVector<f64> {
        let mut dense = DVector::zeros(self.n_features());
        for (row, row_vec) in self.data.outer_iterator().enumerate() {
            if let Some(&val) = row_vec.get(col) {
                dense[row] = val;
            }
        }
        dense
    }

    /// Dense abundances for a sample looked up by id.
    pub fn sample_vector(&self, sample_id: &str) -> Result<DVector<f64>> {
        let col = self.sample_index(sample_id)?;
        Ok(self.column(col))
    }

    /// Compute per-feature totals across samples.
    pub fn feature_sums(&self) -> Vec<f64> {
        (0..self.n_features())
            .into_par_iter()
            .map(|row| {
                self.data
                    .outer_view(row)
                    .map(|v| v.iter().map(|(_, &val)| val).sum())
                    .unwrap_or(0.0)
            })
            .collect()
    }

    /// Compute per-sample totals (library sizes).
    pub fn sample_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.n_samples()];
        for row_vec in self.data.outer_iterator() {
            for (col, &val) in row_vec.iter() {
                sums[col] += val;
            }
        }
        sums
    }
}
