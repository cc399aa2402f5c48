//! Minimum cluster standard: enough sequence, or enough contigs.

use super::LowQualityPredicate;
use crate::error::{Error, Result};
use crate::hierarchy::{flat_node, flatten_nodes, max_scores, Combine, Dendrogram};

/// Total contig length below every node.
///
/// Nodes joined by equal-height merges report the total of their flattened
/// representative.
pub fn node_bp(z: &Dendrogram, lengths: &[u64]) -> Result<Vec<u64>> {
    let n = z.n_items();
    if lengths.len() != n {
        return Err(Error::DimensionMismatch {
            what: "contig lengths",
            expected: n,
            found: lengths.len(),
        });
    }
    let mut values = lengths.to_vec();
    values.resize(z.n_nodes(), 0);
    let totals = max_scores(z, &values, Combine::Add)?;
    let flat = flatten_nodes(z);
    Ok((0..z.n_nodes())
        .map(|node| totals[flat_node(z, &flat, node)])
        .collect())
}

/// Flags clusters that are too small to be reported as bins.
///
/// A node is low quality when its total length is below `min_size` (if set)
/// and its contig count is below `min_pts` (if set). At least one limit must
/// be set.
#[derive(Debug, Clone, Default)]
pub struct MinStandard {
    lengths: Vec<u64>,
    min_size: Option<u64>,
    min_pts: Option<usize>,
}

impl MinStandard {
    /// Predicate over contigs with the given lengths. No limit is set yet.
    pub fn new(lengths: Vec<u64>) -> Self {
        Self {
            lengths,
            min_size: None,
            min_pts: None,
        }
    }

    /// Require at least `min_size` bp.
    pub fn with_min_size(mut self, min_size: u64) -> Self {
        self.min_size = Some(min_size);
        self
    }

    /// Require at least `min_pts` contigs.
    pub fn with_min_pts(mut self, min_pts: usize) -> Self {
        self.min_pts = Some(min_pts);
        self
    }

    /// Set both limits from optional values.
    pub fn with_limits(mut self, min_size: Option<u64>, min_pts: Option<usize>) -> Self {
        self.min_size = min_size;
        self.min_pts = min_pts;
        self
    }
}

impl LowQualityPredicate for MinStandard {
    fn low_quality(&self, z: &Dendrogram) -> Result<Vec<bool>> {
        if self.min_size.is_none() && self.min_pts.is_none() {
            return Err(Error::config("min_size and min_pts cannot both be unset"));
        }
        let bp = node_bp(z, &self.lengths)?;
        let flat = flatten_nodes(z);
        Ok((0..z.n_nodes())
            .map(|node| {
                let small = self.min_size.map_or(true, |s| bp[node] < s);
                let few = self
                    .min_pts
                    .map_or(true, |p| z.size(flat_node(z, &flat, node)) < p);
                small && few
            })
            .collect())
    }
}
