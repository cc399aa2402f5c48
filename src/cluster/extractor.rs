//! Flat clusters from a scored dendrogram.
//!
//! The extractor picks a flat cut of the dendrogram that:
//! 1. reports only clusters meeting a minimum standard;
//! 2. uses the fewest clusters that reach the best total score;
//! 3. then covers as many leaves as possible.
//!
//! ## Stages
//!
//! **Support.** For every internal node, `support = score(node) - best(below)`
//! where `best(below)` is the best summed score of disjoint clusters under it.
//! Positive support favours keeping the node whole.
//!
//! **Conservative bins.** Merge upward while support is positive. This is the
//! minimal set of clusters with maximal summed score.
//!
//! **Seeds.** Clusters outside the conservative bins that meet the standard
//! and sit directly under a node whose support is below `-support_tol`, i.e.
//! where splitting is clearly better than merging.
//!
//! **Growth.** Merge upward while a node holds at most one seed, so remaining
//! material is absorbed without joining two seeds.
//!
//! Equal-height merge chains are treated as one multi-way node throughout:
//! duplicates take the lowest score and inherit their representative's support
//! and low-quality flag.

use crate::error::{Error, Result};
use crate::hierarchy::{
    descendants, fcluster_merge, flatten_nodes, max_scores_below, Combine, Dendrogram,
};
use crate::quality::{ClusterScorer, LowQualityPredicate};

/// Flat cluster extraction settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatClusterExtractor {
    /// Support below `-support_tol` marks a node's children as seeds.
    support_tol: f64,
}

impl Default for FlatClusterExtractor {
    fn default() -> Self {
        Self { support_tol: 0.0 }
    }
}

/// Everything computed by [`FlatClusterExtractor::extract`].
#[derive(Debug, Clone, PartialEq)]
pub struct FlatClusters {
    /// Bin of each leaf; 0 is unbinned, bins are numbered `1..=k`.
    pub bins: Vec<usize>,
    /// Cluster root of each leaf, before dissolving.
    pub leaders: Vec<usize>,
    /// Low-quality flag of each node after tie remapping.
    pub low_quality: Vec<bool>,
    /// Support of each internal node, one entry per merge row.
    pub support: Vec<f64>,
    /// Node scores after tie remapping.
    pub scores: Vec<f64>,
    /// Seed flag of each node.
    pub seeds: Vec<bool>,
    /// Conservative bin of each leaf.
    pub conservative_bins: Vec<usize>,
    /// Conservative cluster root of each leaf.
    pub conservative_leaders: Vec<usize>,
}

impl FlatClusters {
    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.bins.iter().copied().max().unwrap_or(0)
    }

    /// Leaves assigned to `bin`.
    pub fn members(&self, bin: usize) -> Vec<usize> {
        self.bins
            .iter()
            .enumerate()
            .filter_map(|(leaf, &b)| (b == bin).then_some(leaf))
            .collect()
    }
}

impl FlatClusterExtractor {
    /// Extractor with zero support tolerance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the support tolerance used to find seeds.
    pub fn with_support_tol(mut self, support_tol: f64) -> Self {
        self.support_tol = support_tol;
        self
    }

    /// Support tolerance.
    pub fn support_tol(&self) -> f64 {
        self.support_tol
    }

    /// Compute scores and flags with the given strategies, then extract.
    pub fn extract_with<S, Q>(
        &self,
        z: &Dendrogram,
        scorer: &S,
        predicate: &Q,
    ) -> Result<FlatClusters>
    where
        S: ClusterScorer + ?Sized,
        Q: LowQualityPredicate + ?Sized,
    {
        let scores = scorer.node_scores(z)?;
        let low_quality = predicate.low_quality(z)?;
        self.extract(z, &scores, &low_quality)
    }

    /// Extract flat clusters from per-node scores and low-quality flags.
    pub fn extract(
        &self,
        z: &Dendrogram,
        scores: &[f64],
        low_quality: &[bool],
    ) -> Result<FlatClusters> {
        let n = z.n_items();
        let n_nodes = z.n_nodes();
        for (what, found) in [
            ("node scores", scores.len()),
            ("low-quality flags", low_quality.len()),
        ] {
            if found != n_nodes {
                return Err(Error::DimensionMismatch {
                    what,
                    expected: n_nodes,
                    found,
                });
            }
        }

        let flat = flatten_nodes(z);
        let duplicates: Vec<usize> = (0..z.n_merges()).filter(|&r| flat[r] != r).collect();

        let mut scores = scores.to_vec();
        let floor = scores.iter().copied().fold(f64::INFINITY, f64::min);
        for &row in &duplicates {
            scores[n + row] = floor;
        }

        let below = max_scores_below(z, &scores, Combine::Add)?;
        let raw: Vec<f64> = below
            .iter()
            .enumerate()
            .map(|(row, b)| scores[n + row] - b)
            .collect();
        let support: Vec<f64> = flat.iter().map(|&r| raw[r]).collect();

        let mut low = low_quality.to_vec();
        for (row, &r) in flat.iter().enumerate() {
            low[n + row] = low_quality[n + r];
        }

        let keep: Vec<bool> = support.iter().map(|&s| s > 0.0).collect();
        let conservative = fcluster_merge(z, &keep)?;
        let mut conservative_bins = conservative.ids.iter().map(|id| id + 1).collect::<Vec<_>>();
        dissolve(&mut conservative_bins, &conservative.leaders, &low);

        let seeds = self.seeds(z, &support, &low, &conservative.leaders, &duplicates)?;

        let counts: Vec<usize> = seeds.iter().map(|&s| usize::from(s)).collect();
        let below = max_scores_below(z, &counts, Combine::Add)?;
        let to_merge: Vec<bool> = flat.iter().map(|&r| below[r] <= 1).collect();
        let grown = fcluster_merge(z, &to_merge)?;
        let mut bins = grown.ids.iter().map(|id| id + 1).collect::<Vec<_>>();
        let dissolved = dissolve(&mut bins, &grown.leaders, &low);
        log::debug!("dissolved {dissolved} low quality clusters");

        Ok(FlatClusters {
            bins,
            leaders: grown.leaders,
            low_quality: low,
            support,
            scores,
            seeds,
            conservative_bins,
            conservative_leaders: conservative.leaders,
        })
    }

    fn seeds(
        &self,
        z: &Dendrogram,
        support: &[f64],
        low: &[bool],
        conservative_leaders: &[usize],
        duplicates: &[usize],
    ) -> Result<Vec<bool>> {
        let n = z.n_items();
        let mut split_child = vec![false; z.n_nodes()];
        for (m, &s) in z.merges().zip(support) {
            if s < -self.support_tol {
                split_child[m.cluster_a] = true;
                split_child[m.cluster_b] = true;
            }
        }
        let mut seeds: Vec<bool> = low
            .iter()
            .zip(&split_child)
            .map(|(&l, &c)| !l && c)
            .collect();

        let mut leaders = conservative_leaders.to_vec();
        leaders.sort_unstable();
        leaders.dedup();
        for v in descendants(z, &leaders, false)? {
            seeds[v] = false;
        }
        for &row in duplicates {
            seeds[n + row] = false;
        }
        Ok(seeds)
    }
}

/// Unbin leaves whose leader is low quality and renumber the remaining bins
/// densely, keeping their order. Returns the number of clusters dissolved.
fn dissolve(bins: &mut [usize], leaders: &[usize], low_quality: &[bool]) -> usize {
    let mut dropped = Vec::new();
    for (b, &leader) in bins.iter_mut().zip(leaders) {
        if low_quality[leader] && *b != 0 {
            dropped.push(*b);
            *b = 0;
        }
    }
    let mut kept: Vec<usize> = bins.iter().copied().filter(|&b| b != 0).collect();
    kept.sort_unstable();
    kept.dedup();
    for b in bins.iter_mut().filter(|b| **b != 0) {
        if let Ok(pos) = kept.binary_search(b) {
            *b = pos + 1;
        }
    }
    dropped.sort_unstable();
    dropped.dedup();
    dropped.len()
}
