//! Cluster quality over dendrogram nodes.
//!
//! The flat cluster extractor needs two per-node signals:
//!
//! - a **score**: how good the cluster formed by a node's leaves is
//!   ([`ClusterScorer`]);
//! - a **low-quality flag**: whether that cluster fails a minimum standard
//!   regardless of score ([`LowQualityPredicate`]).
//!
//! Both are strategies injected into the extractor. Scores built from data
//! attached to leaves can implement [`LeafDataScore`] and use
//! [`leaf_data_scores`], which evaluates the score once per informative merge.

mod marker;
mod standard;
mod taxonomy;

pub use marker::{
    MarkerCheckScorer, MarkerMapping, MarkerMappings, DEFAULT_ALPHA, DEFAULT_TAXONOMY_THRESHOLD,
};
pub use standard::{node_bp, MinStandard};
pub use taxonomy::{LineageDistance, TaxonomicDistance};

use crate::error::Result;
use crate::hierarchy::Dendrogram;
use std::collections::HashMap;

/// Per-node cluster quality scores.
pub trait ClusterScorer {
    /// One score per node (`2n - 1` entries).
    fn node_scores(&self, z: &Dendrogram) -> Result<Vec<f64>>;
}

/// Per-node minimum-standard predicate.
pub trait LowQualityPredicate {
    /// One flag per node (`2n - 1` entries); `true` marks a cluster that must
    /// not be reported as a bin.
    fn low_quality(&self, z: &Dendrogram) -> Result<Vec<bool>>;
}

/// A score computed from data items attached to leaves.
pub trait LeafDataScore {
    /// Data items attached to each leaf that has any.
    fn leaf_data(&self) -> HashMap<usize, Vec<usize>>;

    /// Score of a cluster holding exactly `items`.
    fn score(&self, items: &[usize]) -> f64;
}

/// Score every node from the concatenated data of the leaves below it.
///
/// A node inherits the score of its only informative child unchanged, so
/// adding leaves without data never perturbs a cluster's measured quality.
/// Nodes without data below score 0.
pub fn leaf_data_scores<S: LeafDataScore + ?Sized>(z: &Dendrogram, scorer: &S) -> Vec<f64> {
    let n = z.n_items();
    let mut data = scorer.leaf_data();
    let mut scores = vec![0.0; z.n_nodes()];
    for (&leaf, items) in &data {
        if leaf < n {
            scores[leaf] = scorer.score(items);
        }
    }

    for (row, m) in z.merges().enumerate() {
        let node = n + row;
        let left = data.remove(&m.cluster_a).unwrap_or_default();
        let right = data.remove(&m.cluster_b).unwrap_or_default();
        let items = match (left.is_empty(), right.is_empty()) {
            (true, true) => continue,
            (false, true) => {
                scores[node] = scores[m.cluster_a];
                left
            }
            (true, false) => {
                scores[node] = scores[m.cluster_b];
                right
            }
            (false, false) => {
                let mut items = left;
                items.extend(right);
                scores[node] = scorer.score(&items);
                items
            }
        };
        let _ = data.insert(node, items);
    }
    scores
}
