//! Pipeline traits.

use super::extractor::FlatClusterExtractor;
use crate::error::Result;
use crate::hierarchy::Dendrogram;
use crate::quality::{ClusterScorer, LowQualityPredicate};

/// Source of pairwise dissimilarities between observations.
pub trait DistanceSource {
    /// Number of observations.
    fn n_obs(&self) -> usize;

    /// Condensed dissimilarity array over all `n_obs` observations.
    fn distances(&mut self) -> Result<Vec<f64>>;
}

/// Turns a dendrogram into flat bins.
pub trait Partitioner {
    /// Bin of each leaf; 0 is unbinned.
    fn partition(&self, z: &Dendrogram) -> Result<Vec<usize>>;
}

/// Dissimilarities computed ahead of time.
#[derive(Debug, Clone, PartialEq)]
pub struct Precomputed {
    n_obs: usize,
    distances: Vec<f64>,
}

impl Precomputed {
    /// Wrap a condensed array for `n_obs` observations.
    pub fn new(n_obs: usize, distances: Vec<f64>) -> Self {
        Self { n_obs, distances }
    }
}

impl DistanceSource for Precomputed {
    fn n_obs(&self) -> usize {
        self.n_obs
    }

    fn distances(&mut self) -> Result<Vec<f64>> {
        Ok(self.distances.clone())
    }
}

/// [`FlatClusterExtractor`] driven by a scorer and a minimum standard.
#[derive(Debug, Clone)]
pub struct FlatClusterPartitioner<S, Q> {
    extractor: FlatClusterExtractor,
    scorer: S,
    predicate: Q,
}

impl<S, Q> FlatClusterPartitioner<S, Q>
where
    S: ClusterScorer,
    Q: LowQualityPredicate,
{
    /// Combine the strategies with an extractor.
    pub fn new(extractor: FlatClusterExtractor, scorer: S, predicate: Q) -> Self {
        Self {
            extractor,
            scorer,
            predicate,
        }
    }

    /// The node scorer.
    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// The minimum-standard predicate.
    pub fn predicate(&self) -> &Q {
        &self.predicate
    }

    /// The extractor settings.
    pub fn extractor(&self) -> &FlatClusterExtractor {
        &self.extractor
    }
}

impl<S, Q> Partitioner for FlatClusterPartitioner<S, Q>
where
    S: ClusterScorer,
    Q: LowQualityPredicate,
{
    fn partition(&self, z: &Dendrogram) -> Result<Vec<usize>> {
        Ok(self
            .extractor
            .extract_with(z, &self.scorer, &self.predicate)?
            .bins)
    }
}
