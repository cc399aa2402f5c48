//! Generic binning pipeline: distances, hierarchy, flat cut.

use super::traits::{DistanceSource, Partitioner};
use crate::distance::condensed_len;
use crate::error::{Error, Result};
use crate::hierarchy::{linkage_from_reachability, reachability_order_n, Dendrogram, Reachability};

/// Output of a binning run, ready for a storage layer to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct Binning {
    /// Bin of each observation; 0 is unbinned.
    pub bins: Vec<usize>,
    /// Observations in reachability traversal order.
    pub reach_order: Vec<usize>,
    /// Reachability distance of each traversal step.
    pub reach_dists: Vec<f64>,
}

impl Binning {
    fn trivial(n: usize) -> Self {
        Self {
            bins: vec![0; n],
            reach_order: (0..n).collect(),
            reach_dists: vec![0.0; n],
        }
    }

    /// Number of distinct non-zero bins.
    pub fn n_bins(&self) -> usize {
        let mut ids: Vec<usize> = self.bins.iter().copied().filter(|&b| b != 0).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    /// Rebuild the dendrogram described by the reachability arrays.
    pub fn dendrogram(&self) -> Result<Dendrogram> {
        linkage_from_reachability(&Reachability {
            order: self.reach_order.clone(),
            reach: self.reach_dists.clone(),
        })
    }
}

/// Hierarchical binning with pluggable distances and flat cut.
#[derive(Debug, Clone)]
pub struct ClusterEngine<D, P> {
    source: D,
    partitioner: P,
}

impl<D: DistanceSource, P: Partitioner> ClusterEngine<D, P> {
    /// Create an engine.
    pub fn new(source: D, partitioner: P) -> Self {
        Self {
            source,
            partitioner,
        }
    }

    /// The flat-cut strategy.
    pub fn partitioner(&self) -> &P {
        &self.partitioner
    }

    /// Run the pipeline.
    ///
    /// With fewer than two observations nothing can be clustered and every
    /// observation is left unbinned.
    pub fn make_bins(&mut self) -> Result<Binning> {
        let n = self.source.n_obs();
        if n < 2 {
            log::info!("{n} observations, nothing to cluster");
            return Ok(Binning::trivial(n));
        }

        log::info!("Getting distance info");
        let dists = self.source.distances()?;
        if dists.len() != condensed_len(n) {
            return Err(Error::DimensionMismatch {
                what: "condensed distances",
                expected: condensed_len(n),
                found: dists.len(),
            });
        }

        log::info!("Computing cluster hierarchy");
        let reachability = reachability_order_n(&dists, n);
        drop(dists);

        log::info!("Finding cores");
        let z = linkage_from_reachability(&reachability)?;
        let bins = self.partitioner.partition(&z)?;
        if bins.len() != n {
            return Err(Error::DimensionMismatch {
                what: "bin assignments",
                expected: n,
                found: bins.len(),
            });
        }

        let binning = Binning {
            bins,
            reach_order: reachability.order,
            reach_dists: reachability.reach,
        };
        log::info!("{} bins made", binning.n_bins());
        Ok(binning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{FlatClusterExtractor, FlatClusterPartitioner, Precomputed};
    use crate::quality::{ClusterScorer, MinStandard};

    /// Every leaf is worth 1, every merge is worth its size.
    struct SizeScore;

    impl ClusterScorer for SizeScore {
        fn node_scores(&self, z: &Dendrogram) -> Result<Vec<f64>> {
            Ok((0..z.n_nodes()).map(|v| z.size(v) as f64).collect())
        }
    }

    /// Bins the larger-id child of the root.
    struct RootSplit;

    impl Partitioner for RootSplit {
        fn partition(&self, z: &Dendrogram) -> Result<Vec<usize>> {
            let mut bins = vec![0; z.n_items()];
            if let Some((_, b)) = z.root().and_then(|r| z.children(r)) {
                z.leaves(b).into_iter().for_each(|l| bins[l] = 1);
            }
            Ok(bins)
        }
    }

    const Y: [f64; 10] = [17.7, 70.0, 97.1, 50.8, 121.6, 79.4, 82.1, 120.9, 77.3, 14.4];

    #[test]
    fn reachability_arrays_are_returned() {
        let mut engine = ClusterEngine::new(Precomputed::new(5, Y.to_vec()), RootSplit);
        let b = engine.make_bins().unwrap();
        assert_eq!(b.reach_order, vec![0, 1, 4, 3, 2]);
        assert_eq!(b.reach_dists, vec![0.0, 17.7, 50.8, 14.4, 70.0]);
        assert_eq!(b.bins, vec![1, 1, 0, 1, 1]);
        assert_eq!(b.n_bins(), 1);
        assert_eq!(b.dendrogram().unwrap().n_merges(), 4);
    }

    #[test]
    fn flat_cluster_partitioner_plugs_in() {
        let partitioner = FlatClusterPartitioner::new(
            FlatClusterExtractor::new(),
            SizeScore,
            MinStandard::new(vec![10; 5]).with_min_pts(2),
        );
        let mut engine = ClusterEngine::new(Precomputed::new(5, Y.to_vec()), partitioner);
        let b = engine.make_bins().unwrap();
        // merging never loses score, so everything ends up in one bin
        assert_eq!(b.bins, vec![1; 5]);
    }

    #[test]
    fn tiny_inputs_are_unbinned() {
        let mut engine = ClusterEngine::new(Precomputed::new(1, vec![]), RootSplit);
        let b = engine.make_bins().unwrap();
        assert_eq!(b.bins, vec![0]);
        assert_eq!(b.reach_order, vec![0]);
        let mut engine = ClusterEngine::new(Precomputed::new(0, vec![]), RootSplit);
        assert!(engine.make_bins().unwrap().bins.is_empty());
    }

    #[test]
    fn misaligned_distances_fail() {
        let mut engine = ClusterEngine::new(Precomputed::new(4, Y.to_vec()), RootSplit);
        assert!(matches!(
            engine.make_bins(),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}
