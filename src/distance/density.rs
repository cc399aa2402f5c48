//! Density distance over contigs.
//!
//! The density distance inflates dissimilarities in sparse regions so that
//! neighbourhoods below the declared minimum bin standard cannot form
//! clusters on their own:
//!
//! ```text
//! dd(i,j) = max(d(i,j), min(core(i), core(j)))
//! ```
//!
//! where `core(i)` is the distance at which `i` first has enough neighbours,
//! either by count (`min_pts`) or by cumulative pair weight (`min_wt`).

use super::{
    check_condensed, condensed_euclidean, condensed_index, condensed_len, pair_weights,
    weighted_fractional_rank_in_place, CacheKind, DistanceCache,
};
use crate::error::{Error, Result};
use ndarray::ArrayView2;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Coverage and k-mer ranks scaled into `[0, 1)`, plus the pair weights used to
/// compute them.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledRanks {
    /// Scaled weighted ranks of coverage distances.
    pub coverage: Vec<f64>,
    /// Scaled weighted ranks of k-mer distances.
    pub kmer: Vec<f64>,
    /// Pair weights `length(i) × length(j)`.
    pub weights: Vec<f64>,
}

impl ScaledRanks {
    /// Combine the two rank coordinates as a Euclidean norm.
    pub fn norms(&self) -> Vec<f64> {
        self.coverage
            .iter()
            .zip(&self.kmer)
            .map(|(c, k)| (c * c + k * k).sqrt())
            .collect()
    }

    /// Combined norms written over the coverage ranks, with the pair weights.
    pub fn into_norms(self) -> (Vec<f64>, Vec<f64>) {
        let Self {
            mut coverage,
            kmer,
            weights,
        } = self;
        for (c, k) in coverage.iter_mut().zip(&kmer) {
            *c = (*c * *c + k * k).sqrt();
        }
        (coverage, weights)
    }
}

/// Density distance configuration.
///
/// At least one of `min_size` and `min_pts` must be set before computing.
#[derive(Debug, Clone)]
pub struct DensityDistance {
    /// Minimum bin size in bp.
    min_size: Option<u64>,
    /// Minimum number of contigs in a neighbourhood, including the contig itself.
    min_pts: Option<usize>,
    /// Rows per block for pairwise distance computation.
    chunk_rows: usize,
}

impl Default for DensityDistance {
    fn default() -> Self {
        Self {
            min_size: None,
            min_pts: None,
            chunk_rows: 256,
        }
    }
}

impl DensityDistance {
    /// Create an unconfigured density distance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum bin size in bp.
    pub fn with_min_size(mut self, min_size: u64) -> Self {
        self.min_size = Some(min_size);
        self
    }

    /// Set the minimum neighbourhood point count.
    pub fn with_min_pts(mut self, min_pts: usize) -> Self {
        self.min_pts = Some(min_pts);
        self
    }

    /// Set rows per block for pairwise distance computation.
    pub fn with_chunk_rows(mut self, chunk_rows: usize) -> Self {
        self.chunk_rows = chunk_rows.max(1);
        self
    }

    fn check(&self) -> Result<()> {
        if self.min_size.is_none() && self.min_pts.is_none() {
            return Err(Error::config("'min_pts' and 'min_size' cannot both be unset"));
        }
        Ok(())
    }

    /// Minimum neighbour weight equivalent to `min_size`.
    ///
    /// For a contig of length `L`, neighbours summing to `S - L` bp give a
    /// neighbour weight of `L × (S - L)`. The shortest observed length is used
    /// for `L`, giving one conservative global threshold.
    pub fn min_weight(&self, lengths: &[u64]) -> Option<f64> {
        let min_size = self.min_size?;
        let shortest = lengths.iter().copied().min()?;
        Some(min_size.saturating_sub(shortest) as f64 * shortest as f64)
    }

    /// Weighted, scaled ranks of coverage and k-mer distances.
    pub fn scaled_ranks(
        &self,
        coverage: ArrayView2<'_, f64>,
        kmer: ArrayView2<'_, f64>,
        lengths: &[u64],
    ) -> Result<ScaledRanks> {
        self.scaled_ranks_cached(coverage, kmer, lengths, &mut super::NoCache)
    }

    /// As [`scaled_ranks`](Self::scaled_ranks), reading and writing the weights
    /// and rank arrays through `cache`.
    pub fn scaled_ranks_cached(
        &self,
        coverage: ArrayView2<'_, f64>,
        kmer: ArrayView2<'_, f64>,
        lengths: &[u64],
        cache: &mut dyn DistanceCache,
    ) -> Result<ScaledRanks> {
        let n = check_features(coverage, kmer, lengths)?;
        log::info!(
            "Computing pairwise contig distances for 2^{:.2} pairs",
            (condensed_len(n).max(1) as f64).log2()
        );

        let weights = match cache.get(CacheKind::Weights, n)? {
            Some(w) => w,
            None => {
                let w = pair_weights(lengths);
                cache.put(CacheKind::Weights, n, &w)?;
                w
            }
        };
        let total: f64 = weights.iter().sum();
        if n >= 2 && !(total > 0.0) {
            return Err(Error::config("contig pair weights sum to zero"));
        }
        let scale = if n >= 2 { 1.0 / total } else { 0.0 };

        let coverage_ranks =
            self.feature_ranks(CacheKind::CoverageRanks, coverage, &weights, scale, cache)?;
        // A retaining cache holds the coverage ranks while the k-mer pass runs.
        let held = (!cache.retains()).then_some(coverage_ranks);
        let kmer = self.feature_ranks(CacheKind::KmerRanks, kmer, &weights, scale, cache)?;
        let coverage = match held {
            Some(r) => r,
            None => cache
                .get(CacheKind::CoverageRanks, n)?
                .ok_or_else(|| Error::Cache {
                    message: "coverage ranks were not retained".into(),
                })?,
        };
        Ok(ScaledRanks {
            coverage,
            kmer,
            weights,
        })
    }

    /// Scaled weighted ranks of one feature's pairwise distances, computed in
    /// the distance buffer and stored in `cache`.
    fn feature_ranks(
        &self,
        kind: CacheKind,
        features: ArrayView2<'_, f64>,
        weights: &[f64],
        scale: f64,
        cache: &mut dyn DistanceCache,
    ) -> Result<Vec<f64>> {
        let n = features.nrows();
        if let Some(r) = cache.get(kind, n)? {
            return Ok(r);
        }
        let mut ranks = condensed_euclidean(features, self.chunk_rows);
        weighted_fractional_rank_in_place(&mut ranks, weights)?;
        ranks.iter_mut().for_each(|r| *r *= scale);
        cache.put(kind, n, &ranks)?;
        Ok(ranks)
    }

    /// Condensed density distances for the given contigs.
    pub fn compute(
        &self,
        coverage: ArrayView2<'_, f64>,
        kmer: ArrayView2<'_, f64>,
        lengths: &[u64],
    ) -> Result<Vec<f64>> {
        self.compute_cached(coverage, kmer, lengths, &mut super::NoCache)
    }

    /// As [`compute`](Self::compute), using `cache` for intermediate arrays.
    pub fn compute_cached(
        &self,
        coverage: ArrayView2<'_, f64>,
        kmer: ArrayView2<'_, f64>,
        lengths: &[u64],
        cache: &mut dyn DistanceCache,
    ) -> Result<Vec<f64>> {
        self.check()?;
        let (norms, weights) = self
            .scaled_ranks_cached(coverage, kmer, lengths, cache)?
            .into_norms();
        log::debug!("Computing density distances");
        density_distance(
            &norms,
            Some(&weights),
            self.min_weight(lengths),
            self.min_pts,
        )
    }
}

fn check_features(
    coverage: ArrayView2<'_, f64>,
    kmer: ArrayView2<'_, f64>,
    lengths: &[u64],
) -> Result<usize> {
    let n = lengths.len();
    if coverage.nrows() != n {
        return Err(Error::DimensionMismatch {
            what: "coverage rows",
            expected: n,
            found: coverage.nrows(),
        });
    }
    if kmer.nrows() != n {
        return Err(Error::DimensionMismatch {
            what: "k-mer rows",
            expected: n,
            found: kmer.nrows(),
        });
    }
    Ok(n)
}

/// Core distance of every observation.
///
/// The core distance of `i` is the smallest distance at which `i` has
/// `min_pts - 1` neighbours, or at which the summed pair weight of its
/// neighbours reaches `min_wt`. With both limits set the smaller distance is
/// used. A limit that is never reached falls back to the farthest neighbour.
pub fn core_distances(
    y: &[f64],
    weights: Option<&[f64]>,
    min_wt: Option<f64>,
    min_pts: Option<usize>,
) -> Result<Vec<f64>> {
    let n = check_condensed(y)?;
    if let Some(w) = weights {
        if w.len() != y.len() {
            return Err(Error::DimensionMismatch {
                what: "pair weights",
                expected: y.len(),
                found: w.len(),
            });
        }
    }
    if n < 2 {
        return Ok(vec![0.0; n]);
    }

    let core = |i: usize| -> f64 {
        let mut neighbours: Vec<(f64, f64)> = (0..n)
            .filter(|&j| j != i)
            .map(|j| {
                let k = condensed_index(n, i, j);
                (y[k], weights.map_or(1.0, |w| w[k]))
            })
            .collect();
        neighbours.sort_by(|a, b| a.0.total_cmp(&b.0));
        let farthest = neighbours.last().map_or(0.0, |p| p.0);

        let by_pts = min_pts.map(|m| {
            if m <= 1 {
                0.0
            } else {
                neighbours.get(m - 2).map_or(farthest, |p| p.0)
            }
        });
        let by_wt = min_wt.map(|m| {
            if m <= 0.0 {
                return 0.0;
            }
            let mut cumulative = 0.0;
            for &(d, w) in &neighbours {
                cumulative += w;
                if cumulative >= m {
                    return d;
                }
            }
            farthest
        });
        match (by_pts, by_wt) {
            (Some(p), Some(w)) => p.min(w),
            (Some(p), None) => p,
            (None, Some(w)) => w,
            (None, None) => 0.0,
        }
    };

    #[cfg(feature = "parallel")]
    let out = (0..n).into_par_iter().map(core).collect();
    #[cfg(not(feature = "parallel"))]
    let out = (0..n).map(core).collect();
    Ok(out)
}

/// Pairwise density distance `max(d(i,j), min(core(i), core(j)))`.
pub fn density_distance(
    y: &[f64],
    weights: Option<&[f64]>,
    min_wt: Option<f64>,
    min_pts: Option<usize>,
) -> Result<Vec<f64>> {
    let n = check_condensed(y)?;
    let core = core_distances(y, weights, min_wt, min_pts)?;
    let mut out = Vec::with_capacity(y.len());
    for (k, (i, j)) in super::pairs(n).enumerate() {
        out.push(y[k].max(core[i].min(core[j])));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::MemoryCache;
    use ndarray::{array, Array2};
    use proptest::prelude::*;

    fn toy() -> (Array2<f64>, Array2<f64>, Vec<u64>) {
        let cov = array![[1.0, 2.0], [1.1, 2.1], [9.0, 0.5], [9.2, 0.4], [5.0, 5.0]];
        let kmer = array![[0.1, 0.2], [0.1, 0.25], [0.7, 0.1], [0.72, 0.1], [0.4, 0.4]];
        (cov, kmer, vec![5000, 3000, 8000, 2000, 1000])
    }

    #[test]
    fn requires_a_minimum_standard() {
        let (cov, kmer, len) = toy();
        let err = DensityDistance::new()
            .compute(cov.view(), kmer.view(), &len)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn rejects_misaligned_features() {
        let (cov, kmer, _) = toy();
        let err = DensityDistance::new()
            .with_min_pts(2)
            .compute(cov.view(), kmer.view(), &[1, 2, 3])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                what: "coverage rows",
                ..
            }
        ));
    }

    #[test]
    fn zero_lengths_are_a_configuration_error() {
        let (cov, kmer, _) = toy();
        let err = DensityDistance::new()
            .with_min_pts(2)
            .compute(cov.view(), kmer.view(), &[0; 5])
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn fewer_than_two_contigs_have_no_pairs() {
        let cov = array![[1.0, 2.0]];
        let kmer = array![[0.5, 0.5]];
        let d = DensityDistance::new()
            .with_min_size(100)
            .compute(cov.view(), kmer.view(), &[10])
            .unwrap();
        assert!(d.is_empty());
    }

    #[test]
    fn min_weight_uses_shortest_contig() {
        let dd = DensityDistance::new().with_min_size(10_000);
        assert_eq!(dd.min_weight(&[5000, 1000, 3000]), Some(9_000_000.0));
        let dd = DensityDistance::new().with_min_size(500);
        assert_eq!(dd.min_weight(&[5000, 1000]), Some(0.0));
        assert_eq!(DensityDistance::new().min_weight(&[1]), None);
    }

    #[test]
    fn ranks_lie_in_unit_interval() {
        let (cov, kmer, len) = toy();
        let r = DensityDistance::new()
            .scaled_ranks(cov.view(), kmer.view(), &len)
            .unwrap();
        assert_eq!(r.coverage.len(), 10);
        for v in r.coverage.iter().chain(&r.kmer) {
            assert!((0.0..1.0).contains(v));
        }
        // closest coverage pair is (0, 1)
        assert_eq!(r.coverage[0], 0.0);
    }

    #[test]
    fn min_pts_core_distance_is_kth_neighbour() {
        // 4 points on a line at 0, 1, 3, 7.
        let y = [1.0, 3.0, 7.0, 2.0, 6.0, 4.0];
        let core = core_distances(&y, None, None, Some(3)).unwrap();
        assert_eq!(core, vec![3.0, 2.0, 3.0, 6.0]);
        let core = core_distances(&y, None, None, Some(1)).unwrap();
        assert_eq!(core, vec![0.0; 4]);
        // more points requested than exist: farthest neighbour
        let core = core_distances(&y, None, None, Some(10)).unwrap();
        assert_eq!(core, vec![7.0, 6.0, 4.0, 7.0]);
    }

    #[test]
    fn either_standard_is_enough() {
        let y = [1.0, 3.0, 7.0, 2.0, 6.0, 4.0];
        let w = [1.0, 1.0, 100.0, 1.0, 1.0, 1.0];
        // weight 100 is only reached via the (0,3) pair
        let by_wt = core_distances(&y, Some(&w), Some(50.0), None).unwrap();
        assert_eq!(by_wt, vec![7.0, 6.0, 4.0, 7.0]);
        let both = core_distances(&y, Some(&w), Some(50.0), Some(2)).unwrap();
        assert_eq!(both, vec![1.0, 1.0, 2.0, 4.0]);
    }

    #[test]
    fn density_distance_inflates_sparse_pairs() {
        let y = [1.0, 3.0, 7.0, 2.0, 6.0, 4.0];
        let dd = density_distance(&y, None, None, Some(3)).unwrap();
        // (0,1): max(1, min(3, 2)) = 2
        assert_eq!(dd[0], 2.0);
        // (2,3): max(4, min(3, 6)) = 4
        assert_eq!(dd[5], 4.0);
        for (a, b) in dd.iter().zip(&y) {
            assert!(a >= b);
        }
    }

    #[test]
    fn cache_is_filled_and_reused() {
        let (cov, kmer, len) = toy();
        let dd = DensityDistance::new().with_min_size(6000);
        let mut cache = MemoryCache::new();
        let fresh = dd
            .compute_cached(cov.view(), kmer.view(), &len, &mut cache)
            .unwrap();
        assert!(cache.contains(CacheKind::Weights));
        assert!(cache.contains(CacheKind::CoverageRanks));
        assert!(cache.contains(CacheKind::KmerRanks));
        let again = dd
            .compute_cached(cov.view(), kmer.view(), &len, &mut cache)
            .unwrap();
        assert_eq!(fresh, again);
        assert_eq!(fresh, dd.compute(cov.view(), kmer.view(), &len).unwrap());
    }

    /// Memory cache that records every read.
    #[derive(Default)]
    struct Recording {
        inner: MemoryCache,
        reads: std::cell::RefCell<Vec<CacheKind>>,
    }

    impl DistanceCache for Recording {
        fn get(&self, kind: CacheKind, n_obs: usize) -> Result<Option<Vec<f64>>> {
            self.reads.borrow_mut().push(kind);
            self.inner.get(kind, n_obs)
        }

        fn put(&mut self, kind: CacheKind, n_obs: usize, values: &[f64]) -> Result<()> {
            self.inner.put(kind, n_obs, values)
        }
    }

    #[test]
    fn retaining_cache_releases_coverage_ranks_during_kmer_pass() {
        let (cov, kmer, len) = toy();
        let dd = DensityDistance::new().with_min_pts(2);
        let mut cache = Recording::default();
        let spilled = dd
            .scaled_ranks_cached(cov.view(), kmer.view(), &len, &mut cache)
            .unwrap();
        assert_eq!(
            *cache.reads.borrow(),
            vec![
                CacheKind::Weights,
                CacheKind::CoverageRanks,
                CacheKind::KmerRanks,
                CacheKind::CoverageRanks,
            ]
        );
        let held = dd.scaled_ranks(cov.view(), kmer.view(), &len).unwrap();
        assert_eq!(spilled, held);
        assert_eq!(spilled.clone().into_norms().0, held.norms());
    }

    #[test]
    fn stale_cache_is_rejected() {
        let (cov, kmer, len) = toy();
        let dd = DensityDistance::new().with_min_pts(2);
        let mut cache = MemoryCache::new();
        cache.put(CacheKind::Weights, 3, &[1.0, 2.0, 3.0]).unwrap();
        let err = dd
            .compute_cached(cov.view(), kmer.view(), &len, &mut cache)
            .unwrap_err();
        assert_eq!(
            err,
            Error::StaleCache {
                kind: "weights",
                expected: 5,
                found: 3
            }
        );
    }

    proptest! {
        #[test]
        fn density_distance_is_deterministic_and_dominates(
            raw in (2usize..10).prop_flat_map(|n| {
                proptest::collection::vec(0.0f64..100.0, condensed_len(n))
            }),
            min_pts in 1usize..6,
        ) {
            let a = density_distance(&raw, None, None, Some(min_pts)).unwrap();
            let b = density_distance(&raw, None, None, Some(min_pts)).unwrap();
            prop_assert_eq!(&a, &b);
            for (d, y) in a.iter().zip(&raw) {
                prop_assert!(d >= y);
            }
        }
    }
}
