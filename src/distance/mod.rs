//! Pairwise dissimilarities over contigs.
//!
//! All pairwise quantities are stored as **condensed** arrays: one value per
//! unordered pair `(i, j)`, `i < j`, in row-major upper-triangle order
//!
//! ```text
//! (0,1) (0,2) ... (0,n-1) (1,2) ... (1,n-1) ... (n-2,n-1)
//! ```
//!
//! which is the layout used by SciPy's `pdist` and by `kodama`.
//!
//! # Rank space
//!
//! Coverage and k-mer distances live on unrelated scales. Rather than picking
//! a weighting between them, each is replaced by its weighted fractional rank
//! (scaled into `[0, 1)`), and the two ranks are combined as a Euclidean norm:
//!
//! ```text
//! combined(i,j) = sqrt(cov_rank(i,j)² + kmer_rank(i,j)²)
//! ```
//!
//! Pair weights are `length(i) × length(j)`, so pairs of long contigs dominate
//! the rank scale.

mod cache;
mod density;

pub use cache::{CacheKind, DistanceCache, MemoryCache, NoCache};
#[cfg(feature = "disk-cache")]
pub use cache::DiskCache;
pub use density::{core_distances, density_distance, DensityDistance, ScaledRanks};

use crate::error::{Error, Result};
use ndarray::ArrayView2;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Number of unordered pairs for `n` observations.
#[inline]
pub fn condensed_len(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Observation count implied by a condensed array of length `len`.
///
/// Returns `None` when `len` is not triangular.
pub fn num_obs_condensed(len: usize) -> Option<usize> {
    if len == 0 {
        // Ambiguous between 0 and 1 observations; callers treat it as 1.
        return Some(1);
    }
    let n = ((1.0 + (1.0 + 8.0 * len as f64).sqrt()) / 2.0).round() as usize;
    (condensed_len(n) == len).then_some(n)
}

/// Position of pair `(i, j)` in a condensed array over `n` observations.
///
/// Order of `i` and `j` does not matter; `i != j` is required.
#[inline]
pub fn condensed_index(n: usize, i: usize, j: usize) -> usize {
    debug_assert!(i != j && i < n && j < n);
    let (i, j) = if i < j { (i, j) } else { (j, i) };
    n * i - i * (i + 1) / 2 + (j - i - 1)
}

/// Iterate over all pairs `(i, j)`, `i < j`, in condensed order.
pub fn pairs(n: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..n).flat_map(move |i| ((i + 1)..n).map(move |j| (i, j)))
}

/// Validate a condensed array and return its observation count.
pub(crate) fn check_condensed(y: &[f64]) -> Result<usize> {
    num_obs_condensed(y.len()).ok_or(Error::InvalidCondensedLength { len: y.len() })
}

/// Pair weights `length(i) × length(j)` in condensed order.
pub fn pair_weights(lengths: &[u64]) -> Vec<f64> {
    let n = lengths.len();
    let mut out = Vec::with_capacity(condensed_len(n));
    for (i, j) in pairs(n) {
        out.push(lengths[i] as f64 * lengths[j] as f64);
    }
    out
}

/// Offset of the first pair `(i, i+1)` of row `i`; `condensed_len(n)` for `i == n`.
#[inline]
fn row_offset(n: usize, i: usize) -> usize {
    n * i - i * (i + 1) / 2
}

/// Condensed Euclidean distances between the rows of `features`.
///
/// The output is allocated once; see [`condensed_euclidean_into`].
pub fn condensed_euclidean(features: ArrayView2<'_, f64>, chunk_rows: usize) -> Vec<f64> {
    let mut out = vec![0.0; condensed_len(features.nrows())];
    // Length matches by construction.
    let _ = condensed_euclidean_into(features, chunk_rows, &mut out);
    out
}

/// Write condensed Euclidean distances between the rows of `features` into
/// `out`, which must hold exactly `condensed_len(features.nrows())` values.
///
/// Rows are processed in blocks of `chunk_rows`, each block filling its own
/// disjoint range of `out`. With the `parallel` feature the blocks are
/// computed concurrently. Output is identical either way.
pub fn condensed_euclidean_into(
    features: ArrayView2<'_, f64>,
    chunk_rows: usize,
    out: &mut [f64],
) -> Result<()> {
    let n = features.nrows();
    if out.len() != condensed_len(n) {
        return Err(Error::DimensionMismatch {
            what: "condensed output",
            expected: condensed_len(n),
            found: out.len(),
        });
    }
    let chunk_rows = chunk_rows.max(1);

    let mut blocks: Vec<(usize, &mut [f64])> = Vec::with_capacity(n / chunk_rows + 1);
    let mut rest = out;
    for start in (0..n).step_by(chunk_rows) {
        let end = (start + chunk_rows).min(n);
        let len = row_offset(n, end) - row_offset(n, start);
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(len);
        blocks.push((start, head));
        rest = tail;
    }

    let fill = |(start, block): &mut (usize, &mut [f64])| {
        let mut k = 0;
        for i in *start..(*start + chunk_rows).min(n) {
            let a = features.row(i);
            for j in (i + 1)..n {
                let b = features.row(j);
                let d2: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
                block[k] = d2.sqrt();
                k += 1;
            }
        }
    };

    #[cfg(feature = "parallel")]
    blocks.par_iter_mut().for_each(fill);
    #[cfg(not(feature = "parallel"))]
    blocks.iter_mut().for_each(fill);
    Ok(())
}

/// Weighted fractional ranks of `values` (rank 0 = smallest).
///
/// Each element's rank is the total weight of elements sorted before it.
/// Tied elements share the mean of their individual ranks, so with unit
/// weights this is the usual fractional ("average") ranking minus one.
pub fn weighted_fractional_rank(values: &[f64], weights: &[f64]) -> Result<Vec<f64>> {
    let mut ranks = values.to_vec();
    weighted_fractional_rank_in_place(&mut ranks, weights)?;
    Ok(ranks)
}

/// As [`weighted_fractional_rank`], overwriting `values` with their ranks.
pub fn weighted_fractional_rank_in_place(values: &mut [f64], weights: &[f64]) -> Result<()> {
    if values.len() != weights.len() {
        return Err(Error::DimensionMismatch {
            what: "rank weights",
            expected: values.len(),
            found: weights.len(),
        });
    }
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]).then(a.cmp(&b)));

    let mut cumulative = 0.0;
    let mut k = 0;
    while k < order.len() {
        // Entries at order[k..] are still unranked.
        let value = values[order[k]];
        let mut end = k;
        let mut rank_sum = 0.0;
        while end < order.len() && values[order[end]] == value {
            rank_sum += cumulative;
            cumulative += weights[order[end]];
            end += 1;
        }
        let mean = rank_sum / (end - k) as f64;
        for &idx in &order[k..end] {
            values[idx] = mean;
        }
        k = end;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn condensed_index_matches_pair_order() {
        let n = 6;
        for (k, (i, j)) in pairs(n).enumerate() {
            assert_eq!(condensed_index(n, i, j), k);
            assert_eq!(condensed_index(n, j, i), k);
        }
        assert_eq!(pairs(n).count(), condensed_len(n));
    }

    #[test]
    fn num_obs_roundtrip() {
        for n in 2..50 {
            assert_eq!(num_obs_condensed(condensed_len(n)), Some(n));
        }
        assert_eq!(num_obs_condensed(4), None);
        assert!(matches!(
            check_condensed(&[1.0, 2.0]),
            Err(Error::InvalidCondensedLength { len: 2 })
        ));
    }

    #[test]
    fn euclidean_is_chunk_independent() {
        let x = array![[0.0, 0.0], [3.0, 4.0], [6.0, 8.0], [0.0, 1.0]];
        let a = condensed_euclidean(x.view(), 1);
        let b = condensed_euclidean(x.view(), 3);
        let c = condensed_euclidean(x.view(), 100);
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a[0], 5.0);
        assert_eq!(a[1], 10.0);
        assert_eq!(a[2], 1.0);
    }

    #[test]
    fn euclidean_fills_caller_buffer_in_place() {
        let x: Array2<f64> = array![[0.0, 0.0], [3.0, 4.0], [6.0, 8.0], [0.0, 1.0], [1.0, 1.0]];
        let expected: Vec<f64> = pairs(5)
            .map(|(i, j)| {
                let d = &x.row(i) - &x.row(j);
                d.dot(&d).sqrt()
            })
            .collect();
        for chunk_rows in [1, 2, 3, 5, 64] {
            let mut out = vec![f64::NAN; condensed_len(5)];
            let ptr = out.as_ptr();
            condensed_euclidean_into(x.view(), chunk_rows, &mut out).unwrap();
            assert_eq!(out.as_ptr(), ptr);
            assert_eq!(out, expected);
        }
        let d = condensed_euclidean(x.view(), 2);
        assert_eq!(d.capacity(), condensed_len(5));

        let mut short = vec![0.0; 3];
        assert!(matches!(
            condensed_euclidean_into(x.view(), 2, &mut short),
            Err(Error::DimensionMismatch {
                what: "condensed output",
                expected: 10,
                found: 3
            })
        ));
        let empty = Array2::<f64>::zeros((1, 2));
        assert!(condensed_euclidean(empty.view(), 4).is_empty());
    }

    #[test]
    fn unit_weight_ranks_are_average_ranks() {
        let v = [3.0, 1.0, 2.0, 1.0];
        let r = weighted_fractional_rank(&v, &[1.0; 4]).unwrap();
        assert_eq!(r, vec![3.0, 0.5, 2.0, 0.5]);

        let mut v = v;
        weighted_fractional_rank_in_place(&mut v, &[1.0; 4]).unwrap();
        assert_eq!(v[..], r[..]);
    }

    #[test]
    fn heavy_pairs_stretch_the_rank_scale() {
        let v = [1.0, 2.0, 3.0];
        let r = weighted_fractional_rank(&v, &[10.0, 1.0, 1.0]).unwrap();
        assert_eq!(r, vec![0.0, 10.0, 11.0]);
    }

    #[test]
    fn rank_weights_must_align() {
        let err = weighted_fractional_rank(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn pair_weights_are_length_products() {
        assert_eq!(pair_weights(&[2, 3, 5]), vec![6.0, 10.0, 15.0]);
    }
}
