//! Contig binning from coverage, k-mer signatures and marker taxonomy.
//!
//! ```text
//! Profile ──DensityDistance──▶ condensed distances
//!         ──ClusterEngine────▶ reachability + dendrogram
//!         ──MarkerCheckScorer + MinStandard──▶ bins
//! ```

use super::engine::{Binning, ClusterEngine};
use super::extractor::FlatClusterExtractor;
use super::traits::{DistanceSource, FlatClusterPartitioner};
use crate::distance::{DensityDistance, DistanceCache, NoCache};
use crate::error::{Error, Result};
use crate::hierarchy::{embed_nodes, flat_node, flatten_nodes, render_tree, Dendrogram};
use crate::quality::{
    node_bp, ClusterScorer, LineageDistance, LowQualityPredicate, MarkerCheckScorer,
    MarkerMappings, MinStandard, DEFAULT_ALPHA, DEFAULT_TAXONOMY_THRESHOLD,
};
use ndarray::{Array2, ArrayView2};

/// Per-contig inputs of a binning run.
///
/// All per-contig arrays share one index space, checked on construction.
#[derive(Debug, Clone)]
pub struct Profile {
    coverage: Array2<f64>,
    kmer: Array2<f64>,
    lengths: Vec<u64>,
    names: Vec<String>,
    mappings: MarkerMappings,
}

impl Profile {
    /// Assemble a profile.
    pub fn new(
        coverage: Array2<f64>,
        kmer: Array2<f64>,
        lengths: Vec<u64>,
        names: Vec<String>,
        mappings: MarkerMappings,
    ) -> Result<Self> {
        let n = names.len();
        for (what, found) in [
            ("coverage rows", coverage.nrows()),
            ("k-mer rows", kmer.nrows()),
            ("contig lengths", lengths.len()),
        ] {
            if found != n {
                return Err(Error::DimensionMismatch {
                    what,
                    expected: n,
                    found,
                });
            }
        }
        mappings.check_contigs(n)?;
        Ok(Self {
            coverage,
            kmer,
            lengths,
            names,
            mappings,
        })
    }

    /// Number of contigs.
    pub fn n_contigs(&self) -> usize {
        self.names.len()
    }

    /// Coverage profiles, one row per contig.
    pub fn coverage(&self) -> ArrayView2<'_, f64> {
        self.coverage.view()
    }

    /// K-mer signatures, one row per contig.
    pub fn kmer(&self) -> ArrayView2<'_, f64> {
        self.kmer.view()
    }

    /// Contig lengths in bp.
    pub fn lengths(&self) -> &[u64] {
        &self.lengths
    }

    /// Contig names.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Marker mappings.
    pub fn mappings(&self) -> &MarkerMappings {
        &self.mappings
    }
}

/// Binning settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BinningConfig {
    /// Minimum bin size in bp.
    pub min_size: Option<u64>,
    /// Minimum number of contigs per bin.
    pub min_pts: Option<usize>,
    /// Support tolerance of the flat cluster extractor.
    pub support_tol: f64,
    /// Taxonomic distance below which marker mappings are compatible.
    pub taxonomy_threshold: f64,
    /// Weight of recall against precision in marker scores.
    pub alpha: f64,
    /// Rows per block for pairwise distance computation.
    pub chunk_rows: usize,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            min_size: None,
            min_pts: None,
            support_tol: 1.0,
            taxonomy_threshold: DEFAULT_TAXONOMY_THRESHOLD,
            alpha: DEFAULT_ALPHA,
            chunk_rows: 256,
        }
    }
}

impl BinningConfig {
    /// Default settings; set `min_size` or `min_pts` before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum bin size in bp.
    pub fn with_min_size(mut self, min_size: u64) -> Self {
        self.min_size = Some(min_size);
        self
    }

    /// Set the minimum number of contigs per bin.
    pub fn with_min_pts(mut self, min_pts: usize) -> Self {
        self.min_pts = Some(min_pts);
        self
    }

    /// Set the support tolerance.
    pub fn with_support_tol(mut self, support_tol: f64) -> Self {
        self.support_tol = support_tol;
        self
    }

    /// Set the taxonomic compatibility threshold.
    pub fn with_taxonomy_threshold(mut self, threshold: f64) -> Self {
        self.taxonomy_threshold = threshold;
        self
    }

    /// Set the recall weight.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the pairwise block size.
    pub fn with_chunk_rows(mut self, chunk_rows: usize) -> Self {
        self.chunk_rows = chunk_rows;
        self
    }

    /// Check the settings.
    pub fn validate(&self) -> Result<()> {
        if self.min_size.is_none() && self.min_pts.is_none() {
            return Err(Error::config("min_size and min_pts cannot both be unset"));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(Error::config(format!("alpha must be in [0, 1], got {}", self.alpha)));
        }
        if !self.support_tol.is_finite() {
            return Err(Error::config("support_tol must be finite"));
        }
        if self.taxonomy_threshold.is_nan() {
            return Err(Error::config("taxonomy_threshold must be a number"));
        }
        if self.chunk_rows == 0 {
            return Err(Error::config("chunk_rows must be positive"));
        }
        Ok(())
    }

    fn density(&self) -> DensityDistance {
        let mut density = DensityDistance::new().with_chunk_rows(self.chunk_rows);
        if let Some(min_size) = self.min_size {
            density = density.with_min_size(min_size);
        }
        if let Some(min_pts) = self.min_pts {
            density = density.with_min_pts(min_pts);
        }
        density
    }

    fn min_standard(&self, profile: &Profile) -> MinStandard {
        MinStandard::new(profile.lengths().to_vec()).with_limits(self.min_size, self.min_pts)
    }

    fn scorer(&self, profile: &Profile) -> MarkerCheckScorer {
        MarkerCheckScorer::new(profile.mappings(), &LineageDistance, self.taxonomy_threshold)
            .with_alpha(self.alpha)
    }
}

/// Density distances of a profile's contigs.
pub struct ProfileDistances<'a> {
    profile: &'a Profile,
    density: DensityDistance,
    cache: &'a mut dyn DistanceCache,
}

impl<'a> ProfileDistances<'a> {
    /// Compute with `density`, keeping intermediate arrays in `cache`.
    pub fn new(
        profile: &'a Profile,
        density: DensityDistance,
        cache: &'a mut dyn DistanceCache,
    ) -> Self {
        Self {
            profile,
            density,
            cache,
        }
    }
}

impl DistanceSource for ProfileDistances<'_> {
    fn n_obs(&self) -> usize {
        self.profile.n_contigs()
    }

    fn distances(&mut self) -> Result<Vec<f64>> {
        self.density.compute_cached(
            self.profile.coverage(),
            self.profile.kmer(),
            self.profile.lengths(),
            &mut *self.cache,
        )
    }
}

/// Flat cut scored by marker taxonomy, gated by a minimum bin standard.
pub type MarkerCheckPartitioner = FlatClusterPartitioner<MarkerCheckScorer, MinStandard>;

/// Build the marker-check flat cut for `profile`.
pub fn marker_check_partitioner(
    profile: &Profile,
    config: &BinningConfig,
) -> MarkerCheckPartitioner {
    FlatClusterPartitioner::new(
        FlatClusterExtractor::new().with_support_tol(config.support_tol),
        config.scorer(profile),
        config.min_standard(profile),
    )
}

/// Bins contigs using density distances and marker taxonomy.
pub struct ClassificationEngine<'a> {
    profile: &'a Profile,
    config: BinningConfig,
    cache: Box<dyn DistanceCache + 'a>,
}

impl<'a> ClassificationEngine<'a> {
    /// Create an engine; fails if `config` is invalid.
    pub fn new(profile: &'a Profile, config: BinningConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            profile,
            config,
            cache: Box::new(NoCache),
        })
    }

    /// Keep weights and rank arrays in `cache`.
    pub fn with_cache(mut self, cache: Box<dyn DistanceCache + 'a>) -> Self {
        self.cache = cache;
        self
    }

    /// Settings in use.
    pub fn config(&self) -> &BinningConfig {
        &self.config
    }

    /// Run the full binning pipeline.
    pub fn make_bins(&mut self) -> Result<Binning> {
        let source =
            ProfileDistances::new(self.profile, self.config.density(), self.cache.as_mut());
        let partitioner = marker_check_partitioner(self.profile, &self.config);
        ClusterEngine::new(source, partitioner).make_bins()
    }
}

/// Labels for drawing a marker-scored dendrogram.
#[derive(Debug, Clone)]
pub struct MarkerTreeLabels {
    z: Dendrogram,
    names: Vec<String>,
    scores: Vec<f64>,
    low_quality: Vec<bool>,
    bp: Vec<u64>,
    counts: Vec<usize>,
}

impl MarkerTreeLabels {
    /// Score the dendrogram of a finished run.
    pub fn new(profile: &Profile, binning: &Binning, config: &BinningConfig) -> Result<Self> {
        Self::from_dendrogram(binning.dendrogram()?, profile, config)
    }

    /// Score `z`, a dendrogram over the contigs of `profile`.
    pub fn from_dendrogram(
        z: Dendrogram,
        profile: &Profile,
        config: &BinningConfig,
    ) -> Result<Self> {
        config.validate()?;
        let scores = config.scorer(profile).node_scores(&z)?;
        let low_quality = config.min_standard(profile).low_quality(&z)?;
        let bp = node_bp(&z, profile.lengths())?;
        let flat = flatten_nodes(&z);
        let counts = (0..z.n_nodes())
            .map(|v| z.size(flat_node(&z, &flat, v)))
            .collect();
        Ok(Self {
            z,
            names: profile.names().to_vec(),
            scores,
            low_quality,
            bp,
            counts,
        })
    }

    /// `:score[bp,n=count]`, suffixed with `L` for low-quality clusters.
    pub fn node_label(&self, node: usize) -> String {
        format!(
            ":{:.2}[{}bp,n={}]{}",
            self.scores[node],
            self.bp[node],
            self.counts[node],
            if self.low_quality[node] { "L" } else { "" }
        )
    }

    /// `'name` of a contig.
    pub fn leaf_label(&self, leaf: usize) -> String {
        format!("'{}", self.names[leaf])
    }

    /// Draw the tree pruned to `indices`.
    ///
    /// With `within`, only the smallest subtree holding those contigs is drawn.
    pub fn render(&self, indices: &[usize], within: Option<&[usize]>) -> Result<Vec<String>> {
        let root = match within {
            Some(leaves) => embed_nodes(&self.z, leaves)?.last().copied().flatten(),
            None => None,
        };
        render_tree(
            &self.z,
            indices,
            root,
            |leaf| self.leaf_label(leaf),
            |node| self.node_label(node),
        )
    }
}
