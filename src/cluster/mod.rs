//! Binning: from pairwise distances to flat clusters.
//!
//! ## Pipeline
//!
//! [`ClusterEngine`] runs three stages with injected strategies:
//!
//! 1. a [`DistanceSource`] yields the condensed dissimilarity array;
//! 2. the reachability ordering and its single-linkage dendrogram are built;
//! 3. a [`Partitioner`] cuts the dendrogram into bins.
//!
//! [`FlatClusterPartitioner`] is the usual partitioner: it scores every node
//! with a [`ClusterScorer`](crate::quality::ClusterScorer), flags nodes below a
//! minimum standard with a
//! [`LowQualityPredicate`](crate::quality::LowQualityPredicate), and hands both
//! to the [`FlatClusterExtractor`].
//!
//! ## Contig binning
//!
//! [`ClassificationEngine`] wires a [`Profile`] to density distances, marker
//! scores and a minimum bin standard:
//!
//! ```no_run
//! use cobin::cluster::{BinningConfig, ClassificationEngine, Profile};
//! # fn run(profile: &Profile) -> cobin::Result<()> {
//! let config = BinningConfig::new().with_min_size(1_000_000).with_min_pts(20);
//! let binning = ClassificationEngine::new(profile, config)?.make_bins()?;
//! println!("{} bins", binning.n_bins());
//! # Ok(())
//! # }
//! ```

mod classification;
mod engine;
mod extractor;
mod traits;

pub use classification::{
    marker_check_partitioner, BinningConfig, ClassificationEngine, MarkerCheckPartitioner,
    MarkerTreeLabels, Profile, ProfileDistances,
};
pub use engine::{Binning, ClusterEngine};
pub use extractor::{FlatClusterExtractor, FlatClusters};
pub use traits::{DistanceSource, FlatClusterPartitioner, Partitioner, Precomputed};
